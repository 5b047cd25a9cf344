//! Persistent state and settings

pub mod memory;
pub mod settings;
pub mod store;
