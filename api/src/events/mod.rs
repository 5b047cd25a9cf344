//! Release step events

pub mod log;
