//! Upstream HTTP clients

pub mod client;
