//! Release API Library
//!
//! Release step logs, deploy notifications and webhook redeploys for
//! Helm-managed applications.

pub mod app;
pub mod cache;
pub mod ci;
pub mod deploy;
pub mod engine;
pub mod errors;
pub mod events;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod notify;
pub mod server;
pub mod storage;
pub mod utils;
