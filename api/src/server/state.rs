//! Server state

use std::sync::Arc;

use crate::deploy::Deployer;
use crate::events::log::EventLog;

/// Server state shared across handlers
pub struct ServerState {
    pub event_log: Arc<EventLog>,
    pub deployer: Arc<Deployer>,
}

impl ServerState {
    pub fn new(event_log: Arc<EventLog>, deployer: Arc<Deployer>) -> Self {
        Self {
            event_log,
            deployer,
        }
    }
}
