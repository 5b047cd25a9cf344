//! Release step log records

use api_models::{EventStatus, StepInput, SubEventResponse};
use serde::{Deserialize, Serialize};

/// Root of a release's step log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContainer {
    pub id: u64,
    pub release_id: u64,
}

/// One reported step, or one status transition of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubEvent {
    pub id: u64,
    pub event_container_id: u64,

    /// Groups the status transitions of one logical step
    pub event_id: String,
    pub name: String,

    /// Ordering key chosen by the reporter
    pub index: i64,
    pub status: EventStatus,
    pub info: String,

    /// Append time (Unix epoch seconds)
    pub time: i64,
}

impl SubEvent {
    pub fn to_response(&self) -> SubEventResponse {
        SubEventResponse {
            event_id: self.event_id.clone(),
            name: self.name.clone(),
            index: self.index,
            status: self.status,
            info: self.info.clone(),
            time: self.time,
        }
    }
}

/// A step before it is appended
#[derive(Debug, Clone, PartialEq)]
pub struct NewStep {
    pub event_id: String,
    pub name: String,
    pub index: i64,
    pub status: EventStatus,
    pub info: String,
}

impl From<StepInput> for NewStep {
    fn from(input: StepInput) -> Self {
        Self {
            event_id: input.event_id,
            name: input.name,
            index: input.index,
            status: input.status,
            info: input.info,
        }
    }
}
