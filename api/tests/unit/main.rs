//! Integration tests for the release API

mod fakes;
mod test_deployer;
mod test_event_log;
mod test_router;
