//! Utility functions

use api_models::VersionResponse;

/// Build information of the service
pub fn version_info() -> VersionResponse {
    VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Generate a deploy webhook token: 32 lowercase hex characters
pub fn generate_webhook_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
