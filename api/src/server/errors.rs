//! API error responses

use api_models::ErrorResponse;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{debug, error};

use crate::errors::ReleaseError;

/// Request body could not be decoded
pub const CODE_DECODE: u32 = 600;
/// Request fields failed validation
pub const CODE_VALIDATE_FIELDS: u32 = 601;
/// Release data could not be read
pub const CODE_READ_DATA: u32 = 602;
/// Deploy did not go through
pub const CODE_DEPLOY: u32 = 603;
/// Anything else
pub const CODE_INTERNAL: u32 = 500;

pub type ApiResult<T> = Result<T, ApiError>;

/// HTTP error with a status and a numeric error code
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: u32,
    errors: Vec<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: u32, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            errors: vec![message.into()],
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> u32 {
        self.code
    }
}

impl From<ReleaseError> for ApiError {
    fn from(err: ReleaseError) -> Self {
        let message = err.to_string();
        let (status, code) = match &err {
            ReleaseError::NotFound(_) => (StatusCode::NOT_FOUND, CODE_READ_DATA),
            ReleaseError::AutoDeployDisabled(_) => (StatusCode::BAD_REQUEST, CODE_VALIDATE_FIELDS),
            ReleaseError::ValidationError(_) => (StatusCode::BAD_REQUEST, CODE_VALIDATE_FIELDS),
            ReleaseError::Conflict(_) => (StatusCode::CONFLICT, CODE_VALIDATE_FIELDS),
            ReleaseError::UpgradeFailed(_) | ReleaseError::EngineError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, CODE_DEPLOY)
            }
            ReleaseError::MalformedConfig(_)
            | ReleaseError::UnrecognizedKind(_)
            | ReleaseError::StorageError(_) => (StatusCode::INTERNAL_SERVER_ERROR, CODE_READ_DATA),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, CODE_INTERNAL),
        };

        if status.is_server_error() {
            error!("Request failed: {}", message);
        } else {
            debug!("Request rejected: {}", message);
        }

        Self::new(status, code, message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, CODE_DECODE, rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, CODE_VALIDATE_FIELDS, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: self.code,
            errors: self.errors,
        };
        (self.status, Json(body)).into_response()
    }
}
