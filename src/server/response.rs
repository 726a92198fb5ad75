//! JSON envelope and error-to-status mapping
//!
//! Every body is `{ "status", "data", "message" }` and the HTTP status
//! always equals `status`. Errors carry `data: null`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::Error;

pub type ApiResult = std::result::Result<ApiResponse, ApiError>;

/// Response body shared by success and error replies
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub status: u16,
    pub data: serde_json::Value,
    pub message: String,
}

/// Successful reply
#[derive(Debug)]
pub struct ApiResponse {
    status: StatusCode,
    data: serde_json::Value,
    message: String,
}

impl ApiResponse {
    pub fn ok<T: Serialize>(data: &T, message: impl Into<String>) -> ApiResult {
        Self::with_status(StatusCode::OK, data, message)
    }

    pub fn created<T: Serialize>(data: &T, message: impl Into<String>) -> ApiResult {
        Self::with_status(StatusCode::CREATED, data, message)
    }

    fn with_status<T: Serialize>(status: StatusCode, data: &T, message: impl Into<String>) -> ApiResult {
        let data = serde_json::to_value(data).map_err(|e| ApiError::Internal {
            message: format!("failed to serialize response: {}", e),
        })?;
        Ok(Self { status, data, message: message.into() })
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let body = Envelope {
            status: self.status.as_u16(),
            data: self.data,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Missing or invalid input (400)
    Validation { message: String },

    /// Resource not found (404)
    NotFound { message: String },

    /// Unique field already taken (424)
    Conflict { field: String },

    /// Route exists but not for this method (405)
    MethodNotAllowed { message: String },

    /// Anything else (500, logged)
    Internal { message: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::FAILED_DEPENDENCY,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Validation { message }
            | Self::NotFound { message }
            | Self::MethodNotAllowed { message } => message.clone(),
            Self::Conflict { field } => format!("{} already exists", field),
            Self::Internal { message } => {
                // Log the actual error, return generic message
                tracing::error!("Internal error: {}", message);
                "an internal error occurred".to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Envelope {
            status: status.as_u16(),
            data: serde_json::Value::Null,
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Validation(message) => Self::Validation { message },
            Error::NotFound { .. } => Self::NotFound { message: e.to_string() },
            Error::Conflict { field } => Self::Conflict { field },
            Error::MalformedQuery(_) | Error::Schema(_) | Error::Storage(_) | Error::Io(_) => {
                Self::Internal { message: e.to_string() }
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::Validation { message: e.body_text() }
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        Self::Validation { message: e.body_text() }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self::Validation { message: e.body_text() }
    }
}
