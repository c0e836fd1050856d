//! Server error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while running the petcare server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error body returned by every API endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message
    pub detail: String,
}

/// Errors surfaced to API callers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Rejected input (upload type, size, missing field, bad JSON)
    #[error("{0}")]
    BadRequest(String),

    /// Failure from model resolution or a provider call
    #[error(transparent)]
    Model(#[from] petcare_models::Error),
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        use petcare_models::Error as M;

        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Model(err) => match err {
                M::UnknownModel { .. } | M::CapabilityNotSupported { .. } => {
                    StatusCode::BAD_REQUEST
                }
                M::NoCredentialsConfigured { .. } | M::ModelUnavailable { .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                M::AllCredentialsExhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
                M::Provider { .. }
                | M::Request(_)
                | M::InvalidResponse(_)
                | M::Serialization(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }

    fn detail(&self) -> String {
        match self.status() {
            StatusCode::BAD_GATEWAY => format!("AI provider error: {self}"),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), "request failed: {}", self);
        } else {
            tracing::debug!(status = status.as_u16(), "request rejected: {}", self);
        }
        (status, Json(ErrorBody { detail: self.detail() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petcare_models::Error as M;

    fn status_of(err: M) -> StatusCode {
        ApiError::from(err).status()
    }

    #[test]
    fn model_errors_map_to_statuses() {
        assert_eq!(
            status_of(M::UnknownModel {
                requested: "x".into(),
                valid: vec!["gemini"],
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(M::NoCredentialsConfigured {
                provider: "gemini".into(),
                hint: "Set GEMINI_API_KEY.".into(),
            }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(M::AllCredentialsExhausted {
                provider: "gemini".into(),
                attempts: 2,
                last: "429".into(),
            }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(M::InvalidResponse("not json".into())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn gateway_errors_are_prefixed() {
        let err = ApiError::from(M::Request("connection reset".into()));
        assert!(err.detail().starts_with("AI provider error: "));

        let err = ApiError::BadRequest("File too large.".into());
        assert_eq!(err.detail(), "File too large.");
    }
}
