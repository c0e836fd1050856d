//! Error types for model routing and provider calls.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving or invoking an analyzer.
#[derive(Debug, Error)]
pub enum Error {
    /// Requested model id is neither canonical nor a known alias.
    #[error("Unknown model: {requested}. Choose from: {}", valid.join(", "))]
    UnknownModel {
        /// The id as supplied by the caller.
        requested: String,
        /// Canonical ids that would have been accepted.
        valid: Vec<&'static str>,
    },

    /// The resolved analyzer cannot perform the requested operation.
    #[error("{model} does not support {operation}. Use {}", suggestion(alternatives))]
    CapabilityNotSupported {
        /// Human-readable model name.
        model: &'static str,
        /// Operation that was asked for (e.g. "audio analysis").
        operation: &'static str,
        /// Canonical ids of variants that do support the operation.
        alternatives: Vec<&'static str>,
    },

    /// The credential pool for a provider is empty.
    #[error("No {provider} API key set. {hint}")]
    NoCredentialsConfigured {
        /// Provider name (e.g. "gemini").
        provider: String,
        /// Which environment variables to set.
        hint: String,
    },

    /// Every credential in the pool hit a rate limit on this call.
    #[error("all {attempts} {provider} credentials are rate limited: {last}")]
    AllCredentialsExhausted {
        /// Provider name.
        provider: String,
        /// Number of attempts made (one per credential).
        attempts: usize,
        /// Message of the last rate-limit error.
        last: String,
    },

    /// The model is gated or missing for the configured token.
    #[error("Model {model} may not be available or requires license. {hint}")]
    ModelUnavailable {
        /// Provider model name.
        model: String,
        /// Where to go to fix it.
        hint: String,
    },

    /// Provider API returned an error response.
    #[error("{provider} API error{}: {message}", status_suffix(*status, code.as_deref()))]
    Provider {
        /// Provider name.
        provider: String,
        /// HTTP status, when the error came from a response.
        status: Option<u16>,
        /// Provider-specific status string (e.g. `RESOURCE_EXHAUSTED`).
        code: Option<String>,
        /// Provider error message.
        message: String,
    },

    /// Request failed before a response was received.
    #[error("request failed: {0}")]
    Request(String),

    /// Provider output could not be interpreted.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn suggestion(alternatives: &[&'static str]) -> String {
    if alternatives.is_empty() {
        return "a different model".to_string();
    }
    alternatives
        .iter()
        .map(|id| format!("model={id}"))
        .collect::<Vec<_>>()
        .join(" or ")
}

fn status_suffix(status: Option<u16>, code: Option<&str>) -> String {
    match (status, code) {
        (Some(status), Some(code)) => format!(" ({status} {code})"),
        (Some(status), None) => format!(" ({status})"),
        (None, Some(code)) => format!(" ({code})"),
        (None, None) => String::new(),
    }
}

impl Error {
    /// Whether this error is a transient rate-limit/quota signal.
    ///
    /// Matches HTTP 429, the `RESOURCE_EXHAUSTED` provider status, or
    /// rate-limit wording anywhere in the message.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Error::Provider {
                status,
                code,
                message,
                ..
            } => {
                *status == Some(429)
                    || code
                        .as_deref()
                        .is_some_and(|c| c.eq_ignore_ascii_case("RESOURCE_EXHAUSTED"))
                    || mentions_rate_limit(message)
            }
            Error::Request(message) => mentions_rate_limit(message),
            _ => false,
        }
    }

    /// Whether the caller can fix this by changing the request.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownModel { .. } | Error::CapabilityNotSupported { .. }
        )
    }
}

fn mentions_rate_limit(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["429", "rate limit", "quota", "resource exhausted", "resource_exhausted"]
        .iter()
        .any(|needle| lower.contains(needle))
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Error::Provider {
                provider: "http".to_string(),
                status: Some(status.as_u16()),
                code: None,
                message: err.to_string(),
            },
            None => Error::Request(err.to_string()),
        }
    }
}
