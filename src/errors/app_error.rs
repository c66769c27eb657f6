use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::core::fallback::AttemptOutcome;
use crate::core::rate_limit::Admission;

/// Stable error codes surfaced to API clients.
///
/// The non-fatal kinds (`ProviderUnavailable`, `ProviderError`, `ProviderTimeout`,
/// `CacheUnavailable`) are recovered internally and normally never reach the
/// HTTP layer on their own; they still get codes because they appear inside
/// fallback attempt logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ConfigInvalid,
    ProviderUnavailable,
    ProviderError,
    ProviderTimeout,
    AllProvidersFailed,
    RateLimitExceeded,
    CacheUnavailable,
    FileTooLarge,
    UnsupportedFormat,
    OrchestratorNotInitialized,
}

impl ErrorKind {
    /// Stable wire code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::ConfigInvalid => "CONFIG_INVALID",
            ErrorKind::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            ErrorKind::ProviderError => "PROVIDER_ERROR",
            ErrorKind::ProviderTimeout => "PROVIDER_TIMEOUT",
            ErrorKind::AllProvidersFailed => "ALL_PROVIDERS_FAILED",
            ErrorKind::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorKind::CacheUnavailable => "CACHE_UNAVAILABLE",
            ErrorKind::FileTooLarge => "FILE_TOO_LARGE",
            ErrorKind::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            ErrorKind::OrchestratorNotInitialized => "ORCHESTRATOR_NOT_INITIALIZED",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::ConfigInvalid => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::AllProvidersFailed => StatusCode::BAD_GATEWAY,
            ErrorKind::RateLimitExceeded => StatusCode::FORBIDDEN,
            ErrorKind::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::UnsupportedFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorKind::OrchestratorNotInitialized => StatusCode::SERVICE_UNAVAILABLE,
            // Non-terminal kinds only surface through a terminal wrapper; if one
            // escapes anyway, treat it as an upstream failure.
            ErrorKind::ProviderUnavailable
            | ErrorKind::ProviderError
            | ErrorKind::ProviderTimeout => StatusCode::BAD_GATEWAY,
            ErrorKind::CacheUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Engine error type covering the full taxonomy from the orchestration core.
#[derive(Debug, Clone, thiserror::Error)]
pub enum VoiceError {
    #[error("voice configuration invalid: {}", errors.join("; "))]
    ConfigInvalid { errors: Vec<String> },

    #[error("all providers failed after {} attempt(s)", attempts.len())]
    AllProvidersFailed { attempts: Vec<AttemptOutcome> },

    #[error("rate limit exceeded: {}/{} requests in current window", admission.current_requests, admission.limit)]
    RateLimitExceeded { admission: Admission },

    #[error("file too large: {size_bytes} bytes exceeds limit of {limit_bytes} bytes")]
    FileTooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("agent '{0}' is not initialized")]
    OrchestratorNotInitialized(String),

    #[error("agent '{0}' not found")]
    UnknownAgent(String),

    #[error("file '{0}' not found")]
    UnknownFile(String),

    #[error("malformed request: {0}")]
    BadRequest(String),
}

impl VoiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VoiceError::ConfigInvalid { .. } => ErrorKind::ConfigInvalid,
            VoiceError::AllProvidersFailed { .. } => ErrorKind::AllProvidersFailed,
            VoiceError::RateLimitExceeded { .. } => ErrorKind::RateLimitExceeded,
            VoiceError::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            VoiceError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            VoiceError::CacheUnavailable(_) => ErrorKind::CacheUnavailable,
            VoiceError::OrchestratorNotInitialized(_) => ErrorKind::OrchestratorNotInitialized,
            // Unknown agent/file and malformed input reuse the generic codes
            // below in `status`; they have no dedicated taxonomy entry.
            VoiceError::UnknownAgent(_) | VoiceError::UnknownFile(_) => ErrorKind::ConfigInvalid,
            VoiceError::BadRequest(_) => ErrorKind::ConfigInvalid,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            VoiceError::UnknownAgent(_) | VoiceError::UnknownFile(_) => StatusCode::NOT_FOUND,
            VoiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            other => other.kind().status(),
        }
    }

    fn wire_code(&self) -> &'static str {
        match self {
            VoiceError::UnknownAgent(_) => "UNKNOWN_AGENT",
            VoiceError::UnknownFile(_) => "UNKNOWN_FILE",
            VoiceError::BadRequest(_) => "BAD_REQUEST",
            other => other.kind().code(),
        }
    }

    /// Structured details included in the error envelope.
    fn details(&self) -> Value {
        match self {
            VoiceError::ConfigInvalid { errors } => json!({ "errors": errors }),
            VoiceError::AllProvidersFailed { attempts } => json!({ "attempts": attempts }),
            VoiceError::RateLimitExceeded { admission } => {
                serde_json::to_value(admission).unwrap_or(Value::Null)
            }
            VoiceError::FileTooLarge {
                size_bytes,
                limit_bytes,
            } => json!({ "size_bytes": size_bytes, "limit_bytes": limit_bytes }),
            _ => Value::Null,
        }
    }
}

impl IntoResponse for VoiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let request_id = Uuid::new_v4();

        if status.is_server_error() {
            tracing::error!(%request_id, error = %self, "request failed");
        } else {
            tracing::warn!(%request_id, error = %self, "request rejected");
        }

        let body = Json(json!({
            "error": self.wire_code(),
            "message": self.to_string(),
            "details": self.details(),
            "timestamp": Utc::now().to_rfc3339(),
            "request_id": request_id,
        }));

        (status, body).into_response()
    }
}

// Result type alias for convenience
pub type VoiceResult<T> = Result<T, VoiceError>;
