use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Error family shared by providers, the validator and the lookup services
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Provider {0} not found")]
    UnknownProvider(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{message}{}", body_suffix(.body))]
    Provider {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    Format(String),

    #[error("Missing key: {0}")]
    MissingKey(String),

    #[error("Expected {expected} for {path}")]
    TypeMismatch { expected: &'static str, path: String },

    #[error("{0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn body_suffix(body: &Option<String>) -> String {
    body.as_deref()
        .map(|b| format!(" - {}", b))
        .unwrap_or_default()
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl AppError {
    pub fn unknown_provider(name: impl Into<String>) -> Self {
        Self::UnknownProvider(name.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// Upstream answered with a non-success status.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Provider {
            message: format!("API request failed with status {}", status),
            status: Some(status),
            body: Some(body.into()),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    pub fn missing_key(path: impl Into<String>) -> Self {
        Self::MissingKey(path.into())
    }

    pub fn type_mismatch(expected: &'static str, path: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected,
            path: path.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Upstream failures, including timeouts.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, AppError::Provider { .. } | AppError::Timeout(_))
    }

    /// Upstream HTTP status, when the provider answered with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Provider { status, .. } => *status,
            _ => None,
        }
    }

    /// Schema and payload shape failures.
    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self,
            AppError::Format(_)
                | AppError::MissingKey(_)
                | AppError::TypeMismatch { .. }
                | AppError::InvalidResponse(_)
        )
    }
}

/// Generic 503 returned to callers; the underlying error is only logged.
#[derive(Debug)]
pub struct ServiceUnavailable {
    message: &'static str,
    source: AppError,
}

impl ServiceUnavailable {
    pub fn weather(source: AppError) -> Self {
        Self {
            message: "Weather service unavailable",
            source,
        }
    }

    pub fn suggestions(source: AppError) -> Self {
        Self {
            message: "Address suggestions unavailable",
            source,
        }
    }
}

impl IntoResponse for ServiceUnavailable {
    fn into_response(self) -> Response {
        if self.source.is_validation_failure() {
            error!(error = %self.source, "{}", self.message);
        } else if self.source.is_provider_failure() {
            warn!(error = %self.source, status = ?self.source.status(), "{}", self.message);
        } else {
            warn!(error = %self.source, "{}: rejected request", self.message);
        }

        let body = Json(ErrorResponse {
            error: self.message,
        });

        (StatusCode::SERVICE_UNAVAILABLE, body).into_response()
    }
}
