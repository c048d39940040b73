use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::payments::types::AmountError;
use crate::payments::workflow::TransitionError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Malformed callback: {message}")]
    MalformedCallback { message: String },

    /// A callback referenced state that cannot exist for a legitimate
    /// gateway request.
    #[error("Suspicious operation: {message}")]
    SuspiciousOperation { message: String },

    #[error("Currency needs to be {expected}, got {found}")]
    CurrencyMismatch { expected: String, found: String },

    #[error("Invalid amount: {0}")]
    Amount(#[from] AmountError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("{entity} with ID '{id}' not found")]
    NotFound { entity: String, id: String },

    #[error("Storage error: {message}")]
    Storage { message: String, is_retryable: bool },

    #[error("Template error: {message}")]
    Template { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The payment method cannot be used for this cart.
    #[error("Payment unavailable: {message}")]
    PaymentUnavailable { message: String },
}

impl AppError {
    pub fn malformed_callback(message: impl Into<String>) -> Self {
        Self::MalformedCallback {
            message: message.into(),
        }
    }

    pub fn suspicious_operation(message: impl Into<String>) -> Self {
        Self::SuspiciousOperation {
            message: message.into(),
        }
    }

    pub fn currency_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::CurrencyMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn payment_unavailable(message: impl Into<String>) -> Self {
        Self::PaymentUnavailable {
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Storage {
                is_retryable: true,
                ..
            }
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedCallback { .. }
            | Self::SuspiciousOperation { .. }
            | Self::Amount(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::PaymentUnavailable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Transition(_) => StatusCode::CONFLICT,
            Self::Storage { .. } if self.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            Self::CurrencyMismatch { .. }
            | Self::Storage { .. }
            | Self::Template { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<handlebars::RenderError> for AppError {
    fn from(err: handlebars::RenderError) -> Self {
        Self::Template {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "database")]
impl From<crate::database::error::DatabaseError> for AppError {
    fn from(err: crate::database::error::DatabaseError) -> Self {
        if err.is_not_found() {
            if let crate::database::error::DatabaseErrorKind::NotFound { entity, id } = &err.kind {
                return Self::not_found(entity.clone(), id);
            }
        }
        Self::Storage {
            message: err.to_string(),
            is_retryable: err.is_retryable(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        // Internal details stay in the log.
        let body = if status.is_server_error() {
            status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string()
        } else {
            self.to_string()
        };
        (status, body).into_response()
    }
}
