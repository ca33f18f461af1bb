use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::{
    auth::accounts::AccountError,
    lookups::{plate::InvalidPlate, workflow::LookupError},
    store::StoreError,
};

/// Error returned by every handler; rendered as `(status, message)`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Insufficient credits. You need at least {required} credits to perform a lookup.")]
    InsufficientCredits { balance: i64, required: i64 },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Remote(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Remote(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, %status, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(message) => AppError::NotFound(message),
            other => AppError::Remote(other.to_string()),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::InvalidCredentials => AppError::Auth(e.to_string()),
            AccountError::EmailTaken => AppError::Conflict(e.to_string()),
            AccountError::NotFound(_) => AppError::NotFound(e.to_string()),
            AccountError::Remote(_) => AppError::Remote(e.to_string()),
        }
    }
}

impl From<InvalidPlate> for AppError {
    fn from(e: InvalidPlate) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<LookupError> for AppError {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::InvalidPlate(e) => e.into(),
            LookupError::InsufficientCredits { balance, required } => {
                AppError::InsufficientCredits { balance, required }
            }
            other => AppError::Remote(other.to_string()),
        }
    }
}
