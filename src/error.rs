use axum::{
    response::{IntoResponse, Response},
    Json,
};
use hyper::StatusCode;
use serde_json::json;
use thiserror::Error;

/// Failures while receiving a gateway webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook secret is not configured")]
    MissingSecret,

    #[error("signature header is missing")]
    MissingSignature,

    #[error("signature does not match payload")]
    InvalidSignature,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingSecret | Self::MissingSignature | Self::InvalidSignature => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidPayload(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        WebhookError::InvalidPayload(err.to_string())
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Only authentication failures describe themselves to the caller.
        let message = if status == StatusCode::BAD_REQUEST {
            self.to_string()
        } else {
            "internal server error".to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Failures talking to the order database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Failures sending confirmation emails.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail transport is not configured")]
    NotConfigured,

    #[error("invalid email address {0:?}")]
    InvalidAddress(String),

    #[error("could not build message: {0}")]
    Build(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors surfaced by the checkout endpoints.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("payment gateway error: {0}")]
    Gateway(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Gateway(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match &self {
            Self::Store(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
