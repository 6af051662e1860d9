use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("{0}")]
    Validation(String),

    #[error("Email already submitted")]
    DuplicateLead,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedPayload | AppError::Validation(_) | AppError::DuplicateLead => {
                StatusCode::BAD_REQUEST
            }
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Failures of the document and relational stores.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} is unavailable")]
    Unavailable(&'static str),

    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("MySQL error: {0}")]
    MySql(#[from] sqlx::Error),

    #[error("Invalid event data: {0}")]
    EventData(#[from] bson::extjson::de::Error),
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis is unavailable")]
    Unavailable,

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Email not configured")]
    NotConfigured,

    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Invalid message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Relay(#[from] lettre::transport::smtp::Error),
}
