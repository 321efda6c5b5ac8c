//! Error types for the caching proxy
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Backend Error Enum ==
/// Failure while loading a key from the backing store.
///
/// Cloneable because a single failed load is delivered to every caller
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backing store could not be reached
    #[error("Backing store unavailable: {0}")]
    Connection(String),

    /// The backing store rejected or failed the command
    #[error("Backing store command failed: {0}")]
    Command(String),

    /// The task running the load ended without producing a result
    #[error("Load aborted: {0}")]
    LoadAborted(String),
}

impl From<redis::RedisError> for BackendError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_io_error()
            || err.is_timeout()
        {
            BackendError::Connection(err.to_string())
        } else {
            BackendError::Command(err.to_string())
        }
    }
}

// == Proxy Error Enum ==
/// Errors surfaced by the HTTP frontend.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Loading from the backing store failed
    #[error(transparent)]
    Backend(#[from] BackendError),
}

// == IntoResponse Implementation ==
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ProxyError::Backend(err) => (StatusCode::BAD_GATEWAY, err.to_string()),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// == Config Error Enum ==
/// Startup configuration errors. All of them are fatal.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A numeric option did not parse
    #[error("{name} is '{value}' but should be a number")]
    InvalidNumber { name: &'static str, value: String },

    /// REDIS_ADDRESS is not of the form host:port
    #[error("REDIS_ADDRESS is {0} but should be in format host:port")]
    InvalidAddress(String),

    /// A numeric option parsed but is not usable
    #[error("{name} must be greater than zero")]
    OutOfRange { name: &'static str },
}

// == Result Type Alias ==
/// Convenience Result type for the HTTP layer.
pub type Result<T> = std::result::Result<T, ProxyError>;
