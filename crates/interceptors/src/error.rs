//! Error module

use thiserror::Error;
use tonic::{Code, Status};

/// Error raised by a handler behavior.
///
/// `Status` errors carry an embedded status code; `Internal` errors do not,
/// and are accounted as `UNKNOWN`.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("{0}")]
    Status(#[from] Status),

    #[error("Internal error: {0}")]
    Internal(#[source] anyhow::Error),
}

impl RpcError {
    /// The status code embedded in the error, if any
    pub fn code(&self) -> Option<Code> {
        match self {
            RpcError::Status(status) => Some(status.code()),
            RpcError::Internal(_) => None,
        }
    }

    /// Build a code-less error from any error value
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        RpcError::Internal(err.into())
    }
}

impl From<RpcError> for Status {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Status(status) => status,
            RpcError::Internal(err) => Status::new(Code::Unknown, err.to_string()),
        }
    }
}

pub type RpcResult<T> = Result<T, RpcError>;

/// Errors raised while setting up the interceptors
#[derive(Debug, Error)]
pub enum InterceptorError {
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type InterceptorResult<T> = Result<T, InterceptorError>;
