//! Error taxonomy for backend calls made by the console.

use shared::{
    domain::OrderId,
    error::{ApiException, ErrorCode},
};
use thiserror::Error;

/// Where a failure surfaces in the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// List or detail load failed; shown as a page-level error, no retry.
    Fetch,
    /// Status update or delete failed; shown as an error notice.
    Mutation,
    /// Rejected locally before reaching the network.
    Validation,
    /// Missing or expired token; the stored token is cleared.
    Auth,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid backend url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("order {0} not found")]
    NotFound(OrderId),
    #[error("backend rejected request ({status}): {message}")]
    Backend { status: u16, message: String },
    #[error("invalid input: {0}")]
    Validation(String),
}

impl ClientError {
    pub fn from_api(status: u16, body: &str, order_id: Option<&OrderId>) -> Self {
        let exception = ApiException::from_response(status, body);
        match (exception.code, order_id) {
            (ErrorCode::Unauthorized | ErrorCode::Forbidden, _) => {
                Self::Unauthorized(exception.message)
            }
            (ErrorCode::NotFound, Some(order_id)) => Self::NotFound(order_id.clone()),
            _ => Self::Backend {
                status,
                message: exception.message,
            },
        }
    }

    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Category of this error when raised by an operation of the given kind.
    pub fn category(&self, mutation: bool) -> ErrorCategory {
        match self {
            Self::Unauthorized(_) => ErrorCategory::Auth,
            Self::Validation(_) | Self::InvalidUrl { .. } => ErrorCategory::Validation,
            _ if mutation => ErrorCategory::Mutation,
            _ => ErrorCategory::Fetch,
        }
    }
}
