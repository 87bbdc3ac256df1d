//! Error types for Pasture

use hyper::StatusCode;

/// Main error type for Pasture operations
#[derive(Debug, thiserror::Error)]
pub enum PastureError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PastureError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to send to clients. Storage and config failures are
    /// reported generically; the full error goes to the log.
    pub fn detail(&self) -> &str {
        match self {
            Self::Unauthenticated(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::InvalidOperation(msg)
            | Self::Malformed(msg) => msg,
            Self::Database(_) | Self::Config(_) | Self::Internal(_) => "Internal server error",
        }
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for PastureError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for PastureError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(format!("Invalid request body: {}", err))
    }
}

impl From<hyper::Error> for PastureError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for PastureError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::oid::Error> for PastureError {
    fn from(_err: bson::oid::Error) -> Self {
        Self::Malformed("Invalid ID format".to_string())
    }
}

impl From<bson::ser::Error> for PastureError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Internal(format!("BSON encode error: {}", err))
    }
}

impl From<bson::de::Error> for PastureError {
    fn from(err: bson::de::Error) -> Self {
        Self::Internal(format!("BSON decode error: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for PastureError {
    fn from(_err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthenticated("Could not validate credentials".to_string())
    }
}

/// Result type alias for Pasture operations
pub type Result<T> = std::result::Result<T, PastureError>;
