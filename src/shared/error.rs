//! Shared Error Types
//!
//! One taxonomy for every failure that can cross a component boundary.
//! Protocol handlers and REST handlers convert all internal errors
//! (sqlx, jsonwebtoken, bad payloads) into a `ChatError` before anything
//! is emitted or returned - raw internal errors never cross the wire.
//!
//! # Error Categories
//!
//! - `Validation` - bad input shape or missing fields; never retried
//! - `Auth` - invalid/expired/missing token; triggers client logout
//! - `NotFound` - referenced message or user absent
//! - `Transient` - persistence/network failure; eligible for bounded
//!   client retry
//! - `Policy` - rate limiting and similar; representable but not central

use thiserror::Error;

/// Error taxonomy shared by the server and the client core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Bad input shape or content; surfaced to the user immediately.
    #[error("Validation error in field '{field}': {message}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// Invalid, expired or missing credentials.
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Referenced message or user does not exist.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Persistence or network failure; may succeed on retry.
    #[error("Transient error: {message}")]
    Transient { message: String },

    /// Request refused by policy (e.g. rate limiting).
    #[error("Policy error: {message}")]
    Policy { message: String },
}

impl ChatError {
    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a new transient error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Create a new policy error
    pub fn policy(message: impl Into<String>) -> Self {
        Self::Policy {
            message: message.into(),
        }
    }

    /// Stable machine-readable category, used in wire error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Auth { .. } => "auth",
            Self::NotFound { .. } => "not_found",
            Self::Transient { .. } => "transient",
            Self::Policy { .. } => "policy",
        }
    }

    /// Only transient failures are eligible for client-side retry.
    /// Validation and auth failures must surface immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

impl From<sqlx::Error> for ChatError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::not_found("record not found"),
            other => {
                tracing::error!("storage failure: {:?}", other);
                Self::transient("storage failure")
            }
        }
    }
}

impl From<jsonwebtoken::errors::Error> for ChatError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::auth(format!("invalid token: {}", err))
    }
}
