//! Authentication and cache error types.
//!
//! This module defines all error types that can occur during token
//! authentication and cache operations.

use std::fmt;

/// Errors that can occur during token authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The presented credential is malformed or does not match any token.
    ///
    /// The same variant (and message) covers both cases so callers can
    /// never distinguish a malformed credential from a wrong one.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of the failure.
        message: String,
    },

    /// The credential resolved to a user that may not authenticate.
    #[error("Inactive user: {message}")]
    InactiveUser {
        /// Description of why the user was rejected.
        message: String,
    },

    /// An error occurred while reading or writing the token store.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The authentication configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `InactiveUser` error.
    #[must_use]
    pub fn inactive_user(message: impl Into<String>) -> Self {
        Self::InactiveUser {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this error rejects the request (4xx category).
    #[must_use]
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::InvalidToken { .. } | Self::InactiveUser { .. })
    }

    /// Returns `true` if this is a server-side error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. }
        )
    }

    /// Returns `true` if the credential itself was rejected.
    #[must_use]
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, Self::InvalidToken { .. })
    }

    /// Returns `true` if the credential was valid but the user may not
    /// authenticate.
    #[must_use]
    pub fn is_inactive_user(&self) -> bool {
        matches!(self, Self::InactiveUser { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidToken { .. } => ErrorCategory::Token,
            Self::InactiveUser { .. } => ErrorCategory::Authentication,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Errors raised by cache backends.
///
/// These never surface from [`TokenCache`](crate::cache::TokenCache)
/// operations: the cache layer absorbs them and degrades to a miss.
/// They exist so backend adapters can report what went wrong.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backing store could not be reached.
    #[error("Cache unavailable: {message}")]
    Unavailable {
        /// Description of the connectivity failure.
        message: String,
    },

    /// The backing store rejected or failed a command.
    #[error("Cache command failed: {message}")]
    Command {
        /// Description of the command failure.
        message: String,
    },
}

impl CacheError {
    /// Creates a new `Unavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a new `Command` error.
    #[must_use]
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
        }
    }

    /// Returns `true` if the backing store was unreachable.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Categories of authentication errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Credential/token validation errors.
    Token,
    /// Identity verification errors.
    Authentication,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token => write!(f, "token"),
            Self::Authentication => write!(f, "authentication"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
