//! Error types for pool operations
use std::time::Duration;

use thiserror::Error;

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for pool construction, acquisition, and lifecycle operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Pool configuration is invalid
    #[error("configuration error: {message}")]
    Configuration {
        /// The error message
        message: String,
    },

    /// The factory failed to create a handle.
    ///
    /// Never retried automatically; the acquirer decides whether to retry.
    #[error("handle creation failed: {reason}")]
    Creation {
        /// The failure reason
        reason: String,
        /// The underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No handle became available within the caller's deadline
    #[error("pool exhausted: {in_use}/{capacity} handles in use after waiting {waited:?}")]
    Exhausted {
        /// Handles leased out when the wait expired
        in_use: usize,
        /// Maximum number of live handles
        capacity: usize,
        /// How long the caller waited
        waited: Duration,
    },

    /// The pool has been shut down
    #[error("pool is shut down")]
    Closed,
}

impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a creation error without an underlying source
    pub fn creation<S: Into<String>>(reason: S) -> Self {
        Self::Creation {
            reason: reason.into(),
            source: None,
        }
    }

    /// Create a creation error wrapping an underlying error
    pub fn creation_with<S, E>(reason: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Creation {
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Check if this error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}
