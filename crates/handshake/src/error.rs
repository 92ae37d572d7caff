//! Error types for handshake traversal and store operations.
//!
//! ## Error Philosophy
//!
//! A traversal either completes or fails as a whole:
//! - Store failures, cancellation and missed deadlines abort the call and
//!   discard everything accumulated so far
//! - Hitting `max_total` is **not** an error; it is reported through the
//!   `truncated` flag on the result
//! - "No path within `max_depth`" is **not** an error either; it is
//!   `PathOutcome::NotFound`
//!
//! Input problems (`InvalidParameter`, `RootNotFound`) are detected before
//! any neighbor lookup is issued.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::domain::UserId;

/// A specialized Result type for handshake operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for handshake operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The connection store could not serve a query.
    ///
    /// Transient by nature; callers may retry the whole operation.
    #[error("connection store unavailable: {0}")]
    StoreUnavailable(String),

    /// A request parameter is out of bounds or malformed.
    #[error("invalid {name}: {reason}")]
    InvalidParameter {
        /// The parameter that was rejected.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The requested user does not exist in the connection graph.
    #[error("user not found in connection graph: {0}")]
    RootNotFound(UserId),

    /// The call was cancelled through its `CancelToken`.
    #[error("traversal cancelled")]
    Cancelled,

    /// The call did not finish before its deadline.
    #[error("traversal deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    /// A store write was rejected.
    #[error("connection rejected: {0}")]
    Connection(#[from] ConnectionError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for an [`Error::InvalidParameter`].
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Returns `true` if retrying the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::DeadlineExceeded(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::StoreUnavailable(format!("store task failed: {e}"))
    }
}

/// Reasons a store refuses to create a connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// Both endpoints are the same user.
    #[error("{0} cannot connect to themselves")]
    SelfConnection(UserId),

    /// The unordered pair is already connected.
    #[error("{a} and {b} are already connected")]
    AlreadyConnected {
        /// Lower endpoint.
        a: UserId,
        /// Higher endpoint.
        b: UserId,
    },

    /// One endpoint already holds the maximum number of connections.
    #[error("{user} has reached the connection limit of {limit}")]
    LimitReached {
        /// The saturated user.
        user: UserId,
        /// The enforced maximum.
        limit: usize,
    },

    /// An endpoint is not a registered user.
    #[error("unknown user {0}")]
    UnknownUser(UserId),
}
