//! Error types for the Switchboard core.
//!
//! Command and engine errors live in `switchboard-framework` and
//! `switchboard-runtime`; this module only covers what adapters see.

use thiserror::Error;

// =============================================================================
// Adapter Errors
// =============================================================================

/// Errors that can occur in adapter operations.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// The adapter could not connect to its platform.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Delivering a response to the platform failed.
    #[error("failed to send response: {0}")]
    SendFailed(String),

    /// Platform data could not be normalized into an event.
    #[error("failed to parse event: {reason}")]
    ParseError {
        /// Reason for failure.
        reason: String,
    },

    /// The event queue was closed while the adapter was still producing.
    #[error(transparent)]
    EventQueue(#[from] EventSendError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal adapter error.
    #[error("adapter error: {0}")]
    Internal(String),
}

impl AdapterError {
    /// Creates an internal adapter error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Creates a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError { reason: msg.into() }
    }

    /// Creates a send error.
    pub fn send(msg: impl Into<String>) -> Self {
        Self::SendFailed(msg.into())
    }
}

impl From<std::io::Error> for AdapterError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Event Queue Errors
// =============================================================================

/// Returned when pushing into an event queue that has been closed.
///
/// The engine closes its event queue when it stops; adapters should treat
/// this as a signal to wind down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event queue closed")]
pub struct EventSendError;

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;
