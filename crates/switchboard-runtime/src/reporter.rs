//! Where runtime failures go.
//!
//! Failures that must not stop the engine (an adapter that cannot start,
//! a delivery that fails) are handed to an [`ErrorReporter`]. The default,
//! [`TracingReporter`], logs them.

use std::sync::Arc;

use switchboard_core::AdapterError;
use tracing::error;

/// The operation an adapter failed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterOperation {
    Start,
    SendResponse,
    Close,
}

impl AdapterOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::SendResponse => "send_response",
            Self::Close => "close",
        }
    }
}

impl std::fmt::Display for AdapterOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives adapter failures.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, adapter: &str, operation: AdapterOperation, error: &AdapterError);
}

/// A shared reporter trait object.
pub type BoxedReporter = Arc<dyn ErrorReporter>;

/// Logs every failure at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, adapter: &str, operation: AdapterOperation, error: &AdapterError) {
        error!(adapter, operation = %operation, error = %error, "Adapter operation failed");
    }
}
