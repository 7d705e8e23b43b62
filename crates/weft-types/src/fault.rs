//! Failures raised by target operations and advice handlers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failure raised by an intercepted operation or by an advice handler.
///
/// `code` classifies the failure (e.g. `"IO"`, `"VALIDATION"`), `message`
/// carries the human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct Fault {
    /// Failure class.
    pub code: String,
    /// Human-readable detail.
    pub message: String,
    /// Whether retrying the operation may succeed.
    #[serde(default)]
    pub recoverable: bool,
}

impl Fault {
    /// Creates a non-recoverable fault.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            recoverable: false,
        }
    }

    /// Marks the fault as recoverable.
    #[must_use]
    pub fn recoverable(mut self) -> Self {
        self.recoverable = true;
        self
    }
}
