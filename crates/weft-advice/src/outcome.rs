//! Per-call results.
//!
//! Every dispatched call ends in exactly one [`Outcome`]: a value or a
//! single typed [`InvocationError`].

use crate::AdviceKind;
use thiserror::Error;
use weft_types::{CallSite, ErrorCode, Fault, Value};

/// A failure observed by the caller of a dispatched operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    /// Raised by an advice handler.
    #[error("{kind} advice '{advice_id}' failed at {call_site}: {fault}")]
    AdviceExecution {
        /// ID of the failing binding.
        advice_id: String,
        /// Kind of the failing binding.
        kind: AdviceKind,
        /// Call site being intercepted.
        call_site: CallSite,
        /// The raised fault.
        fault: Fault,
    },

    /// Raised by the target operation itself.
    #[error("{call_site} failed: {fault}")]
    TargetOperation {
        /// Call site of the failing operation.
        call_site: CallSite,
        /// The raised fault.
        fault: Fault,
    },
}

impl InvocationError {
    /// Creates a target failure.
    pub fn target(call_site: CallSite, fault: Fault) -> Self {
        Self::TargetOperation { call_site, fault }
    }

    /// The underlying fault.
    #[must_use]
    pub fn fault(&self) -> &Fault {
        match self {
            Self::AdviceExecution { fault, .. } | Self::TargetOperation { fault, .. } => fault,
        }
    }

    /// The call site the failure occurred at.
    #[must_use]
    pub fn call_site(&self) -> &CallSite {
        match self {
            Self::AdviceExecution { call_site, .. } | Self::TargetOperation { call_site, .. } => {
                call_site
            }
        }
    }

    /// ID of the failing advice, if an advice raised it.
    #[must_use]
    pub fn advice_id(&self) -> Option<&str> {
        match self {
            Self::AdviceExecution { advice_id, .. } => Some(advice_id),
            Self::TargetOperation { .. } => None,
        }
    }

    /// Failures raised by a post-phase handler skip the remaining
    /// post-phase handlers of the same invocation.
    pub(crate) fn aborts_post_phase(&self) -> bool {
        matches!(self, Self::AdviceExecution { kind, .. } if kind.is_post())
    }
}

impl ErrorCode for InvocationError {
    fn code(&self) -> &'static str {
        match self {
            Self::AdviceExecution { .. } => "INVOCATION_ADVICE_FAILED",
            Self::TargetOperation { .. } => "INVOCATION_TARGET_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        self.fault().recoverable
    }
}

/// Result of running an interception chain.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The call produced a value.
    Returned(Value),
    /// The call failed.
    Raised(InvocationError),
}

impl Outcome {
    /// Returns `true` for [`Outcome::Returned`].
    #[must_use]
    pub fn is_returned(&self) -> bool {
        matches!(self, Self::Returned(_))
    }

    /// Returns `true` for [`Outcome::Raised`].
    #[must_use]
    pub fn is_raised(&self) -> bool {
        matches!(self, Self::Raised(_))
    }

    /// The returned value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Returned(v) => Some(v),
            Self::Raised(_) => None,
        }
    }

    /// The failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&InvocationError> {
        match self {
            Self::Returned(_) => None,
            Self::Raised(e) => Some(e),
        }
    }

    /// Converts into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the failure of a [`Outcome::Raised`] outcome.
    pub fn into_result(self) -> Result<Value, InvocationError> {
        match self {
            Self::Returned(v) => Ok(v),
            Self::Raised(e) => Err(e),
        }
    }
}

impl From<Result<Value, InvocationError>> for Outcome {
    fn from(result: Result<Value, InvocationError>) -> Self {
        match result {
            Ok(v) => Self::Returned(v),
            Err(e) => Self::Raised(e),
        }
    }
}

/// What an AfterThrowing handler does with the failure it observed.
#[derive(Debug, Clone, Default)]
pub enum ThrowingAction {
    /// Let the failure propagate unchanged.
    #[default]
    Rethrow,
    /// Raise `Fault` instead, attributed to the AfterThrowing binding.
    /// Only honored for bindings registered as recoverable.
    Replace(Fault),
    /// Turn the failure into a value. Only honored for bindings registered
    /// as recoverable.
    Recover(Value),
}
