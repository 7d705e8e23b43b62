//! Configuration-time errors.
//!
//! Every variant is fatal: a registry is never sealed from input that
//! produced one of these. Per-call failures live in
//! [`InvocationError`](crate::InvocationError).

use crate::AdviceKind;
use thiserror::Error;
use weft_types::ErrorCode;

/// Errors raised while defining pointcuts and registering advice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdviceError {
    /// Pointcut expression could not be parsed.
    #[error("invalid pointcut '{expr}': {reason}")]
    InvalidPointcut {
        /// The offending expression.
        expr: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A pointcut references a named rule that has not been defined.
    #[error("unresolved pointcut reference: {name}")]
    UnresolvedRule {
        /// The unknown name.
        name: String,
    },

    /// Unknown advice kind string.
    #[error("unknown advice kind: {0}")]
    UnknownAdviceKind(String),

    /// Two advices were registered under the same ID.
    #[error("duplicate advice id: {0}")]
    DuplicateAdvice(String),

    /// Two named pointcuts share a name.
    #[error("duplicate pointcut name: {0}")]
    DuplicatePointcut(String),

    /// Unknown builtin handler name.
    #[error("unknown advice handler: {0}")]
    UnknownHandler(String),

    /// Builtin handler is used with a kind it does not implement.
    #[error("handler '{handler}' runs as {expected} advice, not {found}")]
    HandlerKindMismatch {
        /// Handler name.
        handler: String,
        /// Kind the handler implements.
        expected: AdviceKind,
        /// Kind requested by the definition.
        found: AdviceKind,
    },

    /// A handler option is missing or out of range.
    #[error("handler '{handler}': {message}")]
    InvalidHandlerOption {
        /// Handler name.
        handler: String,
        /// What is wrong.
        message: String,
    },
}

impl AdviceError {
    /// Creates an invalid pointcut error.
    pub fn invalid_pointcut(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPointcut {
            expr: expr.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unresolved rule error.
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self::UnresolvedRule { name: name.into() }
    }
}

impl ErrorCode for AdviceError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidPointcut { .. } => "ADVICE_INVALID_POINTCUT",
            Self::UnresolvedRule { .. } => "ADVICE_UNRESOLVED_RULE",
            Self::UnknownAdviceKind(_) => "ADVICE_UNKNOWN_KIND",
            Self::DuplicateAdvice(_) => "ADVICE_DUPLICATE_ID",
            Self::DuplicatePointcut(_) => "ADVICE_DUPLICATE_POINTCUT",
            Self::UnknownHandler(_) => "ADVICE_UNKNOWN_HANDLER",
            Self::HandlerKindMismatch { .. } => "ADVICE_HANDLER_KIND_MISMATCH",
            Self::InvalidHandlerOption { .. } => "ADVICE_INVALID_HANDLER_OPTION",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
