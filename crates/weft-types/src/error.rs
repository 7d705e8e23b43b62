//! Unified error interface for weft.
//!
//! This module provides the [`ErrorCode`] trait for standardized
//! error handling across all weft crates.
//!
//! # Design
//!
//! Every weft error type implements [`ErrorCode`] to provide:
//!
//! - **Machine-readable codes**: For programmatic error handling
//! - **Recoverability info**: Whether a caller can expect a retry to help
//!
//! # Example
//!
//! ```
//! use weft_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum LookupError {
//!     Missing(String),
//!     Busy,
//! }
//!
//! impl ErrorCode for LookupError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Missing(_) => "LOOKUP_MISSING",
//!             Self::Busy => "LOOKUP_BUSY",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Busy)
//!     }
//! }
//!
//! let err = LookupError::Busy;
//! assert_eq!(err.code(), "LOOKUP_BUSY");
//! assert!(err.is_recoverable());
//! ```

use thiserror::Error;

/// Unified error code interface for weft errors.
///
/// # Code Format
///
/// Error codes should be:
///
/// - **UPPER_SNAKE_CASE**: e.g., `"UNRESOLVED_RULE"`
/// - **Namespace-prefixed**: one of [`ERROR_NAMESPACES`] followed by `_`
/// - **Stable**: codes are part of the public contract
///
/// # Recoverability
///
/// Configuration errors (bad pointcut, unknown named rule) are never
/// recoverable: the registry has to be rebuilt from fixed input.
/// Per-call failures are recoverable when the underlying [`Fault`](crate::Fault)
/// says so.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;

    /// Returns whether the error is recoverable.
    ///
    /// - `true`: Retry may succeed
    /// - `false`: Retry will not help, requires code/config change
    fn is_recoverable(&self) -> bool;
}

/// Code namespaces, one per weft error family.
pub const ERROR_NAMESPACES: [&str; 4] = ["CALL_SITE", "ADVICE", "INVOCATION", "CONFIG"];

/// Ways a code can break the conventions of [`ErrorCode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeViolation {
    /// The namespace is not in [`ERROR_NAMESPACES`].
    #[error("namespace '{0}' is not a weft error namespace")]
    UnknownNamespace(String),

    /// The code does not start with `NAMESPACE_`.
    #[error("error code '{code}' is not in namespace '{namespace}'")]
    OutsideNamespace { code: String, namespace: String },

    /// The part after the namespace is not UPPER_SNAKE_CASE.
    #[error("error code '{0}' must be UPPER_SNAKE_CASE")]
    NotUpperSnake(String),
}

/// Checks `code` against `namespace` (e.g. `"ADVICE"`).
///
/// A code must be `NAMESPACE_SOMETHING`; the bare namespace is not a code.
///
/// # Errors
///
/// The first [`CodeViolation`] found.
pub fn check_error_code(code: &str, namespace: &str) -> Result<(), CodeViolation> {
    if !ERROR_NAMESPACES.contains(&namespace) {
        return Err(CodeViolation::UnknownNamespace(namespace.to_string()));
    }
    let detail = code
        .strip_prefix(namespace)
        .and_then(|rest| rest.strip_prefix('_'))
        .unwrap_or_default();
    if detail.is_empty() {
        return Err(CodeViolation::OutsideNamespace {
            code: code.to_string(),
            namespace: namespace.to_string(),
        });
    }
    if !is_upper_snake(detail) {
        return Err(CodeViolation::NotUpperSnake(code.to_string()));
    }
    Ok(())
}

/// Asserts that `err` follows the conventions of [`ErrorCode`].
///
/// # Panics
///
/// Panics with the [`CodeViolation`] if it does not.
///
/// # Example
///
/// ```
/// use weft_types::{assert_error_code, ErrorCode};
///
/// #[derive(Debug)]
/// struct StaleCache;
///
/// impl ErrorCode for StaleCache {
///     fn code(&self) -> &'static str { "ADVICE_STALE_CACHE" }
///     fn is_recoverable(&self) -> bool { true }
/// }
///
/// assert_error_code(&StaleCache, "ADVICE");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, namespace: &str) {
    if let Err(violation) = check_error_code(err.code(), namespace) {
        panic!("{violation}");
    }
}

/// Asserts every variant in `errors` shares `namespace`.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], namespace: &str) {
    for err in errors {
        assert_error_code(err, namespace);
    }
}

fn is_upper_snake(s: &str) -> bool {
    !s.starts_with('_')
        && !s.ends_with('_')
        && !s.contains("__")
        && s.chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
