//! Call-site descriptors.
//!
//! A [`CallSite`] identifies one interception point by owner type,
//! operation name and argument shape:
//!
//! ```text
//! <owner>.<operation>(<type>, <type>, ...)
//! ```
//!
//! Example: `demo.dao.AccountDao.addAccount(Account, bool)`.
//!
//! Call sites are only used for matching and reporting. They are cheap
//! to hash so that resolutions can be cached per call site.

use crate::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Type tag of a single positional argument (e.g. `"Account"`, `"bool"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTag(String);

impl TypeTag {
    /// Creates a type tag.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the tag text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeTag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TypeTag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Errors from parsing the textual call-site form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCallSiteError {
    /// Input was empty.
    #[error("empty call site")]
    Empty,

    /// Missing or unbalanced argument parentheses.
    #[error("call site '{0}' must end with an argument list '(...)'")]
    MissingArguments(String),

    /// No `owner.` prefix before the operation name.
    #[error("call site '{0}' has no owner type (expected 'owner.operation(...)')")]
    MissingOwner(String),

    /// Empty operation name.
    #[error("call site '{0}' has an empty operation name")]
    EmptyOperation(String),

    /// An argument slot between commas was empty.
    #[error("call site '{0}' has an empty argument type")]
    EmptyArgument(String),
}

impl ErrorCode for ParseCallSiteError {
    fn code(&self) -> &'static str {
        match self {
            Self::Empty => "CALL_SITE_EMPTY",
            Self::MissingArguments(_) => "CALL_SITE_MISSING_ARGUMENTS",
            Self::MissingOwner(_) => "CALL_SITE_MISSING_OWNER",
            Self::EmptyOperation(_) => "CALL_SITE_EMPTY_OPERATION",
            Self::EmptyArgument(_) => "CALL_SITE_EMPTY_ARGUMENT",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Immutable descriptor of a single call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSite {
    /// Fully qualified owner type (e.g. `"demo.dao.AccountDao"`).
    pub owner: String,
    /// Operation name (e.g. `"findAccounts"`).
    pub operation: String,
    /// Ordered argument type tags.
    pub arg_types: Vec<TypeTag>,
}

impl CallSite {
    /// Creates a call site with no arguments.
    #[must_use]
    pub fn new(owner: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            operation: operation.into(),
            arg_types: Vec::new(),
        }
    }

    /// Sets the argument type tags.
    #[must_use]
    pub fn with_args<I, T>(mut self, arg_types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeTag>,
    {
        self.arg_types = arg_types.into_iter().map(Into::into).collect();
        self
    }

    /// Parses the textual form `owner.operation(T1, T2)`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseCallSiteError`] if the text is not a well-formed call site.
    pub fn parse(text: &str) -> Result<Self, ParseCallSiteError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ParseCallSiteError::Empty);
        }

        let (head, args) = split_signature(text)
            .ok_or_else(|| ParseCallSiteError::MissingArguments(text.to_string()))?;

        let dot = head
            .rfind('.')
            .ok_or_else(|| ParseCallSiteError::MissingOwner(text.to_string()))?;
        let owner = head[..dot].trim();
        let operation = head[dot + 1..].trim();
        if owner.is_empty() {
            return Err(ParseCallSiteError::MissingOwner(text.to_string()));
        }
        if operation.is_empty() {
            return Err(ParseCallSiteError::EmptyOperation(text.to_string()));
        }

        let mut arg_types = Vec::new();
        if !args.trim().is_empty() {
            for arg in split_arguments(args) {
                if arg.is_empty() {
                    return Err(ParseCallSiteError::EmptyArgument(text.to_string()));
                }
                arg_types.push(TypeTag::new(arg));
            }
        }

        Ok(Self {
            owner: owner.to_string(),
            operation: operation.to_string(),
            arg_types,
        })
    }

    /// Returns the number of positional arguments.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arg_types.len()
    }

    /// Returns the last `.`-separated segment of the owner type.
    #[must_use]
    pub fn owner_short(&self) -> &str {
        self.owner.rsplit('.').next().unwrap_or(&self.owner)
    }

    /// Short form used in trace lines: `AccountDao.findAccounts(..)`.
    #[must_use]
    pub fn short_signature(&self) -> String {
        let args = if self.arg_types.is_empty() { "" } else { ".." };
        format!("{}.{}({args})", self.owner_short(), self.operation)
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.owner, self.operation)?;
        for (i, arg) in self.arg_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

impl FromStr for CallSite {
    type Err = ParseCallSiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Splits `name(args)` into `("name", "args")`.
///
/// The argument list is the text between the first `(` and the final `)`.
/// Returns `None` when the parentheses are missing.
#[must_use]
pub fn split_signature(text: &str) -> Option<(&str, &str)> {
    let open = text.find('(')?;
    let inner = text[open + 1..].strip_suffix(')')?;
    Some((&text[..open], inner))
}

/// Splits a comma-separated argument list at top level.
///
/// Commas nested inside `<...>`, `(...)` or `[...]` (generic or tuple
/// types) do not split. Each piece is trimmed.
#[must_use]
pub fn split_arguments(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in args.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(args[start..].trim());
    parts
}
