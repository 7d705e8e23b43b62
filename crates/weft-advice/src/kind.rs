//! Advice kinds.
//!
//! Each kind has its own control-flow contract inside the interception
//! chain. Kinds are "pre" (Before, Around), or "post" (After,
//! AfterReturning, AfterThrowing).

use crate::AdviceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five advice kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceKind {
    /// Runs before the wrapped call; a failure aborts it.
    Before,
    /// Runs after the wrapped call whatever its outcome; cannot alter it.
    After,
    /// Runs after a successful wrapped call; may replace the value.
    AfterReturning,
    /// Runs after a failed wrapped call; observes (and optionally translates) the failure.
    AfterThrowing,
    /// Wraps the call and decides whether and how often to proceed.
    Around,
}

impl AdviceKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Before,
        Self::After,
        Self::AfterReturning,
        Self::AfterThrowing,
        Self::Around,
    ];

    /// Rank used to order advices with equal `order`.
    ///
    /// Lower ranks sit further out in the chain:
    /// Around < Before < AfterReturning = AfterThrowing < After.
    #[must_use]
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Around => 0,
            Self::Before => 1,
            Self::AfterReturning | Self::AfterThrowing => 2,
            Self::After => 3,
        }
    }

    /// Returns `true` for kinds that run once the wrapped call has completed.
    #[must_use]
    pub fn is_post(&self) -> bool {
        matches!(
            self,
            Self::After | Self::AfterReturning | Self::AfterThrowing
        )
    }

    /// Returns the canonical string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
            Self::AfterReturning => "after_returning",
            Self::AfterThrowing => "after_throwing",
            Self::Around => "around",
        }
    }
}

impl FromStr for AdviceKind {
    type Err = AdviceError;

    /// Accepts the canonical snake_case form and its kebab-case spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            "after_returning" => Ok(Self::AfterReturning),
            "after_throwing" => Ok(Self::AfterThrowing),
            "around" => Ok(Self::Around),
            _ => Err(AdviceError::UnknownAdviceKind(s.to_string())),
        }
    }
}

impl fmt::Display for AdviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_roundtrip_all() {
        for kind in AdviceKind::ALL {
            let parsed: AdviceKind = kind
                .to_string()
                .parse()
                .unwrap_or_else(|e| panic!("failed to parse '{kind}': {e}"));
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn from_str_kebab_case() {
        assert_eq!(
            "after-returning".parse::<AdviceKind>().ok(),
            Some(AdviceKind::AfterReturning)
        );
    }

    #[test]
    fn from_str_unknown() {
        let err = "during"
            .parse::<AdviceKind>()
            .expect_err("unknown kind should be rejected");
        assert!(matches!(err, AdviceError::UnknownAdviceKind(_)));
    }

    #[test]
    fn precedence_order() {
        use AdviceKind::*;
        assert!(Around.precedence() < Before.precedence());
        assert!(Before.precedence() < AfterReturning.precedence());
        assert_eq!(AfterReturning.precedence(), AfterThrowing.precedence());
        assert!(AfterThrowing.precedence() < After.precedence());
    }

    #[test]
    fn post_kinds() {
        let post: Vec<_> = AdviceKind::ALL.iter().filter(|k| k.is_post()).collect();
        assert_eq!(post.len(), 3);
        assert!(!AdviceKind::Around.is_post());
        assert!(!AdviceKind::Before.is_post());
    }

    #[test]
    fn serde_snake_case() {
        let json = serde_json::to_string(&AdviceKind::AfterThrowing)
            .expect("AdviceKind should serialize to JSON");
        assert_eq!(json, "\"after_throwing\"");
    }
}
