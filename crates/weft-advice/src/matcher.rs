//! Pointcut resolution and matching.
//!
//! [`PointcutRule`]s are declarative and may reference named rules.
//! A [`PointcutCatalog`] resolves those references once, producing a
//! [`Pointcut`] tree that carries the referenced rules inline. Matching a
//! resolved pointcut is a pure function: no lookups, no locks.

use crate::pointcut::is_valid_rule_name;
use crate::{AdviceError, ArgPattern, PointcutRule, SignaturePattern};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use weft_types::{CallSite, TypeTag};

/// A pointcut with every named reference resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pointcut {
    /// Structural pattern.
    Signature(SignaturePattern),
    /// A named rule, kept for display.
    Named {
        /// Name the rule was defined under.
        name: String,
        /// The resolved rule.
        rule: Arc<Pointcut>,
    },
    /// Every sub-pointcut matches.
    All(Vec<Pointcut>),
    /// At least one sub-pointcut matches.
    Any(Vec<Pointcut>),
    /// The sub-pointcut does not match.
    Not(Box<Pointcut>),
}

impl Pointcut {
    /// Returns `true` if this pointcut selects `site`.
    #[must_use]
    pub fn matches(&self, site: &CallSite) -> bool {
        match self {
            Self::Signature(pattern) => signature_matches(pattern, site),
            Self::Named { rule, .. } => rule.matches(site),
            Self::All(rules) => rules.iter().all(|r| r.matches(site)),
            Self::Any(rules) => rules.iter().any(|r| r.matches(site)),
            Self::Not(rule) => !rule.matches(site),
        }
    }
}

impl fmt::Display for Pointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, rules: &[Pointcut], op: &str) -> fmt::Result {
            for (i, rule) in rules.iter().enumerate() {
                if i > 0 {
                    write!(f, " {op} ")?;
                }
                match rule {
                    Pointcut::All(_) | Pointcut::Any(_) => write!(f, "({rule})")?,
                    _ => write!(f, "{rule}")?,
                }
            }
            Ok(())
        }

        match self {
            Self::Signature(pattern) => write!(f, "{pattern}"),
            Self::Named { name, .. } => f.write_str(name),
            Self::All(rules) => join(f, rules, "&&"),
            Self::Any(rules) => join(f, rules, "||"),
            Self::Not(rule) => match **rule {
                Self::All(_) | Self::Any(_) => write!(f, "!({rule})"),
                _ => write!(f, "!{rule}"),
            },
        }
    }
}

/// Evaluates `pointcut` against `site`.
#[must_use]
pub fn matches(pointcut: &Pointcut, site: &CallSite) -> bool {
    pointcut.matches(site)
}

/// Named, resolved pointcuts.
///
/// Definitions are append-only: a rule may only reference names defined
/// before it, so reference cycles cannot be expressed.
#[derive(Debug, Clone, Default)]
pub struct PointcutCatalog {
    rules: HashMap<String, Arc<Pointcut>>,
    order: Vec<String>,
}

impl PointcutCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a named rule.
    ///
    /// # Errors
    ///
    /// - [`AdviceError::InvalidPointcut`] if `name` is not a valid rule name
    /// - [`AdviceError::DuplicatePointcut`] if `name` is already defined
    /// - [`AdviceError::UnresolvedRule`] if `rule` references an unknown name
    pub fn define(&mut self, name: &str, rule: &PointcutRule) -> Result<(), AdviceError> {
        if !is_valid_rule_name(name) {
            return Err(AdviceError::invalid_pointcut(
                name,
                "pointcut names may only contain letters, digits, '_', '-', '.' and '$'",
            ));
        }
        if self.rules.contains_key(name) {
            return Err(AdviceError::DuplicatePointcut(name.to_string()));
        }
        let resolved = self.resolve(rule)?;
        self.rules.insert(name.to_string(), Arc::new(resolved));
        self.order.push(name.to_string());
        Ok(())
    }

    /// Resolves every reference in `rule`.
    ///
    /// # Errors
    ///
    /// Returns [`AdviceError::UnresolvedRule`] naming the first unknown reference.
    pub fn resolve(&self, rule: &PointcutRule) -> Result<Pointcut, AdviceError> {
        Ok(match rule {
            PointcutRule::Signature(pattern) => Pointcut::Signature(pattern.clone()),
            PointcutRule::Reference(name) => Pointcut::Named {
                name: name.clone(),
                rule: self
                    .rules
                    .get(name)
                    .cloned()
                    .ok_or_else(|| AdviceError::unresolved(name))?,
            },
            PointcutRule::All(rules) => Pointcut::All(self.resolve_each(rules)?),
            PointcutRule::Any(rules) => Pointcut::Any(self.resolve_each(rules)?),
            PointcutRule::Not(inner) => Pointcut::Not(Box::new(self.resolve(inner)?)),
        })
    }

    fn resolve_each(&self, rules: &[PointcutRule]) -> Result<Vec<Pointcut>, AdviceError> {
        rules.iter().map(|r| self.resolve(r)).collect()
    }

    /// Returns the resolved rule defined under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Pointcut> {
        self.rules.get(name).map(AsRef::as_ref)
    }

    /// Defined names, in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of defined rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no rule has been defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn signature_matches(pattern: &SignaturePattern, site: &CallSite) -> bool {
    glob_match(&pattern.owner, &site.owner)
        && glob_match(&pattern.operation, &site.operation)
        && args_match(&pattern.args, &site.arg_types)
}

/// Positional argument matching. `..` absorbs zero or more arguments.
fn args_match(patterns: &[ArgPattern], args: &[TypeTag]) -> bool {
    match patterns.split_first() {
        None => args.is_empty(),
        Some((ArgPattern::Rest, rest)) => {
            (0..=args.len()).any(|skip| args_match(rest, &args[skip..]))
        }
        Some((ArgPattern::Type(glob), rest)) => match args.split_first() {
            Some((arg, tail)) => glob_match(glob, arg.as_str()) && args_match(rest, tail),
            None => false,
        },
    }
}

/// Glob match where `*` matches any (possibly empty) sequence of characters.
///
/// Iterative with single-star backtracking, so runtime stays linear in
/// practice even for patterns like `*a*b*c`.
#[must_use]
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p = pattern.as_bytes();
    let t = text.as_bytes();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while ti < t.len() {
        if pi < p.len() && p[pi] == b'*' {
            star = Some(pi);
            pi += 1;
            mark = ti;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == b'*')
}
