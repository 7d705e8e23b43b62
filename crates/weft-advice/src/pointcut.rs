//! Pointcut rules and their expression syntax.
//!
//! A pointcut selects the call sites an advice applies to:
//!
//! ```text
//! expr      := or
//! or        := and ( "||" and )*
//! and       := unary ( "&&" unary )*
//! unary     := "!" unary | primary
//! primary   := "(" expr ")" | "execution(" signature ")" | signature | name
//! signature := [ "*" ] owner_glob "." op_glob "(" args ")" | op_glob "(" args ")"
//! args      := "" | arg ( "," arg )*
//! arg       := ".." | type_glob
//! ```
//!
//! Examples:
//!
//! ```text
//! "execution(* demo.service.*.getFortune(..))"  → any owner in demo.service
//! "demo.dao.*.*(..)"                            → every operation of every DAO
//! "*.add*(Account, ..)"                         → first argument is an Account
//! "forDao && !(getter || setter)"               → composition of named rules
//! ```
//!
//! Rules are declarative: named references are resolved against a
//! [`PointcutCatalog`](crate::PointcutCatalog) before matching.

use crate::AdviceError;
use std::fmt;
use weft_types::{split_arguments, split_signature};

/// A single entry of an argument pattern list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgPattern {
    /// Exactly one argument whose type tag matches the glob (`*` = any type).
    Type(String),
    /// Any number of arguments, including zero (`..`).
    Rest,
}

impl fmt::Display for ArgPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(glob) => f.write_str(glob),
            Self::Rest => f.write_str(".."),
        }
    }
}

/// Structural pattern over owner, operation and argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePattern {
    /// Owner type glob (`*` = any sequence of characters).
    pub owner: String,
    /// Operation name glob.
    pub operation: String,
    /// Argument patterns, matched positionally.
    pub args: Vec<ArgPattern>,
}

impl SignaturePattern {
    /// Creates a pattern.
    #[must_use]
    pub fn new(owner: impl Into<String>, operation: impl Into<String>, args: Vec<ArgPattern>) -> Self {
        Self {
            owner: owner.into(),
            operation: operation.into(),
            args,
        }
    }

    /// Parses `[* ]owner.operation(args)` or `operation(args)`.
    ///
    /// # Errors
    ///
    /// Returns [`AdviceError::InvalidPointcut`] on malformed input.
    pub fn parse(text: &str) -> Result<Self, AdviceError> {
        let invalid = |reason: &str| AdviceError::invalid_pointcut(text, reason);
        let trimmed = text.trim();

        let (head, args) =
            split_signature(trimmed).ok_or_else(|| invalid("missing argument list '(...)'"))?;

        let mut words = head.split_whitespace();
        let name = match (words.next(), words.next(), words.next()) {
            (Some(name), None, None) => name,
            (Some("*"), Some(name), None) => name,
            (Some(_), Some(_), None) => {
                return Err(invalid("only '*' is supported as a return type pattern"))
            }
            _ => return Err(invalid("expected 'owner.operation(...)'")),
        };

        let (owner, operation) = match name.rfind('.') {
            Some(dot) => (&name[..dot], &name[dot + 1..]),
            None => ("*", name),
        };
        if owner.is_empty() {
            return Err(invalid("empty owner pattern"));
        }
        if operation.is_empty() {
            return Err(invalid("empty operation pattern"));
        }

        let mut patterns = Vec::new();
        if !args.trim().is_empty() {
            for arg in split_arguments(args) {
                match arg {
                    "" => return Err(invalid("empty argument pattern")),
                    ".." => patterns.push(ArgPattern::Rest),
                    glob => patterns.push(ArgPattern::Type(glob.to_string())),
                }
            }
        }

        Ok(Self::new(owner, operation, patterns))
    }
}

impl fmt::Display for SignaturePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.owner, self.operation)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

/// A declarative pointcut rule.
///
/// Rules are pure and deterministic. `Reference` names are resolved
/// eagerly when the rule is registered, never at call time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointcutRule {
    /// Structural pattern.
    Signature(SignaturePattern),
    /// Reference to a named, previously defined rule.
    Reference(String),
    /// Every sub-rule must match.
    All(Vec<PointcutRule>),
    /// At least one sub-rule must match.
    Any(Vec<PointcutRule>),
    /// The sub-rule must not match.
    Not(Box<PointcutRule>),
}

impl PointcutRule {
    /// Parses a pointcut expression.
    ///
    /// # Errors
    ///
    /// Returns [`AdviceError::InvalidPointcut`] if the expression is malformed.
    pub fn parse(expr: &str) -> Result<Self, AdviceError> {
        let mut parser = Parser { src: expr, pos: 0 };
        parser.skip_ws();
        if parser.at_end() {
            return Err(AdviceError::invalid_pointcut(expr, "empty expression"));
        }
        let rule = parser.parse_or()?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(parser.error(&format!(
                "unexpected input '{}'",
                &parser.src[parser.pos..]
            )));
        }
        Ok(rule)
    }

    /// Structural rule.
    #[must_use]
    pub fn signature(pattern: SignaturePattern) -> Self {
        Self::Signature(pattern)
    }

    /// Reference to a named rule.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Reference(name.into())
    }

    /// `self && other`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::All(mut rules) => {
                rules.push(other);
                Self::All(rules)
            }
            rule => Self::All(vec![rule, other]),
        }
    }

    /// `self || other`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Any(mut rules) => {
                rules.push(other);
                Self::Any(rules)
            }
            rule => Self::Any(vec![rule, other]),
        }
    }

    /// `!self`.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Names referenced anywhere in this rule, in order of appearance.
    #[must_use]
    pub fn references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Signature(_) => {}
            Self::Reference(name) => out.push(name),
            Self::All(rules) | Self::Any(rules) => {
                for rule in rules {
                    rule.collect_references(out);
                }
            }
            Self::Not(rule) => rule.collect_references(out),
        }
    }

    fn is_atom(&self) -> bool {
        matches!(self, Self::Signature(_) | Self::Reference(_))
    }
}

impl fmt::Display for PointcutRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, rules: &[PointcutRule], op: &str) -> fmt::Result {
            for (i, rule) in rules.iter().enumerate() {
                if i > 0 {
                    write!(f, " {op} ")?;
                }
                if rule.is_atom() || matches!(rule, PointcutRule::Not(_)) {
                    write!(f, "{rule}")?;
                } else {
                    write!(f, "({rule})")?;
                }
            }
            Ok(())
        }

        match self {
            Self::Signature(pattern) => write!(f, "{pattern}"),
            Self::Reference(name) => f.write_str(name),
            Self::All(rules) => join(f, rules, "&&"),
            Self::Any(rules) => join(f, rules, "||"),
            Self::Not(rule) if rule.is_atom() => write!(f, "!{rule}"),
            Self::Not(rule) => write!(f, "!({rule})"),
        }
    }
}

/// Returns `true` if `name` is usable as a named pointcut.
#[must_use]
pub fn is_valid_rule_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '$'))
}

/// Recursive-descent parser over the expression grammar.
struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse_or(&mut self) -> Result<PointcutRule, AdviceError> {
        let mut rules = vec![self.parse_and()?];
        while self.eat("||") {
            rules.push(self.parse_and()?);
        }
        Ok(collapse(rules, PointcutRule::Any))
    }

    fn parse_and(&mut self) -> Result<PointcutRule, AdviceError> {
        let mut rules = vec![self.parse_unary()?];
        while self.eat("&&") {
            rules.push(self.parse_unary()?);
        }
        Ok(collapse(rules, PointcutRule::All))
    }

    fn parse_unary(&mut self) -> Result<PointcutRule, AdviceError> {
        if self.eat("!") {
            return Ok(self.parse_unary()?.negate());
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<PointcutRule, AdviceError> {
        if self.eat("(") {
            let rule = self.parse_or()?;
            if !self.eat(")") {
                return Err(self.error("expected ')'"));
            }
            return Ok(rule);
        }

        self.skip_ws();
        let start = self.pos;
        let head = self.take_head();
        if head.is_empty() {
            return Err(self.error("expected a signature or a rule name"));
        }

        if self.peek() != Some('(') {
            if !is_valid_rule_name(head) {
                return Err(self.error(&format!("'{head}' is not a valid rule name")));
            }
            return Ok(PointcutRule::named(head));
        }

        let args = self.take_parenthesized()?;
        if head == "execution" {
            return SignaturePattern::parse(args).map(PointcutRule::Signature);
        }
        let text = &self.src[start..self.pos];
        SignaturePattern::parse(text).map(PointcutRule::Signature)
    }

    /// Consumes the name part of a signature or reference, including an
    /// optional `* ` return-type prefix.
    fn take_head(&mut self) -> &'a str {
        let start = self.pos;
        let rest = &self.src[start..];

        if let Some(after_star) = rest.strip_prefix('*') {
            let trimmed = after_star.trim_start();
            let gap = after_star.len() - trimmed.len();
            if gap > 0 && trimmed.starts_with(is_head_char) {
                self.pos += 1 + gap;
            }
        }

        while let Some(c) = self.peek() {
            if is_head_char(c) {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        &self.src[start..self.pos]
    }

    /// Consumes a balanced `( ... )` group and returns its inner text.
    fn take_parenthesized(&mut self) -> Result<&'a str, AdviceError> {
        let open = self.pos;
        let mut depth = 0usize;
        for (offset, c) in self.src[open..].char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos = open + offset + 1;
                        return Ok(&self.src[open + 1..open + offset]);
                    }
                }
                _ => {}
            }
        }
        Err(self.error("unbalanced parentheses"))
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.src[self.pos..].starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        let rest = &self.src[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn error(&self, reason: &str) -> AdviceError {
        AdviceError::invalid_pointcut(self.src, reason)
    }
}

fn is_head_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '$' | '*' | '<' | '>' | ':')
}

fn collapse(mut rules: Vec<PointcutRule>, wrap: fn(Vec<PointcutRule>) -> PointcutRule) -> PointcutRule {
    if rules.len() == 1 {
        rules.remove(0)
    } else {
        wrap(rules)
    }
}
