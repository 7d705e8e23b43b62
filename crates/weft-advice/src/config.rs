//! Declarative advice definitions.
//!
//! TOML-serializable pointcuts and advice bindings that refer to the
//! [builtin handlers](crate::builtin). Loaded at startup and applied to a
//! [`RegistryBuilder`].
//!
//! # Example TOML
//!
//! ```toml
//! [[pointcuts]]
//! name = "forDaoPackage"
//! expr = "execution(* demo.dao.*.*(..))"
//!
//! [[advices]]
//! id = "time-fortune"
//! kind = "around"
//! pointcut = "*.TrafficFortuneService.getFortune(..)"
//! handler = "time"
//! order = 2
//!
//! [[advices]]
//! kind = "before"
//! pointcut = "forDaoPackage"
//! handler = "log-call"
//! ```

use crate::builtin::{builtin_handler, builtin_kind, deadline_limit};
use crate::sink::TraceSink;
use crate::{
    AdviceBinding, AdviceError, AdviceKind, AdviceRegistry, PointcutRule, RegistryBuilder,
    DEFAULT_ORDER,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Top-level advice configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdvicesConfig {
    /// Named pointcuts, defined in order.
    pub pointcuts: Vec<PointcutDef>,
    /// Advice bindings, registered in order.
    pub advices: Vec<AdviceDef>,
}

/// A named pointcut definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PointcutDef {
    /// Name other expressions refer to.
    pub name: String,
    /// Pointcut expression.
    pub expr: String,
}

/// A single declarative advice binding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdviceDef {
    /// Unique advice ID. Auto-generated as `<kind>-<n>` if not specified.
    pub id: Option<String>,

    /// Advice kind (`before`, `around`, `after_returning`, ...).
    pub kind: String,

    /// Pointcut expression or name of a defined pointcut.
    pub pointcut: String,

    /// Builtin handler name (`log-call`, `time`, ...).
    pub handler: String,

    /// Order (lower = further out). Default: 100.
    #[serde(default = "default_order")]
    pub order: i32,

    /// Whether the advice is registered. Default: true.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Allows AfterThrowing recovery.
    #[serde(default)]
    pub recoverable: bool,

    /// Limit for the `deadline` handler, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
}

fn default_order() -> i32 {
    DEFAULT_ORDER
}

fn default_enabled() -> bool {
    true
}

/// Errors from validating a definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdviceDefValidationError {
    /// Unknown `kind`.
    #[error("advice '{label}': {source}")]
    InvalidKind { label: String, source: AdviceError },

    /// Unknown `handler`, or a handler used with the wrong kind.
    #[error("advice '{label}': {source}")]
    InvalidHandler { label: String, source: AdviceError },

    /// Malformed `pointcut` expression.
    #[error("advice '{label}': {source}")]
    InvalidPointcut { label: String, source: AdviceError },

    /// Missing or out-of-range handler option.
    #[error("advice '{label}': {source}")]
    InvalidOption { label: String, source: AdviceError },

    /// Malformed named pointcut.
    #[error("pointcut '{label}': {source}")]
    InvalidPointcutDef { label: String, source: AdviceError },
}

impl PointcutDef {
    /// Checks the expression syntax.
    pub fn validate(&self) -> Result<PointcutRule, AdviceDefValidationError> {
        PointcutRule::parse(&self.expr).map_err(|e| AdviceDefValidationError::InvalidPointcutDef {
            label: self.name.clone(),
            source: e,
        })
    }
}

impl AdviceDef {
    /// Validates this definition.
    ///
    /// Checks:
    /// - `kind` is a known advice kind
    /// - `handler` is a builtin implementing that kind
    /// - `pointcut` parses (named references are checked when applied)
    /// - `deadline` has a positive `deadline_ms`
    pub fn validate(&self) -> Result<(), AdviceDefValidationError> {
        let label = self.id.as_deref().unwrap_or("<anonymous>").to_string();

        let kind = AdviceKind::from_str(&self.kind).map_err(|e| {
            AdviceDefValidationError::InvalidKind {
                label: label.clone(),
                source: e,
            }
        })?;

        check_handler(&self.handler, kind).map_err(|e| AdviceDefValidationError::InvalidHandler {
            label: label.clone(),
            source: e,
        })?;

        PointcutRule::parse(&self.pointcut).map_err(|e| {
            AdviceDefValidationError::InvalidPointcut {
                label: label.clone(),
                source: e,
            }
        })?;

        if self.handler == "deadline" {
            deadline_limit(self.deadline_ms)
                .map_err(|e| AdviceDefValidationError::InvalidOption { label, source: e })?;
        }

        Ok(())
    }
}

fn check_handler(handler: &str, kind: AdviceKind) -> Result<(), AdviceError> {
    match builtin_kind(handler) {
        None => Err(AdviceError::UnknownHandler(handler.to_string())),
        Some(expected) if expected != kind => Err(AdviceError::HandlerKindMismatch {
            handler: handler.to_string(),
            expected,
            found: kind,
        }),
        Some(_) => Ok(()),
    }
}

impl AdvicesConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the document is malformed.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Merges another config into this one.
    ///
    /// Pointcuts with the same name and advices with the same `id` are
    /// replaced; everything else (including anonymous advices) is appended.
    pub fn merge(&mut self, other: &Self) {
        for pointcut in &other.pointcuts {
            self.pointcuts.retain(|p| p.name != pointcut.name);
            self.pointcuts.push(pointcut.clone());
        }
        for advice in &other.advices {
            if let Some(id) = &advice.id {
                self.advices.retain(|a| a.id.as_deref() != Some(id));
            }
            self.advices.push(advice.clone());
        }
    }

    /// Validates every definition.
    ///
    /// Returns all validation errors (not just the first one).
    pub fn validate_all(&self) -> Vec<AdviceDefValidationError> {
        let pointcuts = self.pointcuts.iter().filter_map(|p| p.validate().err());
        let advices = self.advices.iter().filter_map(|a| a.validate().err());
        pointcuts.chain(advices).collect()
    }

    /// Defines every pointcut and registers every enabled advice.
    ///
    /// Returns the number of registered advices.
    ///
    /// # Errors
    ///
    /// The first [`AdviceError`] encountered. Named references must be
    /// defined earlier in `pointcuts`.
    pub fn apply(
        &self,
        builder: &mut RegistryBuilder,
        sink: &Arc<dyn TraceSink>,
    ) -> Result<usize, AdviceError> {
        for def in &self.pointcuts {
            builder.define_pointcut_expr(&def.name, &def.expr)?;
        }

        let mut registered = 0;
        for def in &self.advices {
            if !def.enabled {
                debug!(advice = ?def.id, handler = %def.handler, "skipping disabled advice");
                continue;
            }

            let kind = AdviceKind::from_str(&def.kind)?;
            check_handler(&def.handler, kind)?;
            let rule = PointcutRule::parse(&def.pointcut)?;
            let id = def
                .id
                .clone()
                .unwrap_or_else(|| format!("{kind}-{}", builder.len()));
            let handler = builtin_handler(&def.handler, &id, def.deadline_ms, Arc::clone(sink))?;

            let mut binding = AdviceBinding::new(id, rule, handler).with_order(def.order);
            if def.recoverable {
                binding = binding.recoverable();
            }
            builder.register(binding)?;
            registered += 1;
        }
        Ok(registered)
    }

    /// Builds and seals a registry from this config alone.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub fn build_registry(&self, sink: &Arc<dyn TraceSink>) -> Result<AdviceRegistry, AdviceError> {
        let mut builder = RegistryBuilder::new();
        self.apply(&mut builder, sink)?;
        Ok(builder.seal())
    }
}
