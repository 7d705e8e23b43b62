//! Advice registry: build once, seal, then resolve concurrently.
//!
//! Registration and resolution are separated by type:
//!
//! ```text
//! RegistryBuilder ──seal()──► AdviceRegistry
//!  define_pointcut              resolve(call_site)
//!  register                     bindings / pointcut / len
//!  (&mut self)                  (&self, Send + Sync, shared via Arc)
//! ```
//!
//! A sealed registry has no way to add bindings, so resolution never
//! interleaves with registration.

use crate::advice::RegisteredAdvice;
use crate::{AdviceBinding, AdviceError, Pointcut, PointcutCatalog, PointcutRule};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use weft_types::CallSite;

/// Mutable registry under construction.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    catalog: PointcutCatalog,
    advices: Vec<RegisteredAdvice>,
    ids: HashSet<String>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a named pointcut that later rules and bindings may reference.
    ///
    /// # Errors
    ///
    /// See [`PointcutCatalog::define`].
    pub fn define_pointcut(&mut self, name: &str, rule: &PointcutRule) -> Result<(), AdviceError> {
        self.catalog.define(name, rule)?;
        debug!(pointcut = name, %rule, "defined pointcut");
        Ok(())
    }

    /// Parses `expr` and defines it under `name`.
    ///
    /// # Errors
    ///
    /// [`AdviceError::InvalidPointcut`] on a syntax error, otherwise see
    /// [`PointcutCatalog::define`].
    pub fn define_pointcut_expr(&mut self, name: &str, expr: &str) -> Result<(), AdviceError> {
        let rule = PointcutRule::parse(expr)?;
        self.define_pointcut(name, &rule)
    }

    /// Registers a binding. Returns its ID.
    ///
    /// Named references in the binding's rule are resolved now. A binding
    /// with an empty ID is assigned `<kind>-<n>`, where `n` is its
    /// registration index.
    ///
    /// # Errors
    ///
    /// - [`AdviceError::UnresolvedRule`] if the rule references an unknown name
    /// - [`AdviceError::DuplicateAdvice`] if the ID is already taken
    pub fn register(&mut self, binding: AdviceBinding) -> Result<String, AdviceError> {
        let seq = self.advices.len();
        let id = if binding.id().is_empty() {
            format!("{}-{seq}", binding.kind())
        } else {
            binding.id().to_string()
        };
        if self.ids.contains(&id) {
            return Err(AdviceError::DuplicateAdvice(id));
        }

        let pointcut = self.catalog.resolve(binding.rule())?;
        debug!(
            advice = %id,
            kind = %binding.kind(),
            order = binding.order(),
            %pointcut,
            "registered advice"
        );

        self.ids.insert(id.clone());
        self.advices
            .push(binding.into_registered(id.clone(), pointcut, seq));
        Ok(id)
    }

    /// Number of registered bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.advices.len()
    }

    /// Returns `true` if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.advices.is_empty()
    }

    /// Freezes the registry.
    #[must_use]
    pub fn seal(self) -> AdviceRegistry {
        let mut advices: Vec<Arc<RegisteredAdvice>> =
            self.advices.into_iter().map(Arc::new).collect();
        advices.sort_by_key(|a| a.sort_key());
        debug!(
            advices = advices.len(),
            pointcuts = self.catalog.len(),
            "sealed advice registry"
        );
        AdviceRegistry {
            catalog: self.catalog,
            advices,
        }
    }
}

/// Immutable, thread-safe set of bindings.
///
/// Bindings are stored pre-sorted by (order, kind precedence,
/// registration index), so resolution is a filter that keeps that order.
#[derive(Debug, Default)]
pub struct AdviceRegistry {
    catalog: PointcutCatalog,
    advices: Vec<Arc<RegisteredAdvice>>,
}

impl AdviceRegistry {
    /// Starts a new builder.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// A registry without bindings.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bindings that apply to `site`, outermost first.
    #[must_use]
    pub fn resolve(&self, site: &CallSite) -> Vec<Arc<RegisteredAdvice>> {
        self.advices
            .iter()
            .filter(|a| a.applies_to(site))
            .cloned()
            .collect()
    }

    /// All bindings, in resolution order.
    #[must_use]
    pub fn bindings(&self) -> &[Arc<RegisteredAdvice>] {
        &self.advices
    }

    /// Looks up a binding by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<RegisteredAdvice>> {
        self.advices.iter().find(|a| a.id() == id)
    }

    /// Looks up a named pointcut.
    #[must_use]
    pub fn pointcut(&self, name: &str) -> Option<&Pointcut> {
        self.catalog.get(name)
    }

    /// Named pointcuts, in definition order.
    pub fn pointcut_names(&self) -> impl Iterator<Item = &str> {
        self.catalog.names()
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.advices.len()
    }

    /// Returns `true` if there are no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.advices.is_empty()
    }
}
