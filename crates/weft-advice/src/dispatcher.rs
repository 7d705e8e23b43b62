//! Public entry point: resolve, build, run.

use crate::advice::RegisteredAdvice;
use crate::{AdviceRegistry, InterceptionChain, Invocation, InvocationError, Outcome};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};
use weft_types::{CallSite, Fault, Value};

/// A target operation.
///
/// Implemented for every `Fn(&[Value]) -> Result<Value, Fault>`.
pub trait Operation {
    /// Performs the operation.
    ///
    /// # Errors
    ///
    /// Any fault the operation raises; it reaches the caller as
    /// [`InvocationError::TargetOperation`] unless advice recovers it.
    fn call(&self, arguments: &[Value]) -> Result<Value, Fault>;
}

impl<F> Operation for F
where
    F: Fn(&[Value]) -> Result<Value, Fault>,
{
    fn call(&self, arguments: &[Value]) -> Result<Value, Fault> {
        self(arguments)
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Cache resolved advice per call site.
    pub cache_resolutions: bool,
    /// Upper bound on cached call sites. Once reached, sites not yet
    /// cached are resolved on every call.
    pub max_cached_call_sites: usize,
}

/// Default for [`DispatchConfig::max_cached_call_sites`].
pub const DEFAULT_MAX_CACHED_CALL_SITES: usize = 4096;

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            cache_resolutions: true,
            max_cached_call_sites: DEFAULT_MAX_CACHED_CALL_SITES,
        }
    }
}

type Resolved = Arc<[Arc<RegisteredAdvice>]>;

/// Runs operations through the advice that applies to them.
///
/// Cheap to share: wrap in an `Arc` and dispatch from any number of
/// threads. Re-entrant, so a target may dispatch further calls through
/// the same dispatcher.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use weft_advice::{AdviceBinding, AdviceRegistry, Dispatcher, PointcutRule};
/// use weft_types::{CallSite, Value};
///
/// let mut builder = AdviceRegistry::builder();
/// builder
///     .register(AdviceBinding::after_returning(
///         "double",
///         PointcutRule::parse("*.Calc.*(..)").unwrap(),
///         |_, v| Ok(v.get::<i32>().map(|n| Value::new(n * 2))),
///     ))
///     .unwrap();
/// let dispatcher = Dispatcher::new(Arc::new(builder.seal()));
///
/// let site = CallSite::new("demo.Calc", "answer");
/// let outcome = dispatcher.invoke(&site, |_| Ok(Value::new(21_i32)), Vec::new());
/// assert_eq!(outcome.value().and_then(|v| v.get::<i32>()), Some(42));
/// ```
pub struct Dispatcher {
    registry: Arc<AdviceRegistry>,
    config: DispatchConfig,
    cache: RwLock<HashMap<CallSite, Resolved>>,
}

impl Dispatcher {
    /// Creates a dispatcher with the default configuration.
    #[must_use]
    pub fn new(registry: Arc<AdviceRegistry>) -> Self {
        Self::with_config(registry, DispatchConfig::default())
    }

    /// Creates a dispatcher with an explicit configuration.
    #[must_use]
    pub fn with_config(registry: Arc<AdviceRegistry>, config: DispatchConfig) -> Self {
        Self {
            registry,
            config,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The sealed registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<AdviceRegistry> {
        &self.registry
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Advice applying to `site`, outermost first.
    #[must_use]
    pub fn resolve(&self, site: &CallSite) -> Arc<[Arc<RegisteredAdvice>]> {
        if !self.config.cache_resolutions {
            return self.registry.resolve(site).into();
        }
        if let Some(hit) = self.cache.read().get(site) {
            return Arc::clone(hit);
        }
        let resolved: Resolved = self.registry.resolve(site).into();
        let mut cache = self.cache.write();
        if cache.len() >= self.config.max_cached_call_sites && !cache.contains_key(site) {
            trace!(call_site = %site, "resolution cache full");
            return resolved;
        }
        Arc::clone(cache.entry(site.clone()).or_insert(resolved))
    }

    /// Runs `operation` with `arguments` through every matching advice.
    ///
    /// Target and advice failures are returned as [`Outcome::Raised`];
    /// this never panics on them.
    pub fn invoke<F>(&self, site: &CallSite, operation: F, arguments: Vec<Value>) -> Outcome
    where
        F: Fn(&[Value]) -> Result<Value, Fault>,
    {
        self.invoke_operation(site, &operation, arguments)
    }

    /// Like [`invoke`](Self::invoke), for an [`Operation`] trait object.
    pub fn invoke_operation(
        &self,
        site: &CallSite,
        operation: &dyn Operation,
        arguments: Vec<Value>,
    ) -> Outcome {
        let links = self.resolve(site);
        debug!(call_site = %site, advices = links.len(), "dispatching");
        let chain = InterceptionChain::build(links, operation);
        chain.run(&Invocation::new(site.clone(), arguments))
    }

    /// Like [`invoke`](Self::invoke), returning a `Result`.
    ///
    /// # Errors
    ///
    /// The failure of a raised outcome.
    pub fn call<F>(
        &self,
        site: &CallSite,
        operation: F,
        arguments: Vec<Value>,
    ) -> Result<Value, InvocationError>
    where
        F: Fn(&[Value]) -> Result<Value, Fault>,
    {
        self.invoke(site, operation, arguments).into_result()
    }

    /// Call sites with a cached resolution.
    #[must_use]
    pub fn cached_call_sites(&self) -> usize {
        self.cache.read().len()
    }
}
