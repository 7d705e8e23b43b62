//! Advice handlers and bindings.
//!
//! Each [`AdviceKind`] has its own handler trait with the control-flow
//! contract of that kind. Every trait is implemented for plain closures
//! of the matching shape, so most advice is written inline:
//!
//! ```
//! use weft_advice::{AdviceBinding, PointcutRule};
//!
//! let rule = PointcutRule::parse("execution(* demo.dao.*.*(..))").unwrap();
//! let binding = AdviceBinding::before("audit", rule, |inv| {
//!     println!("calling {}", inv.call_site);
//!     Ok(())
//! })
//! .with_order(1);
//! assert_eq!(binding.order(), 1);
//! ```

use crate::{
    AdviceKind, Invocation, InvocationError, Outcome, Pointcut, PointcutRule, Proceeding,
    ThrowingAction,
};
use std::fmt;
use std::sync::Arc;
use weft_types::{CallSite, Fault, Value};

/// Default binding order. Lower orders sit further out in the chain.
pub const DEFAULT_ORDER: i32 = 100;

/// Runs before the wrapped call. A fault aborts the call.
pub trait BeforeAdvice: Send + Sync {
    /// Observes the invocation.
    ///
    /// # Errors
    ///
    /// A returned fault becomes the outcome of the call; the target and
    /// every inner advice are skipped.
    fn before(&self, invocation: &Invocation) -> Result<(), Fault>;
}

impl<F> BeforeAdvice for F
where
    F: Fn(&Invocation) -> Result<(), Fault> + Send + Sync,
{
    fn before(&self, invocation: &Invocation) -> Result<(), Fault> {
        self(invocation)
    }
}

/// Wraps the call and decides whether and how often to proceed.
pub trait AroundAdvice: Send + Sync {
    /// Produces the outcome of the wrapped call.
    fn around(&self, proceeding: &Proceeding<'_>) -> Outcome;
}

impl<F> AroundAdvice for F
where
    F: Fn(&Proceeding<'_>) -> Outcome + Send + Sync,
{
    fn around(&self, proceeding: &Proceeding<'_>) -> Outcome {
        self(proceeding)
    }
}

/// Runs after a successful wrapped call.
pub trait AfterReturningAdvice: Send + Sync {
    /// Observes the returned value.
    ///
    /// Returning `Ok(Some(v))` replaces the value seen by outer advice and
    /// the caller; `Ok(None)` keeps it. The value may also be mutated in
    /// place through interior mutability.
    ///
    /// # Errors
    ///
    /// A returned fault replaces the value with an advice failure.
    fn after_returning(&self, invocation: &Invocation, value: &Value)
        -> Result<Option<Value>, Fault>;
}

impl<F> AfterReturningAdvice for F
where
    F: Fn(&Invocation, &Value) -> Result<Option<Value>, Fault> + Send + Sync,
{
    fn after_returning(
        &self,
        invocation: &Invocation,
        value: &Value,
    ) -> Result<Option<Value>, Fault> {
        self(invocation, value)
    }
}

/// Runs after a failed wrapped call.
pub trait AfterThrowingAdvice: Send + Sync {
    /// Observes the failure and decides what happens to it.
    ///
    /// # Errors
    ///
    /// A returned fault replaces the failure with an advice failure.
    fn after_throwing(
        &self,
        invocation: &Invocation,
        error: &InvocationError,
    ) -> Result<ThrowingAction, Fault>;
}

impl<F> AfterThrowingAdvice for F
where
    F: Fn(&Invocation, &InvocationError) -> Result<ThrowingAction, Fault> + Send + Sync,
{
    fn after_throwing(
        &self,
        invocation: &Invocation,
        error: &InvocationError,
    ) -> Result<ThrowingAction, Fault> {
        self(invocation, error)
    }
}

/// Runs after the wrapped call whatever its outcome.
pub trait AfterAdvice: Send + Sync {
    /// Observes the outcome. Cannot change it.
    ///
    /// # Errors
    ///
    /// A returned fault replaces the outcome with an advice failure.
    fn after(&self, invocation: &Invocation, outcome: &Outcome) -> Result<(), Fault>;
}

impl<F> AfterAdvice for F
where
    F: Fn(&Invocation, &Outcome) -> Result<(), Fault> + Send + Sync,
{
    fn after(&self, invocation: &Invocation, outcome: &Outcome) -> Result<(), Fault> {
        self(invocation, outcome)
    }
}

/// A handler of any kind.
#[derive(Clone)]
pub enum Handler {
    /// See [`BeforeAdvice`].
    Before(Arc<dyn BeforeAdvice>),
    /// See [`AroundAdvice`].
    Around(Arc<dyn AroundAdvice>),
    /// See [`AfterReturningAdvice`].
    AfterReturning(Arc<dyn AfterReturningAdvice>),
    /// See [`AfterThrowingAdvice`].
    AfterThrowing(Arc<dyn AfterThrowingAdvice>),
    /// See [`AfterAdvice`].
    After(Arc<dyn AfterAdvice>),
}

impl Handler {
    /// The kind this handler implements.
    #[must_use]
    pub fn kind(&self) -> AdviceKind {
        match self {
            Self::Before(_) => AdviceKind::Before,
            Self::Around(_) => AdviceKind::Around,
            Self::AfterReturning(_) => AdviceKind::AfterReturning,
            Self::AfterThrowing(_) => AdviceKind::AfterThrowing,
            Self::After(_) => AdviceKind::After,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler::{:?}", self.kind())
    }
}

/// An advice waiting to be registered: kind, rule, order and handler.
#[derive(Debug, Clone)]
pub struct AdviceBinding {
    id: String,
    rule: PointcutRule,
    order: i32,
    handler: Handler,
    recoverable: bool,
}

impl AdviceBinding {
    /// Creates a binding from an already built handler.
    ///
    /// An empty `id` is replaced by `<kind>-<n>` at registration.
    #[must_use]
    pub fn new(id: impl Into<String>, rule: PointcutRule, handler: Handler) -> Self {
        Self {
            id: id.into(),
            rule,
            order: DEFAULT_ORDER,
            handler,
            recoverable: false,
        }
    }

    /// Before advice from a closure.
    #[must_use]
    pub fn before<F>(id: impl Into<String>, rule: PointcutRule, f: F) -> Self
    where
        F: Fn(&Invocation) -> Result<(), Fault> + Send + Sync + 'static,
    {
        Self::new(id, rule, Handler::Before(Arc::new(f)))
    }

    /// Around advice from a closure.
    #[must_use]
    pub fn around<F>(id: impl Into<String>, rule: PointcutRule, f: F) -> Self
    where
        F: Fn(&Proceeding<'_>) -> Outcome + Send + Sync + 'static,
    {
        Self::new(id, rule, Handler::Around(Arc::new(f)))
    }

    /// AfterReturning advice from a closure.
    #[must_use]
    pub fn after_returning<F>(id: impl Into<String>, rule: PointcutRule, f: F) -> Self
    where
        F: Fn(&Invocation, &Value) -> Result<Option<Value>, Fault> + Send + Sync + 'static,
    {
        Self::new(id, rule, Handler::AfterReturning(Arc::new(f)))
    }

    /// AfterThrowing advice from a closure.
    #[must_use]
    pub fn after_throwing<F>(id: impl Into<String>, rule: PointcutRule, f: F) -> Self
    where
        F: Fn(&Invocation, &InvocationError) -> Result<ThrowingAction, Fault>
            + Send
            + Sync
            + 'static,
    {
        Self::new(id, rule, Handler::AfterThrowing(Arc::new(f)))
    }

    /// After advice from a closure.
    #[must_use]
    pub fn after<F>(id: impl Into<String>, rule: PointcutRule, f: F) -> Self
    where
        F: Fn(&Invocation, &Outcome) -> Result<(), Fault> + Send + Sync + 'static,
    {
        Self::new(id, rule, Handler::After(Arc::new(f)))
    }

    /// Sets the order (default [`DEFAULT_ORDER`]).
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Lets an AfterThrowing handler replace or recover the failures it sees.
    #[must_use]
    pub fn recoverable(mut self) -> Self {
        self.recoverable = true;
        self
    }

    /// Binding ID (may be empty before registration).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Advice kind.
    #[must_use]
    pub fn kind(&self) -> AdviceKind {
        self.handler.kind()
    }

    /// Unresolved rule.
    #[must_use]
    pub fn rule(&self) -> &PointcutRule {
        &self.rule
    }

    /// Order.
    #[must_use]
    pub fn order(&self) -> i32 {
        self.order
    }

    pub(crate) fn into_registered(
        self,
        id: String,
        pointcut: Pointcut,
        seq: usize,
    ) -> RegisteredAdvice {
        RegisteredAdvice {
            id,
            pointcut,
            order: self.order,
            handler: self.handler,
            recoverable: self.recoverable,
            seq,
        }
    }
}

/// A binding held by a sealed registry, with its pointcut resolved.
#[derive(Debug)]
pub struct RegisteredAdvice {
    id: String,
    pointcut: Pointcut,
    order: i32,
    pub(crate) handler: Handler,
    recoverable: bool,
    seq: usize,
}

impl RegisteredAdvice {
    /// Binding ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Advice kind.
    #[must_use]
    pub fn kind(&self) -> AdviceKind {
        self.handler.kind()
    }

    /// Resolved pointcut.
    #[must_use]
    pub fn pointcut(&self) -> &Pointcut {
        &self.pointcut
    }

    /// Order.
    #[must_use]
    pub fn order(&self) -> i32 {
        self.order
    }

    /// Whether an AfterThrowing handler may recover.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }

    /// Registration index.
    #[must_use]
    pub fn seq(&self) -> usize {
        self.seq
    }

    /// Returns `true` if this advice applies to `site`.
    #[must_use]
    pub fn applies_to(&self, site: &CallSite) -> bool {
        self.pointcut.matches(site)
    }

    /// Sort key: order, then kind precedence, then registration index.
    pub(crate) fn sort_key(&self) -> (i32, u8, usize) {
        (self.order, self.kind().precedence(), self.seq)
    }

    /// Wraps `fault` as a failure of this advice.
    pub(crate) fn failure(&self, call_site: &CallSite, fault: Fault) -> InvocationError {
        InvocationError::AdviceExecution {
            advice_id: self.id.clone(),
            kind: self.kind(),
            call_site: call_site.clone(),
            fault,
        }
    }
}

/// Test utilities for advice.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Shared, append-only record of what ran, in order.
    #[derive(Debug, Clone, Default)]
    pub struct Trace {
        entries: Arc<Mutex<Vec<String>>>,
    }

    impl Trace {
        /// Creates an empty trace.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Appends an entry.
        pub fn push(&self, entry: impl Into<String>) {
            self.entries.lock().push(entry.into());
        }

        /// Snapshot of all entries.
        #[must_use]
        pub fn entries(&self) -> Vec<String> {
            self.entries.lock().clone()
        }

        /// Number of entries.
        #[must_use]
        pub fn len(&self) -> usize {
            self.entries.lock().len()
        }

        /// Returns `true` if nothing was recorded.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.entries.lock().is_empty()
        }
    }

    /// Factories for bindings that record into a [`Trace`].
    ///
    /// Each recorded entry is the binding ID, optionally suffixed
    /// (`"<id>:before"` / `"<id>:after"` for Around advice).
    pub struct MockAdvice;

    fn rule(expr: &str) -> PointcutRule {
        PointcutRule::parse(expr).expect("valid pointcut for MockAdvice")
    }

    impl MockAdvice {
        /// Before advice that records its ID.
        pub fn before(id: &str, expr: &str, trace: &Trace) -> AdviceBinding {
            let (name, trace) = (id.to_string(), trace.clone());
            AdviceBinding::before(id, rule(expr), move |_| {
                trace.push(name.as_str());
                Ok(())
            })
        }

        /// Before advice that records its ID and then fails.
        pub fn failing_before(id: &str, expr: &str, trace: &Trace, fault: Fault) -> AdviceBinding {
            let (name, trace) = (id.to_string(), trace.clone());
            AdviceBinding::before(id, rule(expr), move |_| {
                trace.push(name.as_str());
                Err(fault.clone())
            })
        }

        /// Around advice that records before and after proceeding once.
        pub fn around(id: &str, expr: &str, trace: &Trace) -> AdviceBinding {
            let (name, trace) = (id.to_string(), trace.clone());
            AdviceBinding::around(id, rule(expr), move |p| {
                trace.push(format!("{name}:before"));
                let outcome = p.proceed();
                trace.push(format!("{name}:after"));
                outcome
            })
        }

        /// Around advice that never proceeds and returns `value`.
        pub fn short_circuit(id: &str, expr: &str, trace: &Trace, value: Value) -> AdviceBinding {
            let (name, trace) = (id.to_string(), trace.clone());
            AdviceBinding::around(id, rule(expr), move |_| {
                trace.push(name.as_str());
                Outcome::Returned(value.clone())
            })
        }

        /// AfterReturning advice that records its ID and keeps the value.
        pub fn after_returning(id: &str, expr: &str, trace: &Trace) -> AdviceBinding {
            let (name, trace) = (id.to_string(), trace.clone());
            AdviceBinding::after_returning(id, rule(expr), move |_, _| {
                trace.push(name.as_str());
                Ok(None)
            })
        }

        /// AfterReturning advice that replaces the value.
        pub fn replacer(id: &str, expr: &str, trace: &Trace, value: Value) -> AdviceBinding {
            let (name, trace) = (id.to_string(), trace.clone());
            AdviceBinding::after_returning(id, rule(expr), move |_, _| {
                trace.push(name.as_str());
                Ok(Some(value.clone()))
            })
        }

        /// AfterThrowing advice that records its ID and rethrows.
        pub fn after_throwing(id: &str, expr: &str, trace: &Trace) -> AdviceBinding {
            let (name, trace) = (id.to_string(), trace.clone());
            AdviceBinding::after_throwing(id, rule(expr), move |_, _| {
                trace.push(name.as_str());
                Ok(ThrowingAction::Rethrow)
            })
        }

        /// AfterThrowing advice that asks to raise `fault` instead.
        ///
        /// Only honored if the binding is marked
        /// [`recoverable`](AdviceBinding::recoverable).
        pub fn translator(id: &str, expr: &str, trace: &Trace, fault: Fault) -> AdviceBinding {
            let (name, trace) = (id.to_string(), trace.clone());
            AdviceBinding::after_throwing(id, rule(expr), move |_, _| {
                trace.push(name.as_str());
                Ok(ThrowingAction::Replace(fault.clone()))
            })
        }

        /// AfterThrowing advice that fails while handling the failure.
        pub fn failing_after_throwing(
            id: &str,
            expr: &str,
            trace: &Trace,
            fault: Fault,
        ) -> AdviceBinding {
            let (name, trace) = (id.to_string(), trace.clone());
            AdviceBinding::after_throwing(id, rule(expr), move |_, _| {
                trace.push(name.as_str());
                Err(fault.clone())
            })
        }

        /// AfterThrowing advice that asks to recover with `value`.
        ///
        /// The request is only honored if the binding is also marked
        /// [`recoverable`](AdviceBinding::recoverable).
        pub fn recoverer(id: &str, expr: &str, trace: &Trace, value: Value) -> AdviceBinding {
            let (name, trace) = (id.to_string(), trace.clone());
            AdviceBinding::after_throwing(id, rule(expr), move |_, _| {
                trace.push(name.as_str());
                Ok(ThrowingAction::Recover(value.clone()))
            })
        }

        /// After advice that records its ID.
        pub fn after(id: &str, expr: &str, trace: &Trace) -> AdviceBinding {
            let (name, trace) = (id.to_string(), trace.clone());
            AdviceBinding::after(id, rule(expr), move |_, _| {
                trace.push(name.as_str());
                Ok(())
            })
        }

        /// After advice that records its ID and then fails.
        pub fn failing_after(id: &str, expr: &str, trace: &Trace, fault: Fault) -> AdviceBinding {
            let (name, trace) = (id.to_string(), trace.clone());
            AdviceBinding::after(id, rule(expr), move |_, _| {
                trace.push(name.as_str());
                Err(fault.clone())
            })
        }
    }

    /// Operation that counts its calls and returns a fixed value.
    #[derive(Debug, Clone, Default)]
    pub struct CountingTarget {
        calls: Arc<AtomicUsize>,
    }

    impl CountingTarget {
        /// Creates a target with zero calls.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Records a call.
        pub fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }

        /// Number of recorded calls.
        #[must_use]
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }
}
