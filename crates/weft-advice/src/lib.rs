//! Advice dispatch engine for weft.
//!
//! Wraps calls to target operations with pluggable behavior (timing,
//! logging, result mutation, failure observation) selected by declarative
//! pointcuts, without touching the operations themselves.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  weft-types  : CallSite, TypeTag, Value, Fault              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  weft-advice : Pointcut, Registry, Chain, Dispatcher ◄ HERE │
//! ├─────────────────────────────────────────────────────────────┤
//! │  weft-cli    : config loading, tracing setup, commands      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Data Flow
//!
//! ```text
//! caller ─► Dispatcher::invoke(call_site, operation, arguments)
//!             │
//!             ├─► AdviceRegistry::resolve(call_site)      (cached per call site)
//!             ├─► InterceptionChain::build(advices, operation)
//!             └─► chain.run(invocation) ─► Outcome ─► caller
//! ```
//!
//! # Core Concepts
//!
//! ## Pointcuts
//!
//! [`PointcutRule`] selects call sites by owner glob, operation glob and
//! argument patterns (`*` = one argument, `..` = any number). Rules
//! compose with `&&`, `||` and `!` and may reference named rules, which
//! are resolved into a [`Pointcut`] once, at registration.
//!
//! ## Advice Kinds
//!
//! [`AdviceKind`] has five members, each with its own handler trait:
//!
//! - `Before` ([`BeforeAdvice`]): a fault aborts the call
//! - `Around` ([`AroundAdvice`]): decides whether and how often to proceed
//! - `AfterReturning` ([`AfterReturningAdvice`]): may replace the value
//! - `AfterThrowing` ([`AfterThrowingAdvice`]): rethrow, or (opt-in) replace or recover
//! - `After` ([`AfterAdvice`]): observes every outcome
//!
//! ## Ordering
//!
//! Applicable advice is sorted by `order` (ascending), then kind
//! (Around, Before, AfterReturning = AfterThrowing, After), then
//! registration order. The first advice is the outermost wrapper.
//!
//! ## Registry
//!
//! [`RegistryBuilder`] collects pointcuts and bindings; [`seal`](RegistryBuilder::seal)
//! turns it into an immutable [`AdviceRegistry`] that can be shared
//! across threads.
//!
//! ## Configuration
//!
//! [`AdvicesConfig`] declares pointcuts and bindings to
//! [builtin handlers](builtin) in TOML.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use weft_advice::{AdviceBinding, AdviceRegistry, Dispatcher, PointcutRule};
//! use weft_types::{CallSite, Fault, Value};
//!
//! let mut builder = AdviceRegistry::builder();
//! builder
//!     .define_pointcut_expr("forDaoPackage", "execution(* demo.dao.*.*(..))")
//!     .unwrap();
//! builder
//!     .register(AdviceBinding::before(
//!         "reject-negative",
//!         PointcutRule::parse("forDaoPackage && *.*(i64)").unwrap(),
//!         |inv| match inv.arg::<i64>(0) {
//!             Some(n) if *n < 0 => Err(Fault::new("VALIDATION", "negative amount")),
//!             _ => Ok(()),
//!         },
//!     ))
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::new(Arc::new(builder.seal()));
//! let site = CallSite::new("demo.dao.AccountDao", "deposit").with_args(["i64"]);
//!
//! let ok = dispatcher.invoke(&site, |args| Ok(args[0].clone()), vec![Value::new(5_i64)]);
//! assert!(ok.is_returned());
//!
//! let rejected = dispatcher.invoke(&site, |args| Ok(args[0].clone()), vec![Value::new(-5_i64)]);
//! assert_eq!(rejected.error().unwrap().advice_id(), Some("reject-negative"));
//! ```

mod advice;
pub mod builtin;
mod chain;
mod config;
mod dispatcher;
mod error;
mod invocation;
mod kind;
mod matcher;
mod outcome;
mod pointcut;
mod registry;
mod sink;

pub use advice::{
    AdviceBinding, AfterAdvice, AfterReturningAdvice, AfterThrowingAdvice, AroundAdvice,
    BeforeAdvice, Handler, RegisteredAdvice, DEFAULT_ORDER,
};
pub use chain::InterceptionChain;
pub use config::{AdviceDef, AdviceDefValidationError, AdvicesConfig, PointcutDef};
pub use dispatcher::{DispatchConfig, Dispatcher, Operation, DEFAULT_MAX_CACHED_CALL_SITES};
pub use error::AdviceError;
pub use invocation::{Invocation, Proceeding};
pub use kind::AdviceKind;
pub use matcher::{glob_match, matches, Pointcut, PointcutCatalog};
pub use outcome::{InvocationError, Outcome, ThrowingAction};
pub use pointcut::{ArgPattern, PointcutRule, SignaturePattern};
pub use registry::{AdviceRegistry, RegistryBuilder};
pub use sink::{TraceLine, TraceSink, TracingSink};

// Re-export testing utilities
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    //! Test utilities for the advice engine.
    //!
    //! Provides [`MockAdvice`] binding factories, the shared [`Trace`]
    //! recorder, [`CountingTarget`] and [`CapturingSink`].
    pub use crate::advice::testing::{CountingTarget, MockAdvice, Trace};
    pub use crate::sink::testing::CapturingSink;
}
