//! Invocations and the proceed capability handed to Around advice.

use crate::advice::RegisteredAdvice;
use crate::chain::InterceptionChain;
use crate::Outcome;
use std::any::Any;
use std::cell::Cell;
use weft_types::{CallSite, Fault, Value};

/// One call travelling through an interception chain.
///
/// Created fresh per dispatch and owned by the chain executing it.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Call site being intercepted.
    pub call_site: CallSite,
    /// Positional arguments.
    pub arguments: Vec<Value>,
}

impl Invocation {
    /// Creates an invocation.
    #[must_use]
    pub fn new(call_site: CallSite, arguments: Vec<Value>) -> Self {
        Self {
            call_site,
            arguments,
        }
    }

    /// Returns the argument at `index`.
    #[must_use]
    pub fn argument(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index)
    }

    /// Returns the argument at `index` if it is of type `T`.
    #[must_use]
    pub fn arg<T: Any>(&self, index: usize) -> Option<&T> {
        self.argument(index).and_then(Value::downcast_ref)
    }

    /// Number of arguments.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arguments.len()
    }

    /// Same call site, different arguments.
    #[must_use]
    pub fn with_arguments(&self, arguments: Vec<Value>) -> Self {
        Self {
            call_site: self.call_site.clone(),
            arguments,
        }
    }
}

/// Access to the rest of the chain from inside an Around advice.
///
/// Calling [`proceed`](Self::proceed) runs every inner advice and the
/// target, then returns their outcome. Not calling it short-circuits
/// the call; calling it several times re-runs the inner chain each time.
pub struct Proceeding<'a> {
    chain: &'a InterceptionChain<'a>,
    next: usize,
    invocation: &'a Invocation,
    link: &'a RegisteredAdvice,
    proceeded: Cell<usize>,
}

impl<'a> Proceeding<'a> {
    pub(crate) fn new(
        chain: &'a InterceptionChain<'a>,
        next: usize,
        invocation: &'a Invocation,
        link: &'a RegisteredAdvice,
    ) -> Self {
        Self {
            chain,
            next,
            invocation,
            link,
            proceeded: Cell::new(0),
        }
    }

    /// The intercepted invocation.
    #[must_use]
    pub fn invocation(&self) -> &Invocation {
        self.invocation
    }

    /// Shorthand for `invocation().call_site`.
    #[must_use]
    pub fn call_site(&self) -> &CallSite {
        &self.invocation.call_site
    }

    /// Shorthand for `invocation().arguments`.
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.invocation.arguments
    }

    /// ID of the Around binding holding this capability.
    #[must_use]
    pub fn advice_id(&self) -> &str {
        self.link.id()
    }

    /// Runs the inner chain with the original arguments.
    pub fn proceed(&self) -> Outcome {
        self.proceeded.set(self.proceeded.get() + 1);
        self.chain.run_from(self.next, self.invocation)
    }

    /// Runs the inner chain with substituted arguments.
    pub fn proceed_with(&self, arguments: Vec<Value>) -> Outcome {
        self.proceeded.set(self.proceeded.get() + 1);
        let substituted = self.invocation.with_arguments(arguments);
        self.chain.run_from(self.next, &substituted)
    }

    /// How many times this link has proceeded so far.
    #[must_use]
    pub fn proceed_count(&self) -> usize {
        self.proceeded.get()
    }

    /// Builds a failure attributed to this Around advice.
    #[must_use]
    pub fn raise(&self, fault: Fault) -> Outcome {
        Outcome::Raised(self.link.failure(&self.invocation.call_site, fault))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation() -> Invocation {
        Invocation::new(
            CallSite::new("demo.dao.AccountDao", "addAccount").with_args(["Account", "bool"]),
            vec![Value::new(String::from("Madhu")), Value::new(true)],
        )
    }

    #[test]
    fn typed_argument_access() {
        let inv = invocation();
        assert_eq!(inv.arity(), 2);
        assert_eq!(inv.arg::<String>(0).map(String::as_str), Some("Madhu"));
        assert_eq!(inv.arg::<bool>(1), Some(&true));
        assert!(inv.arg::<bool>(0).is_none());
        assert!(inv.argument(2).is_none());
    }

    #[test]
    fn with_arguments_keeps_call_site() {
        let inv = invocation();
        let swapped = inv.with_arguments(vec![Value::new(false)]);
        assert_eq!(swapped.call_site, inv.call_site);
        assert_eq!(swapped.arity(), 1);
        assert_eq!(inv.arity(), 2);
    }
}
