//! Interception chain execution.
//!
//! Links nest outermost → innermost in resolved order; the innermost
//! position calls the target:
//!
//! ```text
//! link[0] ─► link[1] ─► ... ─► link[n-1] ─► target
//!    ◄──────────── outcome flows back out ◄────┘
//! ```
//!
//! Per-kind contract of a link at position `i`:
//!
//! | Kind           | Before inner chain        | After inner chain                        |
//! |----------------|---------------------------|------------------------------------------|
//! | Before         | run handler; fault aborts | pass outcome through                     |
//! | Around         | handler owns `proceed()`  | handler's return value is the outcome    |
//! | AfterReturning | none                      | on value: observe, maybe replace         |
//! | AfterThrowing  | none                      | on failure: rethrow / replace / recover  |
//! | After          | none                      | always observe                           |
//!
//! A fault from a post-phase handler (After, AfterReturning,
//! AfterThrowing) skips every remaining post-phase handler further out.
//! Around links still see it through `proceed()`.

use crate::advice::{Handler, RegisteredAdvice};
use crate::{
    AfterThrowingAdvice, Invocation, InvocationError, Operation, Outcome, Proceeding,
    ThrowingAction,
};
use std::sync::Arc;
use tracing::{trace, warn};

/// An ordered chain of advice around one target.
pub struct InterceptionChain<'a> {
    links: Arc<[Arc<RegisteredAdvice>]>,
    target: &'a dyn Operation,
}

impl<'a> InterceptionChain<'a> {
    /// Builds a chain from resolved advices (outermost first) and a target.
    #[must_use]
    pub fn build(links: Arc<[Arc<RegisteredAdvice>]>, target: &'a dyn Operation) -> Self {
        Self { links, target }
    }

    /// Number of advice links.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns `true` if the chain only calls the target.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Runs the whole chain.
    pub fn run(&self, invocation: &Invocation) -> Outcome {
        self.run_from(0, invocation)
    }

    pub(crate) fn run_from(&self, index: usize, invocation: &Invocation) -> Outcome {
        let Some(link) = self.links.get(index) else {
            return self.call_target(invocation);
        };
        trace!(advice = link.id(), kind = %link.kind(), index, "entering advice");

        match &link.handler {
            Handler::Before(handler) => match handler.before(invocation) {
                Ok(()) => self.run_from(index + 1, invocation),
                Err(fault) => Outcome::Raised(link.failure(&invocation.call_site, fault)),
            },

            Handler::Around(handler) => {
                let proceeding = Proceeding::new(self, index + 1, invocation, link);
                handler.around(&proceeding)
            }

            Handler::AfterReturning(handler) => match self.run_from(index + 1, invocation) {
                Outcome::Returned(value) => match handler.after_returning(invocation, &value) {
                    Ok(Some(replacement)) => Outcome::Returned(replacement),
                    Ok(None) => Outcome::Returned(value),
                    Err(fault) => Outcome::Raised(link.failure(&invocation.call_site, fault)),
                },
                raised => raised,
            },

            Handler::AfterThrowing(handler) => match self.run_from(index + 1, invocation) {
                Outcome::Raised(error) if !error.aborts_post_phase() => {
                    self.after_throwing(link, handler.as_ref(), invocation, error)
                }
                outcome => outcome,
            },

            Handler::After(handler) => {
                let outcome = self.run_from(index + 1, invocation);
                if matches!(&outcome, Outcome::Raised(e) if e.aborts_post_phase()) {
                    return outcome;
                }
                match handler.after(invocation, &outcome) {
                    Ok(()) => outcome,
                    Err(fault) => Outcome::Raised(link.failure(&invocation.call_site, fault)),
                }
            }
        }
    }

    fn after_throwing(
        &self,
        link: &RegisteredAdvice,
        handler: &dyn AfterThrowingAdvice,
        invocation: &Invocation,
        error: InvocationError,
    ) -> Outcome {
        match handler.after_throwing(invocation, &error) {
            Ok(ThrowingAction::Rethrow) => Outcome::Raised(error),
            Ok(ThrowingAction::Replace(fault)) if link.is_recoverable() => {
                trace!(advice = link.id(), code = %fault.code, "failure replaced");
                Outcome::Raised(link.failure(&invocation.call_site, fault))
            }
            Ok(ThrowingAction::Recover(value)) if link.is_recoverable() => {
                trace!(advice = link.id(), "failure recovered");
                Outcome::Returned(value)
            }
            Ok(action) => {
                warn!(
                    advice = link.id(),
                    call_site = %invocation.call_site,
                    ?action,
                    "advice not registered as recoverable; rethrowing"
                );
                Outcome::Raised(error)
            }
            Err(fault) => Outcome::Raised(link.failure(&invocation.call_site, fault)),
        }
    }

    fn call_target(&self, invocation: &Invocation) -> Outcome {
        match self.target.call(&invocation.arguments) {
            Ok(value) => Outcome::Returned(value),
            Err(fault) => Outcome::Raised(InvocationError::target(
                invocation.call_site.clone(),
                fault,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingTarget, MockAdvice, Trace};
    use crate::{AdviceBinding, AdviceKind, AdviceRegistry, PointcutRule};
    use weft_types::{CallSite, Fault, Value};

    const ANY: &str = "*.*(..)";

    fn site() -> CallSite {
        CallSite::new("demo.dao.AccountDao", "findAccounts").with_args(["bool"])
    }

    fn any() -> PointcutRule {
        PointcutRule::parse(ANY).expect("catch-all pointcut should parse")
    }

    fn run(bindings: Vec<AdviceBinding>, target: &dyn Operation) -> Outcome {
        let mut builder = AdviceRegistry::builder();
        for binding in bindings {
            builder.register(binding).expect("test binding should register");
        }
        let registry = builder.seal();
        let links: Arc<[Arc<RegisteredAdvice>]> = registry.resolve(&site()).into();
        InterceptionChain::build(links, target)
            .run(&Invocation::new(site(), vec![Value::new(false)]))
    }

    fn ok_target(trace: &Trace) -> impl Operation + '_ {
        move |_: &[Value]| -> Result<Value, Fault> {
            trace.push("target");
            Ok(Value::new(42_i32))
        }
    }

    fn failing_target(trace: &Trace) -> impl Operation + '_ {
        move |_: &[Value]| -> Result<Value, Fault> {
            trace.push("target");
            Err(Fault::new("IO", "disk gone"))
        }
    }

    fn value_of(outcome: &Outcome) -> Option<i32> {
        outcome.value().and_then(|v| v.get::<i32>())
    }

    #[test]
    fn empty_chain_calls_target() {
        let trace = Trace::new();
        let outcome = run(vec![], &ok_target(&trace));
        assert_eq!(value_of(&outcome), Some(42));
        assert_eq!(trace.entries(), vec!["target"]);
    }

    #[test]
    fn empty_chain_reports_target_failure() {
        let trace = Trace::new();
        let outcome = run(vec![], &failing_target(&trace));
        match outcome {
            Outcome::Raised(InvocationError::TargetOperation { fault, call_site }) => {
                assert_eq!(fault.code, "IO");
                assert_eq!(call_site, site());
            }
            other => panic!("expected target failure, got {other:?}"),
        }
    }

    #[test]
    fn nesting_order_on_success() {
        let trace = Trace::new();
        let outcome = run(
            vec![
                MockAdvice::after("after", ANY, &trace),
                MockAdvice::after_returning("returning", ANY, &trace),
                MockAdvice::after_throwing("throwing", ANY, &trace),
                MockAdvice::before("before", ANY, &trace),
                MockAdvice::around("around", ANY, &trace),
            ],
            &ok_target(&trace),
        );
        assert_eq!(value_of(&outcome), Some(42));
        assert_eq!(
            trace.entries(),
            vec![
                "around:before",
                "before",
                "target",
                "after",
                "returning",
                "around:after"
            ]
        );
    }

    #[test]
    fn nesting_order_on_failure() {
        let trace = Trace::new();
        let outcome = run(
            vec![
                MockAdvice::after("after", ANY, &trace),
                MockAdvice::after_returning("returning", ANY, &trace),
                MockAdvice::after_throwing("throwing", ANY, &trace),
                MockAdvice::around("around", ANY, &trace),
            ],
            &failing_target(&trace),
        );
        assert!(outcome.is_raised());
        assert_eq!(
            trace.entries(),
            vec!["around:before", "target", "after", "throwing", "around:after"]
        );
    }

    #[test]
    fn before_fault_aborts_target_and_inner_advice() {
        let trace = Trace::new();
        let target = CountingTarget::new();
        let counted = {
            let target = target.clone();
            move |_: &[Value]| -> Result<Value, Fault> {
                target.hit();
                Ok(Value::unit())
            }
        };
        let outcome = run(
            vec![
                MockAdvice::failing_before("guard", ANY, &trace, Fault::new("DENIED", "no"))
                    .with_order(1),
                MockAdvice::before("inner", ANY, &trace).with_order(2),
            ],
            &counted,
        );
        assert_eq!(target.calls(), 0);
        assert_eq!(trace.entries(), vec!["guard"]);
        let err = outcome.error().expect("before fault should raise");
        assert_eq!(err.advice_id(), Some("guard"));
        assert_eq!(err.fault().code, "DENIED");
    }

    #[test]
    fn before_fault_is_seen_by_outer_post_advice() {
        let trace = Trace::new();
        let outcome = run(
            vec![
                MockAdvice::after("after", ANY, &trace).with_order(1),
                MockAdvice::after_throwing("throwing", ANY, &trace).with_order(1),
                MockAdvice::failing_before("guard", ANY, &trace, Fault::new("DENIED", "no"))
                    .with_order(2),
            ],
            &ok_target(&trace),
        );
        assert!(outcome.is_raised());
        assert_eq!(trace.entries(), vec!["guard", "after", "throwing"]);
    }

    #[test]
    fn short_circuit_skips_inner_chain() {
        let trace = Trace::new();
        let outcome = run(
            vec![
                MockAdvice::after("after", ANY, &trace).with_order(1),
                MockAdvice::short_circuit("cache", ANY, &trace, Value::new(7_i32)).with_order(2),
                MockAdvice::before("inner", ANY, &trace).with_order(3),
            ],
            &ok_target(&trace),
        );
        assert_eq!(value_of(&outcome), Some(7));
        assert_eq!(trace.entries(), vec!["cache", "after"]);
    }

    #[test]
    fn around_may_proceed_many_times() {
        let trace = Trace::new();
        let retry = AdviceBinding::around("retry", any(), |p| {
            let mut outcome = p.proceed();
            while outcome.is_raised() && p.proceed_count() < 3 {
                outcome = p.proceed();
            }
            outcome
        });
        let outcome = run(vec![retry], &failing_target(&trace));
        assert!(outcome.is_raised());
        assert_eq!(trace.len(), 3);
    }

    #[test]
    fn around_proceed_with_substitutes_arguments() {
        let double = AdviceBinding::around("double", any(), |p| {
            let n = p.invocation().arg::<i32>(0).copied().unwrap_or_default();
            p.proceed_with(vec![Value::new(n * 2)])
        });
        let echo = |args: &[Value]| -> Result<Value, Fault> { Ok(args[0].clone()) };

        let mut builder = AdviceRegistry::builder();
        builder.register(double).expect("register");
        let registry = builder.seal();
        let links: Arc<[Arc<RegisteredAdvice>]> = registry.resolve(&site()).into();
        let outcome = InterceptionChain::build(links, &echo)
            .run(&Invocation::new(site(), vec![Value::new(21_i32)]));
        assert_eq!(value_of(&outcome), Some(42));
    }

    #[test]
    fn around_raise_is_attributed_to_binding() {
        let reject = AdviceBinding::around("reject", any(), |p| {
            p.raise(Fault::new("THROTTLED", "slow down"))
        });
        let trace = Trace::new();
        let outcome = run(vec![reject], &ok_target(&trace));
        match outcome {
            Outcome::Raised(InvocationError::AdviceExecution { advice_id, kind, .. }) => {
                assert_eq!(advice_id, "reject");
                assert_eq!(kind, AdviceKind::Around);
            }
            other => panic!("expected advice failure, got {other:?}"),
        }
        assert!(trace.is_empty());
    }

    #[test]
    fn around_can_suppress_failure() {
        let fallback = AdviceBinding::around("fallback", any(), |p| match p.proceed() {
            Outcome::Raised(_) => Outcome::Returned(Value::new(0_i32)),
            ok => ok,
        });
        let trace = Trace::new();
        let outcome = run(vec![fallback], &failing_target(&trace));
        assert_eq!(value_of(&outcome), Some(0));
    }

    #[test]
    fn after_returning_replacement_seen_by_outer() {
        let trace = Trace::new();
        let seen = Trace::new();
        let observer = {
            let seen = seen.clone();
            AdviceBinding::after_returning("observer", any(), move |_, v| {
                seen.push(format!("{v:?}"));
                Ok(None)
            })
            .with_order(1)
        };
        let outcome = run(
            vec![
                observer,
                MockAdvice::replacer("replace", ANY, &trace, Value::new(99_i32)).with_order(2),
            ],
            &ok_target(&trace),
        );
        assert_eq!(value_of(&outcome), Some(99));
        assert_eq!(seen.entries(), vec!["99"]);
    }

    #[test]
    fn replacement_requires_recoverable_binding() {
        let trace = Trace::new();
        let outcome = run(
            vec![
                MockAdvice::translator("translator", ANY, &trace, Fault::new("TRANSLATED", "x"))
                    .with_order(1),
                MockAdvice::failing_before("guard", ANY, &trace, Fault::new("DENIED", "no"))
                    .with_order(2),
            ],
            &ok_target(&trace),
        );
        let err = outcome.error().expect("guard failure should propagate");
        assert_eq!(err.advice_id(), Some("guard"));
        assert_eq!(err.fault().code, "DENIED");
        assert_eq!(trace.entries(), vec!["guard", "translator"]);
    }

    #[test]
    fn replacement_is_attributed_to_after_throwing_binding() {
        let trace = Trace::new();
        let outcome = run(
            vec![
                MockAdvice::after("outer-after", ANY, &trace).with_order(1),
                MockAdvice::translator("translator", ANY, &trace, Fault::new("TRANSLATED", "x"))
                    .with_order(2)
                    .recoverable(),
            ],
            &failing_target(&trace),
        );
        match outcome {
            Outcome::Raised(InvocationError::AdviceExecution {
                advice_id,
                kind,
                fault,
                ..
            }) => {
                assert_eq!(advice_id, "translator");
                assert_eq!(kind, AdviceKind::AfterThrowing);
                assert_eq!(fault.code, "TRANSLATED");
            }
            other => panic!("expected translated advice failure, got {other:?}"),
        }
        assert_eq!(trace.entries(), vec!["target", "translator"]);
    }

    #[test]
    fn recovery_requires_recoverable_binding() {
        let trace = Trace::new();
        let outcome = run(
            vec![MockAdvice::recoverer("recover", ANY, &trace, Value::new(1_i32))],
            &failing_target(&trace),
        );
        assert_eq!(outcome.error().map(|e| e.fault().code.as_str()), Some("IO"));

        let trace = Trace::new();
        let outcome = run(
            vec![MockAdvice::recoverer("recover", ANY, &trace, Value::new(1_i32)).recoverable()],
            &failing_target(&trace),
        );
        assert_eq!(value_of(&outcome), Some(1));
    }

    #[test]
    fn post_phase_fault_skips_remaining_post_handlers() {
        let trace = Trace::new();
        let outcome = run(
            vec![
                MockAdvice::around("around", ANY, &trace).with_order(1),
                MockAdvice::after("outer-after", ANY, &trace).with_order(2),
                MockAdvice::after_throwing("outer-throwing", ANY, &trace).with_order(2),
                MockAdvice::failing_after("broken", ANY, &trace, Fault::new("AUDIT", "down"))
                    .with_order(3),
            ],
            &ok_target(&trace),
        );
        assert_eq!(
            trace.entries(),
            vec!["around:before", "target", "broken", "around:after"]
        );
        let err = outcome.error().expect("after fault should raise");
        assert_eq!(err.advice_id(), Some("broken"));
    }

    #[test]
    fn after_throwing_fault_skips_remaining_post_handlers() {
        let trace = Trace::new();
        let outcome = run(
            vec![
                MockAdvice::around("around", ANY, &trace).with_order(1),
                MockAdvice::after("outer-after", ANY, &trace).with_order(2),
                MockAdvice::after_throwing("outer-throwing", ANY, &trace).with_order(2),
                MockAdvice::failing_after_throwing(
                    "broken",
                    ANY,
                    &trace,
                    Fault::new("ALERTING", "pager down"),
                )
                .with_order(3),
            ],
            &failing_target(&trace),
        );
        assert_eq!(
            trace.entries(),
            vec!["around:before", "target", "broken", "around:after"]
        );
        let err = outcome.error().expect("after-throwing fault should raise");
        assert_eq!(err.advice_id(), Some("broken"));
        assert_eq!(err.fault().code, "ALERTING");
    }

    #[test]
    fn same_kind_post_handlers_all_run_innermost_first() {
        let trace = Trace::new();
        let outcome = run(
            vec![
                MockAdvice::after_returning("returning-1", ANY, &trace).with_order(1),
                MockAdvice::after_returning("returning-2", ANY, &trace).with_order(2),
                MockAdvice::after("after-a", ANY, &trace).with_order(3),
                MockAdvice::after("after-b", ANY, &trace).with_order(3),
            ],
            &ok_target(&trace),
        );
        assert_eq!(value_of(&outcome), Some(42));
        assert_eq!(
            trace.entries(),
            vec!["target", "after-b", "after-a", "returning-2", "returning-1"]
        );
    }

    #[test]
    fn after_returning_skipped_on_failure() {
        let trace = Trace::new();
        let outcome = run(
            vec![MockAdvice::after_returning("returning", ANY, &trace)],
            &failing_target(&trace),
        );
        assert!(outcome.is_raised());
        assert_eq!(trace.entries(), vec!["target"]);
    }

    #[test]
    fn after_throwing_skipped_on_success() {
        let trace = Trace::new();
        let outcome = run(
            vec![MockAdvice::after_throwing("throwing", ANY, &trace)],
            &ok_target(&trace),
        );
        assert!(outcome.is_returned());
        assert_eq!(trace.entries(), vec!["target"]);
    }
}
