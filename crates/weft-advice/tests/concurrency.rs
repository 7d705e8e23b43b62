//! Concurrent and nested dispatch through one shared dispatcher.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use weft_advice::testing::{MockAdvice, Trace};
use weft_advice::{AdviceBinding, AdviceRegistry, Dispatcher, Outcome, PointcutRule};
use weft_types::{CallSite, Fault, Value};

const THREADS: usize = 8;
const CALLS_PER_THREAD: usize = 200;

fn counter_site(n: usize) -> CallSite {
    CallSite::new(format!("demo.counter.Counter{}", n % 4), "next").with_args(["u64"])
}

#[test]
fn many_threads_share_one_dispatcher() {
    let advised = Arc::new(AtomicUsize::new(0));
    let mut builder = AdviceRegistry::builder();
    {
        let advised = Arc::clone(&advised);
        builder
            .register(AdviceBinding::around(
                "count",
                PointcutRule::parse("demo.counter.*.next(u64)").expect("parse"),
                move |p| {
                    advised.fetch_add(1, Ordering::SeqCst);
                    p.proceed()
                },
            ))
            .expect("register");
    }
    builder
        .register(AdviceBinding::after_returning(
            "increment",
            PointcutRule::parse("*.next(..)").expect("parse"),
            |_, v| Ok(v.get::<u64>().map(|n| Value::new(n + 1))),
        ))
        .expect("register");
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(builder.seal())));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || {
                for i in 0..CALLS_PER_THREAD {
                    let input = (t * CALLS_PER_THREAD + i) as u64;
                    let value = dispatcher
                        .call(
                            &counter_site(i),
                            |args| Ok(args[0].clone()),
                            vec![Value::new(input)],
                        )
                        .expect("counter call succeeds");
                    assert_eq!(value.get::<u64>(), Some(input + 1));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread should not panic");
    }

    assert_eq!(advised.load(Ordering::SeqCst), THREADS * CALLS_PER_THREAD);
    assert_eq!(dispatcher.cached_call_sites(), 4);
}

#[test]
fn concurrent_trace_keeps_every_entry() {
    let trace = Trace::new();
    let mut builder = AdviceRegistry::builder();
    builder
        .register(MockAdvice::before("seen", "*.*(..)", &trace))
        .expect("register");
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(builder.seal())));

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let dispatcher = Arc::clone(&dispatcher);
            scope.spawn(move || {
                for i in 0..CALLS_PER_THREAD {
                    dispatcher.invoke(&counter_site(i), |_| Ok(Value::unit()), Vec::new());
                }
            });
        }
    });

    assert_eq!(trace.len(), THREADS * CALLS_PER_THREAD);
}

#[test]
fn target_may_dispatch_through_the_same_dispatcher() {
    let trace = Trace::new();
    let mut builder = AdviceRegistry::builder();
    builder
        .register(MockAdvice::around("around", "demo.dao.*.*(..)", &trace))
        .expect("register");
    let dispatcher = Dispatcher::new(Arc::new(builder.seal()));

    let inner_site = CallSite::new("demo.dao.MembershipDao", "addAccount");
    let outer_site = CallSite::new("demo.dao.AccountDao", "addAccount");

    let outcome = dispatcher.invoke(
        &outer_site,
        |_| {
            trace.push("outer-target");
            let inner = dispatcher.invoke(
                &inner_site,
                |_| {
                    trace.push("inner-target");
                    Ok(Value::new(1_i32))
                },
                Vec::new(),
            );
            let n = inner
                .into_result()
                .map_err(|e| Fault::new("NESTED", e.to_string()))?
                .get::<i32>()
                .unwrap_or_default();
            Ok(Value::new(n + 1))
        },
        Vec::new(),
    );

    assert_eq!(outcome.value().and_then(|v| v.get::<i32>()), Some(2));
    assert_eq!(
        trace.entries(),
        vec![
            "around:before",
            "outer-target",
            "around:before",
            "inner-target",
            "around:after",
            "around:after",
        ]
    );
}

#[test]
fn nested_failure_surfaces_through_outer_call() {
    let dispatcher = Dispatcher::new(Arc::new(AdviceRegistry::empty()));
    let inner_site = CallSite::new("demo.dao.AccountDao", "findAccounts");
    let outer_site = CallSite::new("demo.service.Report", "build");

    let outcome = dispatcher.invoke(
        &outer_site,
        |_| {
            dispatcher
                .call(
                    &inner_site,
                    |_| Err(Fault::new("IO", "disk gone")),
                    Vec::new(),
                )
                .map_err(|e| Fault::new("NESTED", e.to_string()))
        },
        Vec::new(),
    );

    match outcome {
        Outcome::Raised(err) => {
            assert_eq!(err.call_site(), &outer_site);
            assert_eq!(err.fault().code, "NESTED");
            assert!(err.fault().message.contains("disk gone"));
        }
        Outcome::Returned(v) => panic!("expected failure, got {v:?}"),
    }
}
