//! Builtin advice handlers.
//!
//! Declarative configuration refers to these by name:
//!
//! | Name         | Kind           | Emits                                   |
//! |--------------|----------------|-----------------------------------------|
//! | `log-call`   | Before         | call site and argument snapshot         |
//! | `time`       | Around         | elapsed time of the wrapped call        |
//! | `log-result` | AfterReturning | result snapshot                         |
//! | `log-error`  | AfterThrowing  | the failure (then rethrows it)          |
//! | `log-exit`   | After          | whether the call returned or raised     |
//! | `deadline`   | Around         | fails calls slower than `deadline_ms`   |

use crate::sink::{TraceLine, TraceSink};
use crate::{
    AdviceError, AdviceKind, AfterAdvice, AfterReturningAdvice, AfterThrowingAdvice,
    AroundAdvice, BeforeAdvice, Handler, Invocation, InvocationError, Outcome, Proceeding,
    ThrowingAction,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use weft_types::{Fault, Value};

/// Names accepted by [`builtin_handler`].
pub const BUILTIN_HANDLERS: [&str; 6] = [
    "log-call",
    "time",
    "log-result",
    "log-error",
    "log-exit",
    "deadline",
];

/// Kind implemented by the builtin handler `name`.
#[must_use]
pub fn builtin_kind(name: &str) -> Option<AdviceKind> {
    Some(match name {
        "log-call" => AdviceKind::Before,
        "time" | "deadline" => AdviceKind::Around,
        "log-result" => AdviceKind::AfterReturning,
        "log-error" => AdviceKind::AfterThrowing,
        "log-exit" => AdviceKind::After,
        _ => return None,
    })
}

/// Instantiates the builtin handler `name` for the binding `advice_id`.
///
/// # Errors
///
/// - [`AdviceError::UnknownHandler`] for an unknown name
/// - [`AdviceError::InvalidHandlerOption`] if `deadline` lacks a positive `deadline_ms`
pub fn builtin_handler(
    name: &str,
    advice_id: &str,
    deadline_ms: Option<u64>,
    sink: Arc<dyn TraceSink>,
) -> Result<Handler, AdviceError> {
    let emitter = Emitter {
        advice_id: advice_id.to_string(),
        sink,
    };
    Ok(match name {
        "log-call" => Handler::Before(Arc::new(CallLogger { emitter })),
        "time" => Handler::Around(Arc::new(Stopwatch { emitter })),
        "log-result" => Handler::AfterReturning(Arc::new(ResultLogger { emitter })),
        "log-error" => Handler::AfterThrowing(Arc::new(ErrorLogger { emitter })),
        "log-exit" => Handler::After(Arc::new(ExitLogger { emitter })),
        "deadline" => Handler::Around(Arc::new(Deadline::new(
            emitter,
            deadline_limit(deadline_ms)?,
        ))),
        other => return Err(AdviceError::UnknownHandler(other.to_string())),
    })
}

/// Validates the `deadline_ms` option of the `deadline` handler.
pub(crate) fn deadline_limit(deadline_ms: Option<u64>) -> Result<Duration, AdviceError> {
    match deadline_ms {
        Some(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        Some(_) => Err(AdviceError::InvalidHandlerOption {
            handler: "deadline".into(),
            message: "deadline_ms must be greater than zero".into(),
        }),
        None => Err(AdviceError::InvalidHandlerOption {
            handler: "deadline".into(),
            message: "deadline_ms is required".into(),
        }),
    }
}

struct Emitter {
    advice_id: String,
    sink: Arc<dyn TraceSink>,
}

impl Emitter {
    fn emit(
        &self,
        kind: AdviceKind,
        invocation: &Invocation,
        message: String,
        elapsed: Option<Duration>,
    ) {
        self.sink.emit(TraceLine {
            advice_id: self.advice_id.clone(),
            kind,
            call_site: invocation.call_site.short_signature(),
            message,
            elapsed,
        });
    }
}

fn snapshot(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| format!("{v:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `log-call`: records the call and its arguments.
struct CallLogger {
    emitter: Emitter,
}

impl BeforeAdvice for CallLogger {
    fn before(&self, invocation: &Invocation) -> Result<(), Fault> {
        self.emitter.emit(
            AdviceKind::Before,
            invocation,
            format!("calling with ({})", snapshot(&invocation.arguments)),
            None,
        );
        Ok(())
    }
}

/// `time`: measures the wrapped call.
struct Stopwatch {
    emitter: Emitter,
}

impl AroundAdvice for Stopwatch {
    fn around(&self, proceeding: &Proceeding<'_>) -> Outcome {
        let started = Instant::now();
        let outcome = proceeding.proceed();
        let elapsed = started.elapsed();
        self.emitter.emit(
            AdviceKind::Around,
            proceeding.invocation(),
            format!("duration {:.3} s", elapsed.as_secs_f64()),
            Some(elapsed),
        );
        outcome
    }
}

/// `log-result`: records the returned value.
struct ResultLogger {
    emitter: Emitter,
}

impl AfterReturningAdvice for ResultLogger {
    fn after_returning(
        &self,
        invocation: &Invocation,
        value: &Value,
    ) -> Result<Option<Value>, Fault> {
        self.emitter.emit(
            AdviceKind::AfterReturning,
            invocation,
            format!("returned {value:?}"),
            None,
        );
        Ok(None)
    }
}

/// `log-error`: records the failure and rethrows it.
struct ErrorLogger {
    emitter: Emitter,
}

impl AfterThrowingAdvice for ErrorLogger {
    fn after_throwing(
        &self,
        invocation: &Invocation,
        error: &InvocationError,
    ) -> Result<ThrowingAction, Fault> {
        self.emitter.emit(
            AdviceKind::AfterThrowing,
            invocation,
            format!("raised {}", error.fault()),
            None,
        );
        Ok(ThrowingAction::Rethrow)
    }
}

/// `log-exit`: records that the call finished.
struct ExitLogger {
    emitter: Emitter,
}

impl AfterAdvice for ExitLogger {
    fn after(&self, invocation: &Invocation, outcome: &Outcome) -> Result<(), Fault> {
        let status = if outcome.is_returned() {
            "returned"
        } else {
            "raised"
        };
        self.emitter.emit(
            AdviceKind::After,
            invocation,
            format!("finally ({status})"),
            None,
        );
        Ok(())
    }
}

/// `deadline`: turns an overrun into a failure once the call returns.
///
/// The wrapped call is never interrupted.
struct Deadline {
    emitter: Emitter,
    limit: Duration,
}

impl Deadline {
    fn new(emitter: Emitter, limit: Duration) -> Self {
        Self { emitter, limit }
    }
}

impl AroundAdvice for Deadline {
    fn around(&self, proceeding: &Proceeding<'_>) -> Outcome {
        let started = Instant::now();
        let outcome = proceeding.proceed();
        let elapsed = started.elapsed();
        if elapsed <= self.limit {
            return outcome;
        }

        let message = format!(
            "took {} ms, limit is {} ms",
            elapsed.as_millis(),
            self.limit.as_millis()
        );
        self.emitter.emit(
            AdviceKind::Around,
            proceeding.invocation(),
            format!("deadline exceeded: {message}"),
            Some(elapsed),
        );
        proceeding.raise(Fault::new("DEADLINE_EXCEEDED", message))
    }
}
