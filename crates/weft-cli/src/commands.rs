//! Subcommand implementations.

use crate::config::WeftConfig;
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};
use weft_advice::{AdviceRegistry, Dispatcher, Outcome, TraceLine, TraceSink, TracingSink};
use weft_types::{CallSite, Fault, Value};

/// Fault code raised by the demo operation under `--fail`.
pub const DEMO_FAULT: &str = "TARGET_FAILED";

/// Prints trace lines to stdout.
struct PrintSink;

impl TraceSink for PrintSink {
    fn emit(&self, line: TraceLine) {
        println!("{line}");
    }
}

/// Behavior of the demo operation behind `weft invoke`.
#[derive(Debug, Clone, Default)]
pub struct DemoOptions {
    pub delay_ms: u64,
    pub fail: Option<String>,
}

impl DemoOptions {
    /// Runs the operation: sleeps, then fails or echoes its arguments.
    fn run(&self, args: &[Value]) -> Result<Value, Fault> {
        if self.delay_ms > 0 {
            thread::sleep(Duration::from_millis(self.delay_ms));
        }
        if let Some(message) = &self.fail {
            return Err(Fault::new(DEMO_FAULT, message.clone()));
        }
        Ok(match args {
            [] => Value::unit(),
            [single] => single.clone(),
            many => Value::new(many.iter().map(|v| format!("{v:?}")).collect::<Vec<_>>()),
        })
    }
}

fn sink(trace_to_log: bool) -> Arc<dyn TraceSink> {
    if trace_to_log {
        Arc::new(TracingSink)
    } else {
        Arc::new(PrintSink)
    }
}

/// Validates every definition, then builds the registry.
fn build_registry(config: &WeftConfig, trace_to_log: bool) -> Result<AdviceRegistry> {
    let errors = config.advice.validate_all();
    if !errors.is_empty() {
        for err in &errors {
            eprintln!("  {err}");
        }
        bail!("{} invalid definition(s)", errors.len());
    }
    let registry = config
        .advice
        .build_registry(&sink(trace_to_log))
        .context("failed to build advice registry")?;
    info!(
        pointcuts = registry.pointcut_names().count(),
        advices = registry.len(),
        "Registry sealed"
    );
    Ok(registry)
}

fn dispatcher(config: &WeftConfig, trace_to_log: bool) -> Result<Dispatcher> {
    let registry = build_registry(config, trace_to_log)?;
    Ok(Dispatcher::with_config(Arc::new(registry), config.dispatch.clone()))
}

fn parse_call_site(text: &str) -> Result<CallSite> {
    CallSite::parse(text).with_context(|| format!("invalid call site '{text}'"))
}

/// Types a command-line argument: bool, then integer, then float, else string.
pub fn parse_value(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        Value::new(b)
    } else if let Ok(n) = raw.parse::<i64>() {
        Value::new(n)
    } else if let Ok(x) = raw.parse::<f64>() {
        Value::new(x)
    } else {
        Value::new(raw.to_string())
    }
}

/// `weft check`
pub fn check(config: &WeftConfig, trace_to_log: bool) -> Result<()> {
    let registry = build_registry(config, trace_to_log)?;
    let disabled = config.advice.advices.iter().filter(|a| !a.enabled).count();
    println!(
        "OK: {} pointcut(s), {} advice binding(s), {} disabled",
        registry.pointcut_names().count(),
        registry.len(),
        disabled
    );
    Ok(())
}

/// `weft resolve <call-site>`
pub fn resolve(config: &WeftConfig, call_site: &str, trace_to_log: bool) -> Result<()> {
    let site = parse_call_site(call_site)?;
    let dispatcher = dispatcher(config, trace_to_log)?;
    let resolved = dispatcher.resolve(&site);

    if resolved.is_empty() {
        println!("no advice applies to {site}");
        return Ok(());
    }
    println!("{site}:");
    for (i, advice) in resolved.iter().enumerate() {
        println!(
            "  {}. {} [{}] order={} pointcut={}",
            i + 1,
            advice.id(),
            advice.kind(),
            advice.order(),
            advice.pointcut()
        );
    }
    Ok(())
}

/// `weft invoke <call-site>`
///
/// Fails (exit code 1) when the dispatched call raises.
pub fn invoke(
    config: &WeftConfig,
    call_site: &str,
    raw_args: &[String],
    demo: &DemoOptions,
    trace_to_log: bool,
) -> Result<()> {
    let site = parse_call_site(call_site)?;
    let arguments: Vec<Value> = raw_args.iter().map(|a| parse_value(a)).collect();
    if arguments.len() != site.arity() {
        debug!(
            expected = site.arity(),
            given = arguments.len(),
            "argument count differs from call site arity"
        );
    }

    let dispatcher = dispatcher(config, trace_to_log)?;
    match dispatcher.invoke(&site, |args| demo.run(args), arguments) {
        Outcome::Returned(value) => {
            println!("returned {value:?}");
            Ok(())
        }
        Outcome::Raised(err) => Err(anyhow::Error::new(err)),
    }
}
