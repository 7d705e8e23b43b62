//! weft CLI - advice dispatch from declarative config
//!
//! # Configuration
//!
//! Configuration is loaded from multiple sources with priority:
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`WEFT_*`)
//! 3. Config file (`--config <path>`, else `weft.toml` in current directory)
//! 4. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `WEFT_CACHE_RESOLUTIONS`: Cache resolved advice per call site (`true`/`false`)
//! - `WEFT_LOG_LEVEL`: Default log level when neither `--debug`, `--verbose`
//!   nor `RUST_LOG` is set
//!
//! # Commands
//!
//! - `weft check`: validate pointcuts and advice bindings
//! - `weft resolve <call-site>`: list the advice applying to a call site
//! - `weft invoke <call-site>`: dispatch a demo operation through that advice

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{ConfigLoader, WeftConfig};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// weft CLI - advice dispatch from declarative config
#[derive(Parser, Debug)]
#[command(name = "weft")]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./weft.toml when present)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable the per-call-site resolution cache (also: WEFT_CACHE_RESOLUTIONS)
    #[arg(long, global = true)]
    no_cache: bool,

    /// Send advice trace lines to the log instead of stdout
    #[arg(long, global = true)]
    trace_to_log: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate pointcuts and advice bindings
    Check,

    /// List the advice applying to a call site, outermost first
    Resolve {
        /// Call site, e.g. `demo.dao.AccountDao.findAccounts(bool)`
        call_site: String,
    },

    /// Dispatch a demo operation through the applicable advice
    Invoke {
        /// Call site, e.g. `demo.dao.AccountDao.findAccounts(bool)`
        call_site: String,

        /// Argument value (repeatable); `true`, `42` and `1.5` are typed
        #[arg(long = "arg", value_name = "VALUE")]
        args: Vec<String>,

        /// Milliseconds the operation sleeps before returning
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,

        /// Make the operation fail with this message
        #[arg(long, value_name = "MESSAGE")]
        fail: Option<String>,
    },
}

/// Loads file/env config via [`ConfigLoader`] and applies CLI flags as the
/// highest-priority layer.
fn resolve_config(args: &Args) -> Result<WeftConfig, config::ConfigError> {
    let mut loader = ConfigLoader::new();
    if let Some(ref path) = args.config {
        loader = loader.with_config_path(path);
    }
    let mut config = loader.load()?;

    if args.no_cache {
        config.dispatch.cache_resolutions = false;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = resolve_config(&args).map_err(|e| anyhow::anyhow!("Config error: {e}"))?;

    // Terminal filter: --debug > --verbose > RUST_LOG env > config logging.level
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();

    debug!(
        config = ?args.config,
        cache = config.dispatch.cache_resolutions,
        pointcuts = config.advice.pointcuts.len(),
        advices = config.advice.advices.len(),
        "Config resolved"
    );

    match args.command {
        Command::Check => commands::check(&config, args.trace_to_log),
        Command::Resolve { call_site } => {
            commands::resolve(&config, &call_site, args.trace_to_log)
        }
        Command::Invoke {
            call_site,
            args: values,
            delay_ms,
            fail,
        } => commands::invoke(
            &config,
            &call_site,
            &values,
            &commands::DemoOptions { delay_ms, fail },
            args.trace_to_log,
        ),
    }
}
