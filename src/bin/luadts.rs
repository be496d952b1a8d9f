//! Binary entry point for the luadts CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Write declarations, reference.d.ts, bindings.lua and api.d.ts
//! luadts generate --source media/lua --models models --out typings
//!
//! # Add default overlay nodes for everything the analysis finds
//! luadts populate --source media/lua --models models
//!
//! # Print the load order of the sources
//! luadts order --source media/lua
//! ```
//!
//! Every command prints one JSON document on stdout. Logs go to stderr.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use luadts::cli::{
    default_out_dir, load_config, run_generate, run_order, run_populate, ConfigOverrides,
};
use luadts::error::{LuadtsError, OutputErrorCode};
use luadts::output::{emit_response, ErrorResponse};

// ============================================================================
// CLI Structure
// ============================================================================

/// TypeScript declarations for derive-style Lua class hierarchies.
#[derive(Parser, Debug)]
#[command(
    name = "luadts",
    version,
    about = "TypeScript declarations for derive-style Lua class hierarchies"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// JSON configuration file (default: built-in defaults).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Module name of the generated `declare module` blocks.
    #[arg(long, global = true)]
    module_name: Option<String>,

    /// Dotted namespace the declarations live in.
    #[arg(long, global = true)]
    root_namespace: Option<String>,

    /// Name of the class every derive chain starts from.
    #[arg(long, global = true)]
    root_class: Option<String>,

    /// Source subtree to scan. Can be given multiple times and replaces the
    /// configured list.
    #[arg(long = "subtree", global = true)]
    subtrees: Vec<String>,

    /// Glob of relative paths to skip. Can be given multiple times.
    #[arg(long, global = true)]
    exclude: Vec<String>,

    /// Cap on dependency ordering sweeps.
    #[arg(long, global = true)]
    max_order_iterations: Option<usize>,
}

impl GlobalArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            module_name: self.module_name.clone(),
            root_namespace: self.root_namespace.clone(),
            root_class: self.root_class.clone(),
            subtrees: self.subtrees.clone(),
            exclude: self.exclude.clone(),
            max_order_iterations: self.max_order_iterations,
        }
    }
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze the sources and write every output file.
    Generate {
        /// Root of the Lua sources.
        #[arg(long)]
        source: PathBuf,
        /// Directory of JSON overlay models.
        #[arg(long)]
        models: Option<PathBuf>,
        /// Output directory (default: `luadts-out` next to the source root).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Add default overlay nodes for every inferred entity and save the
    /// models.
    Populate {
        /// Root of the Lua sources.
        #[arg(long)]
        source: PathBuf,
        /// Directory of JSON overlay models, created if missing.
        #[arg(long)]
        models: PathBuf,
    },
    /// Print the sources ordered so each follows what it requires.
    Order {
        /// Root of the Lua sources.
        #[arg(long)]
        source: PathBuf,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // errors go to stdout as JSON like every other response
            let _ = emit_response(&response, &mut io::stdout());
            tracing::debug!("exiting with code {}", error_code);

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<(), LuadtsError> {
    let config = load_config(cli.global.config.as_deref(), &cli.global.overrides())?;
    let stdout = &mut io::stdout();
    let result = match cli.command {
        Command::Generate {
            source,
            models,
            out,
        } => {
            let out = out.unwrap_or_else(|| default_out_dir(&source));
            let response = run_generate(config, &source, models.as_deref(), &out)?;
            emit_response(&response, stdout)
        }
        Command::Populate { source, models } => {
            let response = run_populate(config, &source, &models)?;
            emit_response(&response, stdout)
        }
        Command::Order { source } => {
            let response = run_order(config, &source)?;
            emit_response(&response, stdout)
        }
    };
    result.map_err(|e| LuadtsError::internal(format!("failed to write response: {}", e)))
}
