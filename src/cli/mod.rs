//! CLI module for the wirecheck harness
//!
//! ## Commands
//!
//! - `run <manifest>` - Connect to the target and run every suite, stopping at the first failure
//! - `list <manifest>` - Print the suites and tests a manifest defines, without connecting
//!
//! ## Exit codes
//!
//! - `0` every test passed
//! - `1` a test failed and the run was aborted
//! - `2` the manifest, the configuration or the connection could not be used
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use wirecheck_proto::Delimiter;

use crate::logging;
use crate::version::WIRECHECK_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    /// A test failed.
    pub const FAILURE: ExitCode = ExitCode(1);
    /// The run could not start.
    pub const ERROR: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Setup error (exit code 2).
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::ERROR)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Protocol-driven test harness for long-running target processes
#[derive(Parser, Debug)]
#[command(name = "wirecheck")]
#[command(version = WIRECHECK_VERSION)]
#[command(about = "Run command/outcome test suites against a target over TCP", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write logs to a file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the suites of a manifest against the target
    Run(RunArgs),

    /// List the suites and tests of a manifest
    List {
        /// Suite manifest (TOML)
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,
    },
}

/// Options of `wirecheck run`. Unset values come from the manifest, then the defaults.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Suite manifest (TOML)
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Target host
    #[arg(long, env = "WIRECHECK_HOST")]
    pub host: Option<String>,

    /// Target port
    #[arg(long, env = "WIRECHECK_PORT")]
    pub port: Option<u16>,

    /// Per read/write timeout in seconds
    #[arg(long, value_name = "SECS", env = "WIRECHECK_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Frame delimiter, with escapes such as '\n' or '\r\n'
    #[arg(long, value_name = "ESCAPED")]
    pub delimiter: Option<Delimiter>,

    /// Command sent to the target when a test fails
    #[arg(long, value_name = "COMMAND")]
    pub quit_command: Option<String>,

    /// Largest accepted frame in bytes (0 for no limit)
    #[arg(long, value_name = "BYTES")]
    pub max_frame_len: Option<usize>,

    /// Only run tests whose name contains EXPR
    #[arg(short = 'k', value_name = "EXPR")]
    pub filter: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub async fn run() {
    let cli = Cli::parse();

    if let Err(err) = logging::init(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("error: cannot open log file: {err}");
        process::exit(ExitCode::ERROR.0);
    }

    match execute(cli).await {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
async fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Run(args) => commands::run_manifest(&args).await,
        Command::List { manifest } => commands::list_manifest(&manifest),
    }
}

// ============================================================================
// Tests
// ============================================================================
