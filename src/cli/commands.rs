//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::fmt::Write as _;
use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use crate::config::HarnessConfig;
use crate::manifest::{Manifest, ManifestError};
use crate::reporter::ConsoleReporter;
use crate::runner::Runner;
use crate::suite::TestPlan;
use crate::transport::Connection;

use super::{CliError, CliResult, ExitCode, RunArgs};

/// `wirecheck run`: connect once and run the whole plan.
pub async fn run_manifest(args: &RunArgs) -> CliResult<ExitCode> {
    let manifest = Manifest::from_file(&args.manifest).map_err(diagnostic)?;
    let config = resolve_config(&manifest, args)?;

    let mut plan = manifest.to_plan(&config.delimiter).map_err(diagnostic)?;
    if let Some(filter) = &args.filter {
        plan = plan.filtered(filter);
        if plan.is_empty() {
            return Err(CliError::error(format!("error: no test name matches -k {filter:?}")));
        }
    }

    tracing::info!(
        addr = %config.address(),
        suites = plan.suites().len(),
        tests = plan.test_count(),
        "starting run"
    );
    let connection = Connection::connect(&config.host, config.port, config.connect_options())
        .await
        .map_err(|e| CliError::error(format!("error: {e}")))?;

    let mut runner = Runner::new(connection).with_quit_command(config.quit_command.as_str());
    let mut reporter = ConsoleReporter::new(use_color(args.no_color));
    let report = runner.run_plan(&plan, &mut reporter).await;

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// `wirecheck list`: validate a manifest and print its plan.
pub fn list_manifest(path: &Path) -> CliResult<ExitCode> {
    let manifest = Manifest::from_file(path).map_err(diagnostic)?;
    let config = HarnessConfig::default()
        .apply_connection(&manifest.connection)
        .map_err(|e| CliError::error(format!("error: {e}")))?;
    let plan = manifest.to_plan(&config.delimiter).map_err(diagnostic)?;
    print!("{}", render_plan(&plan));
    Ok(ExitCode::SUCCESS)
}

/// Layer the manifest's `[connection]` table and the command-line options over the defaults.
///
/// Environment variables are already folded into `args` by clap.
pub fn resolve_config(manifest: &Manifest, args: &RunArgs) -> CliResult<HarnessConfig> {
    let mut config = HarnessConfig::default()
        .apply_connection(&manifest.connection)
        .map_err(|e| CliError::error(format!("error: {e}")))?;

    if let Some(host) = &args.host {
        config = config.with_host(host.as_str());
    }
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(delimiter) = &args.delimiter {
        config = config.with_delimiter(delimiter.clone());
    }
    if let Some(command) = &args.quit_command {
        config = config.with_quit_command(command.as_str());
    }
    if let Some(limit) = args.max_frame_len {
        config = config.with_max_frame_len((limit > 0).then_some(limit));
    }

    config
        .validate()
        .map_err(|e| CliError::error(format!("error: {e}")))?;
    Ok(config)
}

/// One block per namespace, one indented line per test.
pub fn render_plan(plan: &TestPlan) -> String {
    let mut out = String::new();
    for suite in plan.suites() {
        let _ = writeln!(out, "{}", suite.namespace());
        for test in suite.tests() {
            let _ = writeln!(out, "  {}: {}", test.name(), test.command());
        }
    }
    let _ = writeln!(out, "{} test(s) in {} suite(s)", plan.test_count(), plan.suites().len());
    out
}

fn use_color(no_color: bool) -> bool {
    !no_color && std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}

/// Render a manifest error with its source snippet.
fn diagnostic(err: ManifestError) -> CliError {
    CliError::error(format!("{:?}", miette::Report::new(err)))
}
