//! Structured logging.
//!
//! The binary installs one `tracing` subscriber at startup ([`init`]). Everything else logs through [`LogScope`]
//! handles that the runner creates explicitly: one per namespace and one per test, so every line carries the
//! `namespace` and `test` fields it belongs to.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing::Span;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the filter is `info` (or `debug` when `verbose`). With `log_file`, output is
/// written to that file without ANSI colors instead of stderr.
///
/// ## Errors
/// - I/O errors from creating the log file.
pub fn init(verbose: bool, log_file: Option<&Path>) -> io::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    // A subscriber may already be installed (tests, embedding); keep the existing one.
    let _ = match log_file {
        Some(path) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(File::create(path)?))
            .try_init(),
        None => builder.with_writer(io::stderr).try_init(),
    };
    Ok(())
}

/// Logging handle for one namespace or one test within it.
#[derive(Debug, Clone)]
pub struct LogScope {
    label: String,
    span: Span,
}

impl LogScope {
    /// Scope for a whole namespace.
    pub fn namespace(namespace: &str) -> Self {
        Self {
            label: namespace.to_string(),
            span: tracing::info_span!("suite", namespace = %namespace),
        }
    }

    /// Child scope for one test, labelled `"<namespace> (<test>)"`.
    ///
    /// The label is recorded on the span so every line logged for the test carries it.
    pub fn test(&self, test: &str) -> Self {
        let label = format!("{} ({})", self.label, test);
        Self {
            span: tracing::info_span!(parent: &self.span, "test", test = %test, label = %label),
            label,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Run `f` with this scope's span entered.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        self.span.in_scope(f)
    }
}
