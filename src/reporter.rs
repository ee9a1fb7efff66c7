//! Run reporting.
//!
//! The runner calls a [`Reporter`] at every milestone of a run. Per-frame output goes through `tracing`; reporters
//! only see whole tests, which keeps alternative formats (JSON, TAP, ...) a matter of implementing the trait.

use std::io::{self, Write};

use crate::runner::{RunReport, TestRun, Verdict};
use crate::suite::{TestCase, TestSuite};

/// Observer of a run.
pub trait Reporter {
    /// Called before the first test of a suite.
    fn on_suite_start(&mut self, _suite: &TestSuite) {}

    /// Called right before a test's command is sent.
    fn on_test_start(&mut self, _suite: &TestSuite, _test: &TestCase) {}

    /// Called when a test reaches `Passed` or `Failed`.
    fn on_test_complete(&mut self, run: &TestRun);

    /// Called once, after the last test or after the abort.
    fn on_run_complete(&mut self, report: &RunReport);
}

/// Reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn on_test_complete(&mut self, _run: &TestRun) {}

    fn on_run_complete(&mut self, _report: &RunReport) {}
}

/// Totals of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub not_run: usize,
}

impl RunSummary {
    pub fn from_report(report: &RunReport) -> Self {
        Self {
            passed: report.passed(),
            failed: report.failed(),
            not_run: report.not_run,
        }
    }

    /// Comma-separated counts, omitting zeroes (`"2 passed, 1 failed"`).
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.passed > 0 {
            parts.push(format!("{} passed", self.passed));
        }
        if self.failed > 0 {
            parts.push(format!("{} failed", self.failed));
        }
        if self.not_run > 0 {
            parts.push(format!("{} not run", self.not_run));
        }
        if parts.is_empty() {
            return "no tests ran".to_string();
        }
        parts.join(", ")
    }
}

/// Console reporter writing one line per test and a summary.
pub struct ConsoleReporter<W = io::Stdout> {
    out: W,
    color: bool,
}

impl ConsoleReporter {
    pub fn new(color: bool) -> Self {
        Self {
            out: io::stdout(),
            color,
        }
    }
}

impl<W: Write> ConsoleReporter<W> {
    /// Report into an arbitrary writer.
    pub fn with_writer(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }
}

// Console output is best effort: a closed stdout must not turn into a test failure.
impl<W: Write> Reporter for ConsoleReporter<W> {
    fn on_suite_start(&mut self, suite: &TestSuite) {
        let header = self.paint("1", &format!("== {} ==", suite.namespace()));
        let _ = writeln!(self.out, "{header}");
    }

    fn on_test_complete(&mut self, run: &TestRun) {
        let status = match &run.verdict {
            Verdict::Passed => self.paint("32", "PASSED"),
            Verdict::Failed(_) => self.paint("31", "FAILED"),
        };
        let _ = writeln!(
            self.out,
            "{}::{} {} ({}ms)",
            run.namespace,
            run.test.name(),
            status,
            run.duration.as_millis()
        );
    }

    fn on_run_complete(&mut self, report: &RunReport) {
        if let Some(run) = report.failure() {
            if let Verdict::Failed(reason) = &run.verdict {
                let _ = writeln!(self.out);
                let _ = writeln!(self.out, "{}", self.paint("1;31", "FAILURE"));
                let _ = writeln!(self.out, "    {}::{}", run.namespace, run.test.name());
                let _ = writeln!(self.out, "    command: {}", run.test.command());
                let _ = writeln!(self.out, "    {reason}");
                if report.not_run > 0 {
                    let _ = writeln!(self.out, "    run aborted, {} test(s) skipped", report.not_run);
                }
            }
        }

        let summary = RunSummary::from_report(report);
        let code = if report.is_success() { "1;32" } else { "1;31" };
        let line = format!(
            "====== {} in {:.2}s ======",
            summary.describe(),
            report.duration.as_secs_f64()
        );
        let _ = writeln!(self.out);
        let _ = writeln!(self.out, "{}", self.paint(code, &line));
        let _ = self.out.flush();
    }
}
