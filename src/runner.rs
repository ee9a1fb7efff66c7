//! Sequential, fail-fast test runner.
//!
//! Each test walks the same small state machine:
//!
//! ```text
//! Sent ──▶ Awaiting ──▶ Passed
//!            │  ▲  └──▶ Failed
//!            └──┘ (Info / raw text)
//! ```
//!
//! The command is sent, then frames are received and decoded until a terminal envelope arrives. `Info` frames and
//! plain text are logged and the runner keeps waiting. Any transport fault fails the test.
//!
//! The first failed test aborts the whole plan: the quit command is sent to the target and no further test is
//! attempted. The runner never exits the process itself; the CLI turns the returned [`RunReport`] into an exit code.

use std::fmt;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::Instrument;
use wirecheck_proto::{Envelope, OutcomeKind, render_value};

use crate::logging::LogScope;
use crate::reporter::Reporter;
use crate::suite::{TestCase, TestPlan, TestSuite};
use crate::transport::{Transport, TransportError};

/// Command sent to the target when a run is aborted.
pub const DEFAULT_QUIT_COMMAND: &str = "quit";

/// Why a test failed.
#[derive(Debug)]
pub enum FailureReason {
    /// The target answered with an `Error` envelope.
    Reported {
        message: Option<String>,
        detail: Option<Value>,
    },
    /// The command could not be sent.
    Send(TransportError),
    /// No terminal envelope could be received.
    Receive(TransportError),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Reported { message, detail } => {
                let detail = detail.as_ref().map(render_value).unwrap_or_else(|| "null".to_string());
                write!(
                    f,
                    "{} (data: {})",
                    message.as_deref().unwrap_or("no error message"),
                    detail
                )
            }
            FailureReason::Send(err) => write!(f, "failed to send command: {err}"),
            FailureReason::Receive(err) => write!(f, "failed to receive data: {err}"),
        }
    }
}

/// Final state of one test.
#[derive(Debug)]
pub enum Verdict {
    Passed,
    Failed(FailureReason),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Passed)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Verdict::Failed(_))
    }
}

/// What the runner does after decoding one frame.
#[derive(Debug)]
pub enum Step {
    /// Stay in `Awaiting` and receive the next frame.
    Await,
    /// Terminal envelope: the test is over.
    Finish(Verdict),
}

/// Apply one decoded envelope to a test in the `Awaiting` state, logging it on the way.
pub fn step(envelope: Envelope) -> Step {
    match envelope {
        Envelope::Outcome(outcome) => match outcome.kind {
            OutcomeKind::Success => {
                tracing::info!("Test OK");
                Step::Finish(Verdict::Passed)
            }
            OutcomeKind::Error => {
                let reason = FailureReason::Reported {
                    message: outcome.message,
                    detail: outcome.detail,
                };
                tracing::error!("Test KO: {reason}");
                Step::Finish(Verdict::Failed(reason))
            }
        },
        Envelope::Progress { message } => {
            tracing::info!("{message}");
            Step::Await
        }
        Envelope::Raw { text } => {
            tracing::info!("{text}");
            Step::Await
        }
    }
}

/// Record of one executed test.
#[derive(Debug)]
pub struct TestRun {
    pub namespace: String,
    pub test: TestCase,
    pub verdict: Verdict,
    /// Frames received while the test was awaiting its outcome.
    pub frames: usize,
    pub duration: Duration,
}

/// Result of running a plan.
#[derive(Debug)]
pub struct RunReport {
    /// Executed tests, in order. Only the last one can have failed.
    pub runs: Vec<TestRun>,
    /// Tests never attempted because the run was aborted.
    pub not_run: usize,
    /// Whether the quit command reached the target after a failure.
    pub quit_sent: bool,
    pub duration: Duration,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.runs.iter().filter(|r| r.verdict.is_pass()).count()
    }

    pub fn failed(&self) -> usize {
        self.runs.iter().filter(|r| r.verdict.is_fail()).count()
    }

    /// `true` when every test of the plan ran and passed.
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.not_run == 0
    }

    /// The test that aborted the run, if any.
    pub fn failure(&self) -> Option<&TestRun> {
        self.runs.iter().find(|r| r.verdict.is_fail())
    }
}

/// Drives a [`TestPlan`] over one transport.
pub struct Runner<T> {
    transport: T,
    quit_command: String,
}

impl<T: Transport> Runner<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            quit_command: DEFAULT_QUIT_COMMAND.to_string(),
        }
    }

    /// Set the command sent to the target when a test fails.
    pub fn with_quit_command(mut self, command: impl Into<String>) -> Self {
        self.quit_command = command.into();
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Run every suite in order, stopping at the first failure.
    pub async fn run_plan(&mut self, plan: &TestPlan, reporter: &mut dyn Reporter) -> RunReport {
        let started = Instant::now();
        let total = plan.test_count();
        let mut runs = Vec::with_capacity(total);
        let mut quit_sent = false;

        'suites: for suite in plan.suites() {
            let scope = LogScope::namespace(suite.namespace());
            scope.in_scope(|| tracing::info!("namespace \"{}\" initialized..", suite.namespace()));
            reporter.on_suite_start(suite);

            for test in suite.tests() {
                let run = self.run_test(&scope, suite, test, reporter).await;
                let failed = run.verdict.is_fail();
                runs.push(run);

                if failed {
                    quit_sent = self.quit(&scope).await;
                    break 'suites;
                }
            }
        }

        let report = RunReport {
            not_run: total - runs.len(),
            runs,
            quit_sent,
            duration: started.elapsed(),
        };
        reporter.on_run_complete(&report);
        report
    }

    /// Run a single suite. Equivalent to a plan holding only `suite`.
    pub async fn run_suite(&mut self, suite: &TestSuite, reporter: &mut dyn Reporter) -> RunReport {
        let plan = TestPlan::new().with_suite(suite.clone());
        self.run_plan(&plan, reporter).await
    }

    async fn run_test(
        &mut self,
        scope: &LogScope,
        suite: &TestSuite,
        test: &TestCase,
        reporter: &mut dyn Reporter,
    ) -> TestRun {
        scope.in_scope(|| tracing::info!("Running {} (command: \"{}\")", test.name(), test.command()));
        reporter.on_test_start(suite, test);

        let started = Instant::now();
        let test_scope = scope.test(test.name());
        let (verdict, frames) = self
            .exchange(test.command())
            .instrument(test_scope.span().clone())
            .await;

        let run = TestRun {
            namespace: suite.namespace().to_string(),
            test: test.clone(),
            verdict,
            frames,
            duration: started.elapsed(),
        };
        reporter.on_test_complete(&run);
        run
    }

    /// `Sent` then `Awaiting` until a terminal envelope or a transport fault.
    async fn exchange(&mut self, command: &str) -> (Verdict, usize) {
        if let Err(err) = self.transport.send(command.as_bytes()).await {
            tracing::error!(error = %err, "Failed to send command, exiting...");
            return (Verdict::Failed(FailureReason::Send(err)), 0);
        }

        let mut frames = 0;
        loop {
            let frame = match self.transport.receive_frame().await {
                Ok(frame) => frame,
                Err(err) => {
                    tracing::error!(error = %err, "Failed to receive data, exiting...");
                    return (Verdict::Failed(FailureReason::Receive(err)), frames);
                }
            };
            frames += 1;

            if let Step::Finish(verdict) = step(Envelope::decode(frame.as_bytes())) {
                return (verdict, frames);
            }
        }
    }

    /// Tell the target to quit. Returns whether the command was written.
    async fn quit(&mut self, scope: &LogScope) -> bool {
        match self.transport.send(self.quit_command.as_bytes()).await {
            Ok(()) => {
                scope.in_scope(|| tracing::debug!(command = %self.quit_command, "quit command sent"));
                true
            }
            Err(err) => {
                scope.in_scope(|| tracing::warn!(error = %err, "could not send quit command"));
                false
            }
        }
    }
}
