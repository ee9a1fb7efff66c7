#![forbid(unsafe_code)]
//! wirecheck: a protocol-driven test harness.
//!
//! The harness connects to a long-running target process over TCP, sends it one command per test and reads back
//! delimited JSON envelopes until the target reports `Success` or `Error`. Suites run in order over a single
//! connection and the first failure aborts the run.
//!
//! ## Layout
//!
//! - [`transport`] - TCP connection, framing of outgoing messages, timed reads into a frame buffer
//! - [`runner`] - per-test state machine and the fail-fast plan loop
//! - [`suite`] - test cases, suites and plans
//! - [`manifest`] / [`config`] - TOML suite manifests and layered settings
//! - [`reporter`] - console output of a run
//! - [`cli`] - the `wirecheck` binary
//!
//! Framing and envelope decoding live in the IO-free [`wirecheck_proto`] crate, re-exported as [`proto`].
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod config;
pub mod logging;
pub mod manifest;
pub mod reporter;
pub mod runner;
pub mod suite;
pub mod transport;
pub mod version;

pub use wirecheck_proto as proto;

pub use config::{ConfigError, HarnessConfig};
pub use manifest::{Manifest, ManifestError};
pub use reporter::{ConsoleReporter, NullReporter, Reporter};
pub use runner::{FailureReason, RunReport, Runner, TestRun, Verdict};
pub use suite::{TestCase, TestPlan, TestSuite};
pub use transport::{ConnectOptions, Connection, Transport, TransportError};
