//! Suite manifests.
//!
//! A manifest is a TOML file listing the suites to run and, optionally, how to reach the target:
//!
//! ```toml
//! [connection]
//! port = 4444
//!
//! [[suite]]
//! namespace = "Allocations"
//! tests = [
//!     { name = "Physical memory allocator", command = "kfuzz 100000 32000" },
//!     { name = "Virtual memory allocator", command = "vfuzz 100000 64000" },
//! ]
//! ```
//!
//! Parsing keeps the byte span of every namespace, test name and command so that validation errors point at the
//! offending text when rendered through `miette`.
//!
//! ## Errors
//!
//! - [`ManifestError::Io`] when the file cannot be read.
//! - [`ManifestError::Syntax`] for TOML errors and unknown keys.
//! - [`ManifestError::Invalid`] for well-formed manifests that cannot be run.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::Deserialize;
use thiserror::Error;
use toml::Spanned;
use wirecheck_proto::Delimiter;

use crate::suite::{TestCase, TestPlan, TestSuite};

#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    #[error("cannot read manifest {}: {source}", path.display())]
    #[diagnostic(code(wirecheck::manifest::io))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid manifest: {message}")]
    #[diagnostic(code(wirecheck::manifest::syntax))]
    Syntax {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    #[error("{message}")]
    #[diagnostic(code(wirecheck::manifest::invalid))]
    Invalid {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
        #[help]
        help: Option<String>,
    },
}

/// Optional `[connection]` table. Unset keys fall back to the harness defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub timeout_secs: Option<u64>,
    /// Escaped form, e.g. `"\r\n"` or `'\x00'`.
    pub delimiter: Option<String>,
    pub quit_command: Option<String>,
    pub max_frame_len: Option<usize>,
}

/// One `[[suite]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteSection {
    pub namespace: Spanned<String>,
    #[serde(default)]
    pub tests: Vec<TestSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestSection {
    pub name: Spanned<String>,
    pub command: Spanned<String>,
}

#[derive(Debug, Clone, Default)]
struct Origin {
    name: String,
    source: String,
}

/// A parsed, not yet validated manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub connection: ConnectionSection,
    #[serde(rename = "suite", default)]
    pub suites: Vec<SuiteSection>,
    #[serde(skip)]
    origin: Origin,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let source = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = Self::parse(source, &path.display().to_string())?;
        tracing::debug!(path = %path.display(), suites = manifest.suites.len(), "manifest loaded");
        Ok(manifest)
    }

    /// Parse manifest text. `name` is only used to label diagnostics.
    pub fn parse(source: impl Into<String>, name: &str) -> Result<Self, ManifestError> {
        let source = source.into();
        let mut manifest: Manifest = match toml::from_str(&source) {
            Ok(manifest) => manifest,
            Err(err) => {
                return Err(ManifestError::Syntax {
                    message: err.message().to_string(),
                    span: err.span().map(SourceSpan::from),
                    src: NamedSource::new(name, source),
                });
            }
        };
        manifest.origin = Origin {
            name: name.to_string(),
            source,
        };
        Ok(manifest)
    }

    /// Label used in diagnostics (usually the file path).
    pub fn name(&self) -> &str {
        &self.origin.name
    }

    /// Validate the suites and turn them into a runnable plan.
    ///
    /// `delimiter` is the one the run will use; commands must not contain it.
    pub fn to_plan(&self, delimiter: &Delimiter) -> Result<TestPlan, ManifestError> {
        if self.suites.is_empty() {
            return Err(self.invalid(
                "manifest defines no suites",
                0..0,
                Some("add at least one [[suite]] table with a namespace and tests"),
            ));
        }

        let mut plan = TestPlan::new();
        for section in &self.suites {
            let namespace = section.namespace.get_ref();
            if namespace.trim().is_empty() {
                return Err(self.invalid("namespace must not be empty", section.namespace.span(), None));
            }
            if section.tests.is_empty() {
                return Err(self.invalid(
                    format!("suite \"{namespace}\" has no tests"),
                    section.namespace.span(),
                    Some("list tests as `tests = [{ name = \"...\", command = \"...\" }]`"),
                ));
            }

            let mut seen: HashMap<&str, Range<usize>> = HashMap::new();
            let mut suite = TestSuite::new(namespace.as_str());
            for test in &section.tests {
                let name = test.name.get_ref();
                let command = test.command.get_ref();

                if name.trim().is_empty() {
                    return Err(self.invalid("test name must not be empty", test.name.span(), None));
                }
                if let Some(first) = seen.insert(name.as_str(), test.name.span()) {
                    let line = self.origin.source[..first.start].lines().count().max(1);
                    return Err(self.invalid(
                        format!("duplicate test \"{name}\" in suite \"{namespace}\""),
                        test.name.span(),
                        Some(&format!("first defined on line {line}")),
                    ));
                }
                if command.is_empty() {
                    return Err(self.invalid(
                        format!("test \"{name}\" has an empty command"),
                        test.command.span(),
                        None,
                    ));
                }
                if delimiter.find_in(command.as_bytes()).is_some() {
                    return Err(self.invalid(
                        format!("command of test \"{name}\" contains the frame delimiter `{delimiter}`"),
                        test.command.span(),
                        Some("the delimiter terminates the command on the wire; split it into separate tests"),
                    ));
                }
                suite.add(TestCase::new(name.as_str(), command.as_str()));
            }
            plan.push(suite);
        }
        Ok(plan)
    }

    fn invalid(&self, message: impl Into<String>, span: Range<usize>, help: Option<&str>) -> ManifestError {
        ManifestError::Invalid {
            message: message.into(),
            src: NamedSource::new(&self.origin.name, self.origin.source.clone()),
            span: span.into(),
            help: help.map(str::to_string),
        }
    }
}
