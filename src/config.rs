//! Harness configuration.
//!
//! Settings are resolved in layers, later layers winning:
//!
//! 1. built-in defaults (`localhost:4444`, 60 s timeout, `\n` delimiter, `quit`),
//! 2. the manifest's `[connection]` table,
//! 3. `WIRECHECK_*` environment variables,
//! 4. command-line flags.
//!
//! Layers 3 and 4 both arrive through clap (`#[arg(env = ...)]`), so this module only needs to know about defaults,
//! the manifest section and explicit overrides.
//!
//! ## Errors
//!
//! [`HarnessConfig::validate`] rejects combinations that cannot work on the wire, such as a quit command containing
//! the delimiter.

use std::time::Duration;

use thiserror::Error;
use wirecheck_proto::{Delimiter, FrameBuffer, ProtoError};

use crate::manifest::ConnectionSection;
use crate::runner::DEFAULT_QUIT_COMMAND;
use crate::transport::{ConnectOptions, DEFAULT_READ_CHUNK, DEFAULT_TIMEOUT};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 4444;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid delimiter: {0}")]
    Delimiter(#[from] ProtoError),

    #[error("host must not be empty")]
    EmptyHost,

    #[error("port must be between 1 and 65535")]
    InvalidPort,

    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error("quit command must not be empty")]
    EmptyQuitCommand,

    #[error("quit command {command:?} contains the delimiter {delimiter}")]
    QuitCommandContainsDelimiter { command: String, delimiter: Delimiter },
}

/// Fully resolved harness settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
    pub delimiter: Delimiter,
    pub quit_command: String,
    /// `None` disables the frame length limit.
    pub max_frame_len: Option<usize>,
    pub read_chunk: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            delimiter: Delimiter::default(),
            quit_command: DEFAULT_QUIT_COMMAND.to_string(),
            max_frame_len: Some(FrameBuffer::DEFAULT_MAX_FRAME_LEN),
            read_chunk: DEFAULT_READ_CHUNK,
        }
    }
}

impl HarnessConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_quit_command(mut self, command: impl Into<String>) -> Self {
        self.quit_command = command.into();
        self
    }

    pub fn with_max_frame_len(mut self, limit: Option<usize>) -> Self {
        self.max_frame_len = limit;
        self
    }

    /// Overlay the values set in a manifest's `[connection]` table.
    ///
    /// `max_frame_len = 0` in the manifest lifts the limit.
    ///
    /// ## Errors
    /// - [`ConfigError::Delimiter`] if the delimiter string is empty or holds a bad escape.
    pub fn apply_connection(mut self, section: &ConnectionSection) -> Result<Self, ConfigError> {
        if let Some(host) = &section.host {
            self.host = host.clone();
        }
        if let Some(port) = section.port {
            self.port = port;
        }
        if let Some(secs) = section.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(delimiter) = &section.delimiter {
            self.delimiter = Delimiter::parse_escaped(delimiter)?;
        }
        if let Some(command) = &section.quit_command {
            self.quit_command = command.clone();
        }
        if let Some(limit) = section.max_frame_len {
            self.max_frame_len = (limit > 0).then_some(limit);
        }
        Ok(self)
    }

    /// `host:port`, as passed to the resolver.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            timeout: self.timeout,
            delimiter: self.delimiter.clone(),
            max_frame_len: self.max_frame_len,
            read_chunk: self.read_chunk,
        }
    }

    /// Check that the settings can be used for a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.quit_command.is_empty() {
            return Err(ConfigError::EmptyQuitCommand);
        }
        if self.delimiter.find_in(self.quit_command.as_bytes()).is_some() {
            return Err(ConfigError::QuitCommandContainsDelimiter {
                command: self.quit_command.clone(),
                delimiter: self.delimiter.clone(),
            });
        }
        Ok(())
    }
}
