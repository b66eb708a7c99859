//! Error types for clicollect.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for clicollect operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel reading errors (prompt detection, segmentation)
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Session driver errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Transcript serialization errors
    #[error("Transcript error: {0}")]
    Transcript(#[from] TranscriptError),

    /// Configuration and input errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Coarse classification used by callers to decide how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Authentication, network, or prompt failures. Fatal to the run.
    Connection,
    /// A single command failed. Recorded inline, never fatal.
    Command,
    /// The transcript could not be written.
    Write,
    /// Bad configuration or input files.
    Config,
    /// The run was cancelled by the user.
    Interrupted,
}

impl Error {
    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Transport(_) => ErrorCategory::Connection,
            Error::Channel(ChannelError::CommandTimeout { .. }) => ErrorCategory::Command,
            Error::Channel(ChannelError::PromptNotDetected { .. }) => ErrorCategory::Connection,
            Error::Session(SessionError::Interrupted) => ErrorCategory::Interrupted,
            Error::Session(SessionError::InvalidConfig { .. }) => ErrorCategory::Config,
            Error::Session(_) => ErrorCategory::Connection,
            Error::Transcript(_) => ErrorCategory::Write,
            Error::Config(_) => ErrorCategory::Config,
        }
    }

    /// True if this error should abort the whole run.
    pub fn is_fatal(&self) -> bool {
        self.category() != ErrorCategory::Command
    }
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key not present in known_hosts (strict mode)
    #[error("Host key for {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Failed to open the PTY shell channel
    #[error("Failed to open shell channel: {0}")]
    ShellRequestFailed(String),

    /// Operation attempted on a transport that is not open
    #[error("Transport not open")]
    NotOpen,

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Channel layer errors (prompt detection and output segmentation).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// No recognizable prompt within the startup window
    #[error("No prompt detected within {waited:?} ({received} bytes received)")]
    PromptNotDetected { waited: Duration, received: usize },

    /// Per-command ceiling exceeded while output was still arriving
    #[error("Command output not complete after {ceiling:?}")]
    CommandTimeout {
        ceiling: Duration,
        /// Output collected before the ceiling fired.
        partial: Vec<u8>,
    },
}

/// Session driver errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Driver not connected
    #[error("Session not open - call open() first")]
    NotOpen,

    /// Driver already connected
    #[error("Session already open")]
    AlreadyOpen,

    /// Invalid configuration in the session builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Run cancelled by the user
    #[error("Interrupted")]
    Interrupted,
}

/// Transcript writer/parser errors.
#[derive(Error, Debug)]
pub enum TranscriptError {
    /// Destination could not be written
    #[error("Failed to write transcript to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Serialized transcript is malformed
    #[error("Malformed transcript at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Configuration and input file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Commands file could not be read
    #[error("Cannot read commands file {path}: {source}")]
    CommandsFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file could not be read
    #[error("Cannot read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value is outside its allowed range
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias using clicollect's Error.
pub type Result<T> = std::result::Result<T, Error>;
