//! Session timing and matching configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::channel::{
    DEFAULT_PAGER_PATTERNS, DEFAULT_PROMPT_PATTERN, IdleTimeoutReader, PagerHandler,
    PromptDetector, PromptReader, Segment, Segmenter,
};
use crate::error::{Result, SessionError};
use crate::transport::Transport;

/// How the end of a command's output is recognized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Completion {
    /// Quiet for the idle timeout.
    #[default]
    Idle,
    /// The prompt reappears.
    Prompt,
}

impl FromStr for Completion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "prompt" => Ok(Self::Prompt),
            other => Err(format!(
                "unknown completion mode '{other}' (expected idle or prompt)"
            )),
        }
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Idle => f.write_str("idle"),
            Completion::Prompt => f.write_str("prompt"),
        }
    }
}

/// Tunables for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Quiet period after which a command is considered finished.
    pub idle_timeout: Duration,

    /// How long to wait for the first prompt after login.
    pub startup_timeout: Duration,

    /// Hard upper bound on reading one command's output.
    pub command_ceiling: Duration,

    /// Longest single wait on the transport.
    pub poll_interval: Duration,

    /// Pause after sending a command before reading.
    pub command_delay: Duration,

    /// Patterns recognizing the shell prompt at end of output.
    pub prompt_patterns: Vec<String>,

    /// Literal pager markers answered with a space. Empty disables paging.
    pub pager_patterns: Vec<String>,

    /// Bytes from the end of the buffer searched for prompts and markers.
    pub search_depth: usize,

    /// Remove the echoed command line from captured output.
    pub trim_echo: bool,

    /// Remove a trailing prompt line from captured output.
    pub trim_prompt: bool,

    /// Appended to every command.
    pub line_ending: String,

    pub completion: Completion,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(3),
            startup_timeout: Duration::from_secs(10),
            command_ceiling: Duration::from_secs(120),
            poll_interval: Duration::from_millis(100),
            command_delay: Duration::from_millis(200),
            prompt_patterns: vec![DEFAULT_PROMPT_PATTERN.to_string()],
            pager_patterns: DEFAULT_PAGER_PATTERNS.iter().map(|p| p.to_string()).collect(),
            search_depth: 1000,
            trim_echo: true,
            trim_prompt: true,
            line_ending: "\n".to_string(),
            completion: Completion::default(),
        }
    }
}

impl SessionConfig {
    /// Check ranges and compile patterns.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("idle_timeout", self.idle_timeout),
            ("startup_timeout", self.startup_timeout),
            ("command_ceiling", self.command_ceiling),
            ("poll_interval", self.poll_interval),
        ];
        for (name, value) in positive {
            if value.is_zero() {
                return Err(invalid(format!("{name} must be greater than zero")));
            }
        }

        if self.completion == Completion::Idle && self.command_ceiling < self.idle_timeout {
            return Err(invalid(format!(
                "command_ceiling ({:?}) must not be shorter than idle_timeout ({:?})",
                self.command_ceiling, self.idle_timeout
            )));
        }

        if self.search_depth == 0 {
            return Err(invalid("search_depth must be greater than zero".to_string()));
        }

        self.prompt_detector()?;
        Ok(())
    }

    /// Detector for the configured prompt patterns.
    pub fn prompt_detector(&self) -> Result<PromptDetector> {
        if self.prompt_patterns.is_empty() {
            return Err(invalid("at least one prompt pattern is required".to_string()));
        }
        PromptDetector::new(&self.prompt_patterns)
            .map_err(|e| invalid(format!("invalid prompt pattern: {e}")))
    }

    pub fn pager(&self) -> PagerHandler {
        PagerHandler::new(&self.pager_patterns)
    }

    /// The segmenter selected by [`completion`](Self::completion).
    pub fn segmenter(&self) -> CompletionStrategy {
        match self.completion {
            Completion::Idle => CompletionStrategy::Idle(
                IdleTimeoutReader::new(self.idle_timeout, self.command_ceiling)
                    .with_poll_interval(self.poll_interval)
                    .with_search_depth(self.search_depth)
                    .with_pager(self.pager()),
            ),
            Completion::Prompt => CompletionStrategy::Prompt(
                PromptReader::new(self.command_ceiling)
                    .with_poll_interval(self.poll_interval)
                    .with_search_depth(self.search_depth)
                    .with_pager(self.pager()),
            ),
        }
    }
}

fn invalid(message: String) -> crate::Error {
    SessionError::InvalidConfig { message }.into()
}

/// Runtime choice between the built-in segmenters.
#[derive(Debug, Clone)]
pub enum CompletionStrategy {
    Idle(IdleTimeoutReader),
    Prompt(PromptReader),
}

impl Segmenter for CompletionStrategy {
    async fn next_segment<T: Transport>(
        &self,
        transport: &mut T,
        prompt: &PromptDetector,
    ) -> Result<Segment> {
        match self {
            CompletionStrategy::Idle(reader) => reader.next_segment(transport, prompt).await,
            CompletionStrategy::Prompt(reader) => reader.next_segment(transport, prompt).await,
        }
    }
}
