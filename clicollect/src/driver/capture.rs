//! Captured command output.

use std::time::Duration;

use memchr::memrchr;

use crate::channel::PromptDetector;

/// Whether a command's output was collected in full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    /// Output ended normally.
    Complete,
    /// The per-command ceiling fired; the text is partial.
    TimedOut { ceiling: Duration },
}

/// Output captured for one command.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    /// The command that was sent.
    pub command: String,

    /// The output (normalized - command echo and trailing prompt removed).
    pub text: String,

    /// The output before normalization.
    pub raw: String,

    pub status: CaptureStatus,

    /// Time from sending the command to finalizing its output.
    pub elapsed: Duration,
}

impl CapturedOutput {
    pub fn complete(
        command: impl Into<String>,
        text: impl Into<String>,
        raw: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            text: text.into(),
            raw: raw.into(),
            status: CaptureStatus::Complete,
            elapsed,
        }
    }

    pub fn timed_out(
        command: impl Into<String>,
        text: impl Into<String>,
        raw: impl Into<String>,
        elapsed: Duration,
        ceiling: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            text: text.into(),
            raw: raw.into(),
            status: CaptureStatus::TimedOut { ceiling },
            elapsed,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == CaptureStatus::Complete
    }

    /// Number of characters in the normalized text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

impl std::fmt::Display for CapturedOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Cleans raw segment text into what a reader expects to see.
#[derive(Debug, Clone, Copy)]
pub struct OutputNormalizer {
    pub trim_echo: bool,
    pub trim_prompt: bool,
}

impl OutputNormalizer {
    /// Normalize line endings, then optionally drop the echoed command and
    /// a trailing prompt line.
    pub fn normalize(&self, raw: &str, command: &str, prompt: &PromptDetector) -> String {
        let mut text = raw.replace("\r\n", "\n").replace('\r', "");

        if self.trim_echo {
            let command = command.trim();
            let first_line_end = text.find('\n');
            let first_line = first_line_end.map_or(text.as_str(), |i| &text[..i]);
            if !command.is_empty() && first_line.trim_end().ends_with(command) {
                text = first_line_end.map_or_else(String::new, |i| text[i + 1..].to_string());
            }
        }

        if self.trim_prompt {
            let last_line_start = memrchr(b'\n', text.as_bytes()).map_or(0, |i| i + 1);
            let last_line = &text[last_line_start..];
            if !last_line.trim().is_empty() && prompt.is_ready(last_line.as_bytes()) {
                text.truncate(last_line_start.saturating_sub(1));
            }
        }

        text
    }
}

impl Default for OutputNormalizer {
    fn default() -> Self {
        Self {
            trim_echo: true,
            trim_prompt: true,
        }
    }
}
