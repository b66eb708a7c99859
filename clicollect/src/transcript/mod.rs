//! The ordered record of one session's commands and their output.

mod format;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Local};
use log::info;

use crate::driver::CapturedOutput;
use crate::error::{Error, Result, TranscriptError};

/// Commands run in one session, in order, with their captured output.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    host: Option<String>,
    username: Option<String>,
    started_at: Option<DateTime<Local>>,
    finished_at: Option<DateTime<Local>>,
    banner: String,
    entries: Vec<CapturedOutput>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record where the session connected, for the header line.
    pub fn set_connection(&mut self, host: impl Into<String>, username: impl Into<String>) {
        self.host = Some(host.into());
        self.username = Some(username.into());
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Output received before the first prompt.
    pub fn banner(&self) -> &str {
        &self.banner
    }

    pub fn set_banner(&mut self, banner: impl Into<String>) {
        self.banner = banner.into();
    }

    pub fn started_at(&self) -> Option<&DateTime<Local>> {
        self.started_at.as_ref()
    }

    pub fn finished_at(&self) -> Option<&DateTime<Local>> {
        self.finished_at.as_ref()
    }

    pub(crate) fn mark_started(&mut self) {
        self.started_at = Some(Local::now());
    }

    pub(crate) fn mark_finished(&mut self) {
        self.finished_at = Some(Local::now());
    }

    pub fn push(&mut self, entry: CapturedOutput) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[CapturedOutput] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of commands whose output hit the ceiling.
    pub fn timed_out(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_complete()).count()
    }

    /// `(command, text)` pairs in run order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.command.as_str(), e.text.as_str()))
    }

    /// Serialize to any writer.
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        format::write_transcript(self, out)
    }

    /// Serialize to a string.
    pub fn render(&self) -> String {
        let mut out = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut out);
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Write the transcript to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let write_error = |source| TranscriptError::Write {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(write_error)?;
        let mut out = BufWriter::new(file);
        self.write_to(&mut out).map_err(write_error)?;
        out.flush().map_err(write_error)?;

        info!(
            "Transcript with {} entries written to {}",
            self.len(),
            path.display()
        );
        Ok(())
    }

    /// Rebuild a transcript from its serialized form.
    pub fn parse(input: &str) -> Result<Self> {
        format::parse_transcript(input)
    }
}

impl FromStr for Transcript {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
