//! Flat-text transcript format.
//!
//! ```text
//! -- Session start: 2026-01-01 10:00:00 --
//! Connected to 192.0.2.1 as admin
//!
//! --- Initial banner ---
//! FG100 #
//! --- End banner ---
//!
//! === Command: get system status ===
//! Version: FortiGate-100F
//! === End of command: get system status ===
//!
//! -- Session end: 2026-01-01 10:00:04 --
//! ```
//!
//! Every body is followed by exactly one newline before its closing marker,
//! and the parser removes exactly one, so bodies survive a round trip byte
//! for byte. A timed-out command carries an `[ERROR]` line just above its
//! closing marker.
//!
//! Body and banner lines that could be read as a marker (`=== `, `--- `, an
//! `[ERROR]` timeout line) or that start with the escape character get a
//! leading `\`, which the parser removes.

use std::io::{self, Write};
use std::time::Duration;

use chrono::{DateTime, Local};

use super::Transcript;
use crate::driver::{CaptureStatus, CapturedOutput};
use crate::error::{Result, TranscriptError};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SESSION_START: &str = "-- Session start: ";
const SESSION_END: &str = "-- Session end: ";
const SESSION_SUFFIX: &str = " --";
const CONNECTED_PREFIX: &str = "Connected to ";
const CONNECTED_SEPARATOR: &str = " as ";
const BANNER_START: &str = "--- Initial banner ---";
const BANNER_END: &str = "--- End banner ---";
const COMMAND_PREFIX: &str = "=== Command: ";
const COMMAND_END_PREFIX: &str = "=== End of command: ";
const MARKER_SUFFIX: &str = " ===";
const TIMEOUT_PREFIX: &str = "[ERROR] command timed out after ";
const TIMEOUT_SUFFIX: &str = " seconds";
const ESCAPE: char = '\\';

/// Prefixes that make a body line look like format structure.
const RESERVED_PREFIXES: &[&str] = &["=== ", "--- ", TIMEOUT_PREFIX];

fn needs_escape(line: &str) -> bool {
    line.starts_with(ESCAPE) || RESERVED_PREFIXES.iter().any(|p| line.starts_with(p))
}

/// Write `text` one line at a time, escaping lines that look like markers.
fn write_body<W: Write>(text: &str, out: &mut W) -> io::Result<()> {
    for line in text.split('\n') {
        if needs_escape(line) {
            writeln!(out, "{ESCAPE}{line}")?;
        } else {
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

fn read_body(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|line| line.strip_prefix(ESCAPE).unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn timestamp(at: Option<&DateTime<Local>>) -> String {
    at.copied()
        .unwrap_or_else(Local::now)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

fn timeout_line(ceiling: Duration) -> String {
    format!("{TIMEOUT_PREFIX}{}{TIMEOUT_SUFFIX}", ceiling.as_secs_f64())
}

fn parse_timeout_line(line: &str) -> Option<Duration> {
    let secs: f64 = line
        .strip_prefix(TIMEOUT_PREFIX)?
        .strip_suffix(TIMEOUT_SUFFIX)?
        .parse()
        .ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
}

fn strip_marker<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.strip_prefix(prefix)?.strip_suffix(MARKER_SUFFIX)
}

/// Serialize `transcript` to `out`.
pub(super) fn write_transcript<W: Write>(transcript: &Transcript, out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "{SESSION_START}{}{SESSION_SUFFIX}",
        timestamp(transcript.started_at())
    )?;
    if let (Some(host), Some(user)) = (transcript.host(), transcript.username()) {
        writeln!(out, "{CONNECTED_PREFIX}{host}{CONNECTED_SEPARATOR}{user}")?;
    }
    writeln!(out)?;

    if !transcript.banner().trim().is_empty() {
        writeln!(out, "{BANNER_START}")?;
        write_body(transcript.banner(), out)?;
        writeln!(out, "{BANNER_END}")?;
        writeln!(out)?;
    }

    for entry in transcript.entries() {
        write_entry(entry, out)?;
    }

    writeln!(
        out,
        "{SESSION_END}{}{SESSION_SUFFIX}",
        timestamp(transcript.finished_at())
    )?;
    Ok(())
}

fn write_entry<W: Write>(entry: &CapturedOutput, out: &mut W) -> io::Result<()> {
    writeln!(out, "{COMMAND_PREFIX}{}{MARKER_SUFFIX}", entry.command)?;
    write_body(&entry.text, out)?;
    if let CaptureStatus::TimedOut { ceiling } = entry.status {
        writeln!(out, "{}", timeout_line(ceiling))?;
    }
    writeln!(out, "{COMMAND_END_PREFIX}{}{MARKER_SUFFIX}", entry.command)?;
    writeln!(out)?;
    Ok(())
}

/// Rebuild a transcript from its serialized form.
///
/// Timestamps are informational and not restored.
pub(super) fn parse_transcript(input: &str) -> Result<Transcript> {
    let lines: Vec<&str> = input.split('\n').collect();
    let mut transcript = Transcript::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if let Some(rest) = line.strip_prefix(CONNECTED_PREFIX) {
            if let Some((host, user)) = rest.rsplit_once(CONNECTED_SEPARATOR) {
                transcript.set_connection(host, user);
            }
            i += 1;
        } else if line == BANNER_START {
            let end = find_line(&lines, i + 1, BANNER_END).ok_or_else(|| TranscriptError::Parse {
                line: i + 1,
                message: "banner is not terminated".to_string(),
            })?;
            transcript.set_banner(read_body(&lines[i + 1..end]));
            i = end + 1;
        } else if let Some(command) = strip_marker(line, COMMAND_PREFIX) {
            let closing = format!("{COMMAND_END_PREFIX}{command}{MARKER_SUFFIX}");
            let end = find_line(&lines, i + 1, &closing).ok_or_else(|| TranscriptError::Parse {
                line: i + 1,
                message: format!("output of '{command}' is not terminated"),
            })?;

            let mut body = &lines[i + 1..end];
            let mut status = CaptureStatus::Complete;
            if let Some((last, rest)) = body.split_last() {
                if let Some(ceiling) = parse_timeout_line(last) {
                    status = CaptureStatus::TimedOut { ceiling };
                    body = rest;
                }
            }

            let text = read_body(body);
            let entry = match status {
                CaptureStatus::Complete => {
                    CapturedOutput::complete(command, text.clone(), text, Duration::ZERO)
                }
                CaptureStatus::TimedOut { ceiling } => CapturedOutput::timed_out(
                    command,
                    text.clone(),
                    text,
                    Duration::ZERO,
                    ceiling,
                ),
            };
            transcript.push(entry);
            i = end + 1;
        } else {
            i += 1;
        }
    }

    Ok(transcript)
}

fn find_line(lines: &[&str], from: usize, wanted: &str) -> Option<usize> {
    lines
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, l)| **l == wanted)
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_line() {
        let line = timeout_line(Duration::from_secs(120));
        assert_eq!(line, "[ERROR] command timed out after 120 seconds");
        assert_eq!(parse_timeout_line(&line), Some(Duration::from_secs(120)));

        let line = timeout_line(Duration::from_millis(2500));
        assert_eq!(parse_timeout_line(&line), Some(Duration::from_millis(2500)));

        assert_eq!(parse_timeout_line("[ERROR] something else"), None);
    }

    #[test]
    fn test_unterminated_block() {
        let err = parse_transcript("=== Command: show ===\nout\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_ignores_unknown_lines() {
        let input = "garbage\n\n=== Command: a ===\nx\n=== End of command: a ===\n";
        let transcript = parse_transcript(input).unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.entries()[0].text, "x");
    }
}
