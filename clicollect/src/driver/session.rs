//! Session driver: one shell, commands in order, one output per command.

use std::fmt;

use log::{debug, info, trace, warn};
use tokio::time::Instant;

use super::capture::{CapturedOutput, OutputNormalizer};
use super::config::{CompletionStrategy, SessionConfig};
use crate::channel::{CaptureBuffer, PagerHandler, PromptDetector, Segmenter};
use crate::error::{ChannelError, Error, Result, SessionError};
use crate::transcript::Transcript;
use crate::transport::Transport;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    AwaitingPrompt,
    Ready,
    SendingCommand,
    CollectingOutput,
    Closing,
    Closed,
    /// A connection-level failure. Only `close()` leaves this state.
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Connecting => "connecting",
            SessionState::AwaitingPrompt => "awaiting-prompt",
            SessionState::Ready => "ready",
            SessionState::SendingCommand => "sending-command",
            SessionState::CollectingOutput => "collecting-output",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
            SessionState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Drives a single interactive shell through a list of commands.
///
/// Commands run strictly one after another. A command that exceeds its
/// ceiling is recorded as timed out and the run moves on; transport and
/// prompt failures end the run. The transport is released by
/// [`close`](Self::close) whatever happened before.
///
/// # Example
///
/// ```no_run
/// use clicollect::SessionBuilder;
///
/// # async fn example() -> Result<(), clicollect::Error> {
/// let mut session = SessionBuilder::new("192.0.2.1")
///     .username("admin")
///     .password("secret")
///     .build()?;
///
/// let transcript = session.run(&["get system status"]).await?;
/// transcript.save("output-file.txt")?;
/// # Ok(())
/// # }
/// ```
pub struct SessionDriver<T: Transport, S: Segmenter = CompletionStrategy> {
    transport: T,
    segmenter: S,
    config: SessionConfig,
    normalizer: OutputNormalizer,
    pager: PagerHandler,

    /// Configured prompt patterns, used until the prompt is learned.
    detector: PromptDetector,

    /// Prompt used for completion and trimming.
    prompt: PromptDetector,

    state: SessionState,
    transcript: Transcript,
}

impl<T: Transport> SessionDriver<T> {
    /// Driver using the segmenter selected by `config.completion`.
    pub fn new(transport: T, config: SessionConfig) -> Result<Self> {
        let segmenter = config.segmenter();
        Self::with_segmenter(transport, config, segmenter)
    }
}

impl<T: Transport, S: Segmenter> SessionDriver<T, S> {
    /// Driver with a custom segmenter.
    pub fn with_segmenter(transport: T, config: SessionConfig, segmenter: S) -> Result<Self> {
        config.validate()?;
        let detector = config.prompt_detector()?;

        Ok(Self {
            transport,
            segmenter,
            normalizer: OutputNormalizer {
                trim_echo: config.trim_echo,
                trim_prompt: config.trim_prompt,
            },
            pager: config.pager(),
            prompt: detector.clone(),
            detector,
            config,
            state: SessionState::Closed,
            transcript: Transcript::new(),
        })
    }

    /// Record the remote host and user for the transcript header.
    pub fn with_target(mut self, host: impl Into<String>, username: impl Into<String>) -> Self {
        self.transcript.set_connection(host, username);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The prompt detector in use (learned after `open()`).
    pub fn prompt(&self) -> &PromptDetector {
        &self.prompt
    }

    /// Output received before the first prompt.
    pub fn banner(&self) -> &str {
        self.transcript.banner()
    }

    /// Commands captured so far.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Take the transcript, leaving an empty one behind.
    pub fn take_transcript(&mut self) -> Transcript {
        std::mem::take(&mut self.transcript)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!("session state: {} -> {}", self.state, state);
            self.state = state;
        }
    }

    fn fail(&mut self, error: Error) -> Error {
        self.set_state(SessionState::Error);
        error
    }

    /// Connect, wait for the first prompt and learn it.
    pub async fn open(&mut self) -> Result<()> {
        if !matches!(self.state, SessionState::Closed | SessionState::Error) {
            return Err(SessionError::AlreadyOpen.into());
        }

        self.set_state(SessionState::Connecting);
        self.transcript.mark_started();
        if let Err(e) = self.transport.open().await {
            return Err(self.fail(e));
        }

        self.set_state(SessionState::AwaitingPrompt);
        let banner = match self.await_prompt().await {
            Ok(banner) => banner,
            Err(e) => return Err(self.fail(e)),
        };

        if let Some(learned) =
            PromptDetector::learn(&banner).filter(|learned| learned.is_ready(&banner))
        {
            self.prompt = learned;
        }
        if let Some(prompt) = self.prompt.matched_prompt(&banner) {
            info!("prompt detected: {prompt}");
        }

        let banner = String::from_utf8_lossy(&banner).replace("\r\n", "\n");
        self.transcript.set_banner(banner.trim_end());
        self.set_state(SessionState::Ready);
        Ok(())
    }

    /// Read until the configured prompt shows up, returning everything read.
    async fn await_prompt(&mut self) -> Result<Vec<u8>> {
        let start = Instant::now();
        let window = self.config.startup_timeout;
        let mut buffer = CaptureBuffer::new(self.config.search_depth);

        loop {
            let waited = start.elapsed();
            if waited >= window {
                warn!(
                    "no prompt within {:?} ({} bytes received)",
                    window,
                    buffer.raw_len()
                );
                return Err(ChannelError::PromptNotDetected {
                    waited,
                    received: buffer.raw_len(),
                }
                .into());
            }

            let wait = self.config.poll_interval.min(window - waited);
            if let Some(data) = self.transport.receive(wait).await? {
                trace!("startup chunk received: {} bytes", data.len());
                buffer.extend(&data);
                if self.pager.respond(&mut buffer, &mut self.transport).await? {
                    continue;
                }
                if self.detector.is_ready(buffer.tail()) {
                    return Ok(buffer.take());
                }
            }
        }
    }

    /// Send one command and capture its output.
    ///
    /// A command that runs past the ceiling is recorded as timed out with
    /// its partial output and is not an error. Transport failures are.
    pub async fn send_command(&mut self, command: &str) -> Result<&CapturedOutput> {
        if self.state != SessionState::Ready {
            return Err(SessionError::NotOpen.into());
        }

        info!("running command: {command}");
        self.set_state(SessionState::SendingCommand);
        let sent_at = Instant::now();
        let line = format!("{command}{}", self.config.line_ending);
        if let Err(e) = self.transport.send(line.as_bytes()).await {
            return Err(self.fail(e));
        }
        if !self.config.command_delay.is_zero() {
            tokio::time::sleep(self.config.command_delay).await;
        }

        self.set_state(SessionState::CollectingOutput);
        let result = self
            .segmenter
            .next_segment(&mut self.transport, &self.prompt)
            .await;

        let output = match result {
            Ok(segment) => {
                let raw = segment.as_str_lossy().into_owned();
                let text = self.normalizer.normalize(&raw, command, &self.prompt);
                let output = CapturedOutput::complete(command, text, raw, sent_at.elapsed());
                info!(
                    "command finished in {:.1?} ({} chars)",
                    output.elapsed,
                    output.char_count()
                );
                output
            }
            Err(Error::Channel(ChannelError::CommandTimeout { ceiling, partial })) => {
                let raw = String::from_utf8_lossy(&partial).into_owned();
                let text = self.normalizer.normalize(&raw, command, &self.prompt);
                warn!(
                    "command '{command}' timed out after {ceiling:?}, keeping {} chars of output",
                    text.chars().count()
                );
                CapturedOutput::timed_out(command, text, raw, sent_at.elapsed(), ceiling)
            }
            Err(e) => return Err(self.fail(e)),
        };

        self.set_state(SessionState::Ready);
        let index = self.transcript.len();
        self.transcript.push(output);
        Ok(&self.transcript.entries()[index])
    }

    /// Run every command in order, stopping only on a connection failure.
    pub async fn run_commands<C: AsRef<str>>(&mut self, commands: &[C]) -> Result<()> {
        for (i, command) in commands.iter().enumerate() {
            debug!("command {}/{}", i + 1, commands.len());
            self.send_command(command.as_ref()).await?;
        }
        Ok(())
    }

    /// Release the transport. Safe to call from any state, any number of times.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed && !self.transport.is_open() {
            return Ok(());
        }

        self.set_state(SessionState::Closing);
        let result = self.transport.close().await;
        self.transcript.mark_finished();
        self.set_state(SessionState::Closed);
        if let Err(e) = &result {
            warn!("error while closing transport: {e}");
        }
        result
    }

    /// Open, run all commands and close.
    ///
    /// The transport is closed on every path. On failure the entries
    /// captured so far remain available through
    /// [`take_transcript`](Self::take_transcript).
    pub async fn run<C: AsRef<str>>(&mut self, commands: &[C]) -> Result<Transcript> {
        let result = match self.open().await {
            Ok(()) => self.run_commands(commands).await,
            Err(e) => Err(e),
        };

        let closed = self.close().await;
        result?;
        // A failed close after a complete run loses nothing
        if closed.is_err() {
            debug!("ignoring close error after successful run");
        }

        info!(
            "session complete: {} commands, {} timed out",
            self.transcript.len(),
            self.transcript.timed_out()
        );
        Ok(self.take_transcript())
    }
}

impl<T: Transport, S: Segmenter> Drop for SessionDriver<T, S> {
    fn drop(&mut self) {
        if self.transport.is_open() {
            warn!("SessionDriver dropped while open - call close() to release the connection");
        }
    }
}

impl<T: Transport, S: Segmenter> fmt::Debug for SessionDriver<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionDriver")
            .field("state", &self.state)
            .field("completion", &self.config.completion)
            .field("entries", &self.transcript.len())
            .finish_non_exhaustive()
    }
}
