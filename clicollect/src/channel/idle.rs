//! Idle-timeout segmentation.
//!
//! A command is considered finished once the shell has been quiet for the
//! idle window. Any byte, even one, restarts the window. A separate ceiling
//! bounds the whole read so a slow trickle cannot stall the run.
//!
//! This can end a command early if its output pauses for longer than the
//! window, and it always costs one idle window per command.

use std::time::Duration;

use log::{debug, trace, warn};
use tokio::time::Instant;

use super::buffer::CaptureBuffer;
use super::pager::PagerHandler;
use super::patterns::PromptDetector;
use super::segment::{Segment, SegmentEnd, Segmenter};
use crate::error::{ChannelError, Result};
use crate::transport::Transport;

/// Segmenter that finalizes after a quiet period.
#[derive(Debug, Clone)]
pub struct IdleTimeoutReader {
    idle_timeout: Duration,
    ceiling: Duration,
    poll_interval: Duration,
    search_depth: usize,
    pager: PagerHandler,
}

impl IdleTimeoutReader {
    /// Reader with the given idle window and hard ceiling.
    pub fn new(idle_timeout: Duration, ceiling: Duration) -> Self {
        Self {
            idle_timeout,
            ceiling,
            poll_interval: Duration::from_millis(100),
            search_depth: 1000,
            pager: PagerHandler::default(),
        }
    }

    /// Longest single wait on the transport.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_search_depth(mut self, search_depth: usize) -> Self {
        self.search_depth = search_depth;
        self
    }

    pub fn with_pager(mut self, pager: PagerHandler) -> Self {
        self.pager = pager;
        self
    }
}

impl Default for IdleTimeoutReader {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), Duration::from_secs(120))
    }
}

impl Segmenter for IdleTimeoutReader {
    async fn next_segment<T: Transport>(
        &self,
        transport: &mut T,
        _prompt: &PromptDetector,
    ) -> Result<Segment> {
        let start = Instant::now();
        let mut last_activity = start;
        let mut buffer = CaptureBuffer::new(self.search_depth);
        let mut chunks = 0;

        loop {
            let now = Instant::now();
            let running = now.duration_since(start);
            if running >= self.ceiling {
                warn!(
                    "output still arriving after {:?} ceiling ({} bytes so far)",
                    self.ceiling,
                    buffer.raw_len()
                );
                return Err(ChannelError::CommandTimeout {
                    ceiling: self.ceiling,
                    partial: buffer.take(),
                }
                .into());
            }

            let quiet = now.duration_since(last_activity);
            if quiet >= self.idle_timeout {
                debug!(
                    "idle timeout fired after {:?} quiet, {} chunks, {} bytes",
                    quiet,
                    chunks,
                    buffer.raw_len()
                );
                let raw_len = buffer.raw_len();
                return Ok(Segment {
                    data: buffer.take(),
                    end: SegmentEnd::Idle,
                    elapsed: running,
                    chunks,
                    raw_len,
                });
            }

            // Never sleep past the idle deadline or the ceiling
            let wait = self
                .poll_interval
                .min(self.idle_timeout - quiet)
                .min(self.ceiling - running);

            if let Some(data) = transport.receive(wait).await? {
                if data.is_empty() {
                    continue;
                }
                chunks += 1;
                trace!("chunk received: {} bytes", data.len());
                buffer.extend(&data);
                last_activity = Instant::now();
                self.pager.respond(&mut buffer, transport).await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{Emit, MockScript, MockTransport};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    async fn opened(script: MockScript) -> MockTransport {
        let mut transport = MockTransport::new(script);
        transport.open().await.unwrap();
        transport
    }

    #[tokio::test(start_paused = true)]
    async fn test_finalizes_after_idle_window() {
        let script = MockScript::new()
            .emit(ms(0), "first ")
            .emit(ms(500), "second\n");
        let mut transport = opened(script).await;
        let reader = IdleTimeoutReader::new(ms(3000), ms(60_000));

        let segment = reader
            .next_segment(&mut transport, &PromptDetector::generic())
            .await
            .unwrap();

        assert_eq!(segment.data, b"first second\n");
        assert_eq!(segment.end, SegmentEnd::Idle);
        assert_eq!(segment.chunks, 2);
        // last byte at 500ms, so never before 3500ms and within one poll after
        assert!(segment.elapsed >= ms(3500));
        assert!(segment.elapsed <= ms(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_any_byte_resets_idle_clock() {
        let script = MockScript::new()
            .emit(ms(2900), "a")
            .emit(ms(5800), "b")
            .emit(ms(8700), "c");
        let mut transport = opened(script).await;
        let reader = IdleTimeoutReader::new(ms(3000), ms(60_000));

        let segment = reader
            .next_segment(&mut transport, &PromptDetector::generic())
            .await
            .unwrap();

        assert_eq!(segment.data, b"abc");
        assert!(segment.elapsed >= ms(11_700));
        assert!(segment.elapsed <= ms(11_800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_command_yields_empty_segment() {
        let mut transport = opened(MockScript::new()).await;
        let reader = IdleTimeoutReader::new(ms(3000), ms(60_000));

        let segment = reader
            .next_segment(&mut transport, &PromptDetector::generic())
            .await
            .unwrap();

        assert!(segment.data.is_empty());
        assert_eq!(segment.chunks, 0);
        assert!(segment.elapsed >= ms(3000));
        assert!(segment.elapsed <= ms(3100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_trickle_hits_ceiling() {
        // One byte every 2.9s never lets a 3s idle window elapse
        let script = (1..100u32).fold(MockScript::new(), |script, i| {
            script.emit(ms(2900) * i, ".")
        });
        let mut transport = opened(script).await;
        let reader = IdleTimeoutReader::new(ms(3000), ms(20_000));

        let err = reader
            .next_segment(&mut transport, &PromptDetector::generic())
            .await
            .unwrap_err();

        match err {
            crate::Error::Channel(ChannelError::CommandTimeout { ceiling, partial }) => {
                assert_eq!(ceiling, ms(20_000));
                assert_eq!(partial, b"......");
            }
            other => panic!("expected CommandTimeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pager_is_answered() {
        let script = MockScript::new()
            .emit(ms(0), "page one\n--More-- ")
            .on_line(" ", vec![Emit::data(ms(100), "page two\n")]);
        let mut transport = opened(script).await;
        let log = transport.log();
        let reader = IdleTimeoutReader::new(ms(3000), ms(60_000));

        let segment = reader
            .next_segment(&mut transport, &PromptDetector::generic())
            .await
            .unwrap();

        assert_eq!(segment.as_str_lossy(), "page one\npage two\n");
        assert_eq!(log.lock().unwrap().sent, vec![" ".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_marker_inside_output_is_kept() {
        let script = MockScript::new().emit(ms(0), "--More-- is the pager prompt\nFG100 # ");
        let mut transport = opened(script).await;
        let log = transport.log();
        let reader = IdleTimeoutReader::new(ms(3000), ms(60_000));

        let segment = reader
            .next_segment(&mut transport, &PromptDetector::generic())
            .await
            .unwrap();

        assert_eq!(segment.as_str_lossy(), "--More-- is the pager prompt\nFG100 # ");
        assert!(log.lock().unwrap().sent.is_empty());
    }
}
