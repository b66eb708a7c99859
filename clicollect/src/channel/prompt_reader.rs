//! Prompt re-detection segmentation.

use std::time::Duration;

use log::{debug, trace, warn};
use tokio::time::Instant;

use super::buffer::CaptureBuffer;
use super::pager::PagerHandler;
use super::patterns::PromptDetector;
use super::segment::{Segment, SegmentEnd, Segmenter};
use crate::error::{ChannelError, Result};
use crate::transport::Transport;

/// Segmenter that finalizes as soon as the prompt shows up again.
///
/// Faster than [`IdleTimeoutReader`](super::IdleTimeoutReader) when the
/// prompt is reliable, but any output line that happens to look like the
/// prompt ends the command early.
#[derive(Debug, Clone)]
pub struct PromptReader {
    ceiling: Duration,
    poll_interval: Duration,
    search_depth: usize,
    pager: PagerHandler,
}

impl PromptReader {
    pub fn new(ceiling: Duration) -> Self {
        Self {
            ceiling,
            poll_interval: Duration::from_millis(100),
            search_depth: 1000,
            pager: PagerHandler::default(),
        }
    }

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

impl Segmenter for PromptReader {
    async fn next_segment<T: Transport>(
        &self,
        transport: &mut T,
        prompt: &PromptDetector,
    ) -> Result<Segment> {
        let start = Instant::now();
        let mut buffer = CaptureBuffer::new(self.search_depth);
        let mut chunks = 0;

        loop {
            let running = start.elapsed();
            if running >= self.ceiling {
                warn!("prompt not seen within {:?} ceiling", self.ceiling);
                return Err(ChannelError::CommandTimeout {
                    ceiling: self.ceiling,
                    partial: buffer.take(),
                }
                .into());
            }

            let wait = self.poll_interval.min(self.ceiling - running);
            let Some(data) = transport.receive(wait).await? else {
                continue;
            };
            if data.is_empty() {
                continue;
            }

            chunks += 1;
            trace!("chunk received: {} bytes", data.len());
            buffer.extend(&data);
            if self.pager.respond(&mut buffer, transport).await? {
                continue;
            }

            if prompt.is_ready(buffer.tail()) {
                debug!("prompt detected after {:?}", start.elapsed());
                let raw_len = buffer.raw_len();
                return Ok(Segment {
                    data: buffer.take(),
                    end: SegmentEnd::Prompt,
                    elapsed: start.elapsed(),
                    chunks,
                    raw_len,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockScript, MockTransport};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_prompt() {
        let script = MockScript::new()
            .emit(ms(100), "Version: FortiGate-100F\n")
            .emit(ms(200), "FG100 # ")
            .emit(ms(300), "late noise");
        let mut transport = MockTransport::new(script);
        transport.open().await.unwrap();

        let prompt = PromptDetector::learn(b"FG100 # ").unwrap();
        let segment = PromptReader::new(ms(10_000))
            .next_segment(&mut transport, &prompt)
            .await
            .unwrap();

        assert_eq!(segment.end, SegmentEnd::Prompt);
        assert_eq!(segment.as_str_lossy(), "Version: FortiGate-100F\nFG100 # ");
        assert!(segment.elapsed < ms(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ceiling_without_prompt() {
        let script = MockScript::new().emit(ms(100), "no prompt yet");
        let mut transport = MockTransport::new(script);
        transport.open().await.unwrap();

        let err = PromptReader::new(ms(5_000))
            .next_segment(&mut transport, &PromptDetector::generic())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            crate::Error::Channel(ChannelError::CommandTimeout { ref partial, .. })
                if partial == b"no prompt yet"
        ));
    }
}
