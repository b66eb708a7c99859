//! Output segmentation.
//!
//! The shell never says "this command is done", so something has to decide
//! where one command's output ends. A [`Segmenter`] owns that decision; the
//! session driver only asks for the next segment.

use std::future::Future;
use std::time::Duration;

use super::patterns::PromptDetector;
use crate::error::Result;
use crate::transport::Transport;

/// Why a segment was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentEnd {
    /// No bytes for the idle window.
    Idle,
    /// The prompt reappeared at the end of the output.
    Prompt,
}

/// One command's worth of output.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Output with escape sequences removed.
    pub data: Vec<u8>,

    /// How the segment was closed.
    pub end: SegmentEnd,

    /// Time from the start of reading to finalization.
    pub elapsed: Duration,

    /// Number of non-empty chunks received.
    pub chunks: usize,

    /// Bytes received before cleaning.
    pub raw_len: usize,
}

impl Segment {
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Splits the shell's byte stream into per-command segments.
///
/// Implementations must poll with bounded waits and fail with
/// [`ChannelError::CommandTimeout`](crate::error::ChannelError::CommandTimeout)
/// once their ceiling passes, carrying whatever was read.
pub trait Segmenter: Send + Sync {
    /// Read from `transport` until the current command's output is complete.
    ///
    /// `prompt` is the session's prompt detector, for strategies that use it.
    fn next_segment<T: Transport>(
        &self,
        transport: &mut T,
        prompt: &PromptDetector,
    ) -> impl Future<Output = Result<Segment>> + Send;
}
