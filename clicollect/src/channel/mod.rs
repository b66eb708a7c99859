//! Channel layer: turning the raw shell byte stream into command output.
//!
//! This module handles prompt detection, ANSI stripping, pager answering and
//! the decision of when a command's output is complete.

mod buffer;
mod idle;
mod pager;
mod patterns;
mod prompt_reader;
mod segment;

pub use buffer::CaptureBuffer;
pub use idle::IdleTimeoutReader;
pub use pager::{DEFAULT_PAGER_PATTERNS, PagerHandler};
pub use patterns::{DEFAULT_PROMPT_PATTERN, PromptDetector, compile_prompt_pattern};
pub use prompt_reader::PromptReader;
pub use segment::{Segment, SegmentEnd, Segmenter};
