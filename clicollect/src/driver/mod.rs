//! High-level session driver.
//!
//! The driver layer provides the main API: open a shell, run a list of
//! commands in order and collect one [`CapturedOutput`] per command.

mod builder;
mod capture;
mod config;
mod session;

pub use builder::SessionBuilder;
pub use capture::{CaptureStatus, CapturedOutput, OutputNormalizer};
pub use config::{Completion, CompletionStrategy, SessionConfig};
pub use session::{SessionDriver, SessionState};
