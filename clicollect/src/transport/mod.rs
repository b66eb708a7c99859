//! Transport layer: an ordered byte stream to a remote interactive shell.
//!
//! The session driver only needs four operations from a transport, so they
//! are captured by the [`Transport`] trait. [`SshTransport`] is the real
//! implementation over russh.

pub mod config;
#[cfg(test)]
pub(crate) mod mock;
mod ssh;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use ssh::SshTransport;

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// An authenticated byte-stream channel to a remote shell.
pub trait Transport: Send {
    /// Connect, authenticate and start the interactive shell.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Write raw bytes to the shell.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait at most `wait` for output.
    ///
    /// Returns `Ok(None)` if nothing arrived in time. Never blocks longer
    /// than `wait`, so callers can keep their own clocks.
    fn receive(&mut self, wait: Duration)
    -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Release the channel and connection. Safe to call more than once.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Whether the shell is currently open.
    fn is_open(&self) -> bool;
}
