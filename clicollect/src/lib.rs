//! # clicollect
//!
//! Run a list of CLI commands on a network appliance over SSH and collect
//! each command's output into a flat-text transcript.
//!
//! The appliance's shell has no framing: output is a plain byte stream and
//! the only hint that a command has finished is that the shell goes quiet
//! or the prompt comes back. clicollect segments the stream per command
//! with an idle timeout (default) or prompt re-detection, bounded by a hard
//! per-command ceiling.
//!
//! ## Features
//!
//! - Async SSH connections via russh, with known_hosts verification
//! - Idle-timeout segmentation that tolerates slow, bursty output
//! - Prompt learning from the login banner (`FG100 #`, `FG100 (global) #`)
//! - Automatic pager handling (`--More--`)
//! - Round-trippable transcript format
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clicollect::SessionBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), clicollect::Error> {
//!     let mut session = SessionBuilder::new("192.0.2.1")
//!         .username("admin")
//!         .password("secret")
//!         .build()?;
//!
//!     let transcript = session
//!         .run(&["get system status", "get system performance status"])
//!         .await?;
//!
//!     for entry in transcript.entries() {
//!         println!("{}: {} chars", entry.command, entry.char_count());
//!     }
//!     transcript.save("output-file.txt")?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod commands;
pub mod config;
pub mod driver;
pub mod error;
pub mod transcript;
pub mod transport;

// Re-export main types for convenience
pub use commands::{load_commands, parse_commands};
pub use config::FileConfig;
pub use driver::{
    CaptureStatus, CapturedOutput, Completion, SessionBuilder, SessionConfig, SessionDriver,
    SessionState,
};
pub use error::{Error, ErrorCategory, Result};
pub use transcript::Transcript;
pub use transport::{AuthMethod, HostKeyVerification, SshConfig, SshTransport, Transport};
