//! Pager handling.
//!
//! Appliances with paging enabled stop after a screenful and print a marker
//! such as `--More--`. A marker that ends the output so far is cut from the
//! capture and a space is sent to request the next page. A marker followed
//! by more text is ordinary output and left alone.

use log::debug;

use super::buffer::CaptureBuffer;
use crate::error::Result;
use crate::transport::Transport;

/// Markers recognized by default.
pub const DEFAULT_PAGER_PATTERNS: &[&str] = &["--More--", "Press any key to continue"];

/// Detects pager markers and answers them.
#[derive(Debug, Clone)]
pub struct PagerHandler {
    markers: Vec<Vec<u8>>,
    response: Vec<u8>,
}

impl PagerHandler {
    /// Handler for the given literal markers. An empty list disables paging.
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|m| m.as_ref().as_bytes().to_vec())
                .filter(|m| !m.is_empty())
                .collect(),
            response: b" ".to_vec(),
        }
    }

    /// Cut a trailing pager marker from `buffer`. Returns whether one was found.
    pub fn strip_marker(&self, buffer: &mut CaptureBuffer) -> bool {
        self.markers.iter().any(|m| buffer.strip_trailing(m))
    }

    /// Strip a pending marker and ask the appliance for the next page.
    pub async fn respond<T: Transport>(
        &self,
        buffer: &mut CaptureBuffer,
        transport: &mut T,
    ) -> Result<bool> {
        if !self.strip_marker(buffer) {
            return Ok(false);
        }
        debug!("pager marker detected, requesting next page");
        transport.send(&self.response).await?;
        Ok(true)
    }
}

impl Default for PagerHandler {
    fn default() -> Self {
        Self::new(DEFAULT_PAGER_PATTERNS)
    }
}
