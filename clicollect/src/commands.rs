//! Command list loading.
//!
//! One command per line. Blank lines and lines starting with `#` are
//! skipped; everything else is sent verbatim, in file order.

use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{ConfigError, Result};

/// Parse a command list from text.
pub fn parse_commands(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| {
            let line = line.trim_start();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(str::to_string)
        .collect()
}

/// Read a command list from `path`.
pub fn load_commands(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::CommandsFile {
        path: path.to_path_buf(),
        source,
    })?;

    let commands = parse_commands(&text);
    debug!("loaded {} commands from {}", commands.len(), path.display());
    Ok(commands)
}
