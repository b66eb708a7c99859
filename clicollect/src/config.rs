//! TOML file configuration.
//!
//! Every key is optional. Values present in the file override built-in
//! defaults and are in turn overridden by command-line flags.
//!
//! ```toml
//! [session]
//! idle_timeout = 3.0
//! command_ceiling = 300
//! completion = "idle"
//! pager_patterns = ["--More--"]
//!
//! [ssh]
//! port = 22
//! host_key_verification = "strict"
//! known_hosts = "/home/admin/.ssh/known_hosts"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::driver::{Completion, SessionBuilder};
use crate::error::{ConfigError, Result};
use crate::transport::HostKeyVerification;

/// Contents of a configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub session: SessionSection,

    #[serde(default)]
    pub ssh: SshSection,
}

/// `[session]` table. Durations are in seconds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSection {
    pub idle_timeout: Option<f64>,
    pub startup_timeout: Option<f64>,
    pub command_ceiling: Option<f64>,
    pub poll_interval: Option<f64>,
    pub command_delay: Option<f64>,
    pub completion: Option<Completion>,
    pub prompt_patterns: Option<Vec<String>>,
    pub pager_patterns: Option<Vec<String>>,
    pub search_depth: Option<usize>,
    pub trim_echo: Option<bool>,
    pub trim_prompt: Option<bool>,
    pub line_ending: Option<String>,
}

/// `[ssh]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SshSection {
    pub port: Option<u16>,
    pub connect_timeout: Option<f64>,
    pub host_key_verification: Option<HostKeyVerification>,
    pub known_hosts: Option<PathBuf>,
    pub terminal_width: Option<u32>,
    pub terminal_height: Option<u32>,
}

impl FileConfig {
    /// Read and parse a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text, path)?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse config text. `origin` only labels errors.
    pub fn parse(text: &str, origin: impl AsRef<Path>) -> Result<Self> {
        toml::from_str(text).map_err(|source| {
            ConfigError::Parse {
                path: origin.as_ref().to_path_buf(),
                source,
            }
            .into()
        })
    }

    /// Layer these values over `builder`.
    pub fn apply(&self, mut builder: SessionBuilder) -> Result<SessionBuilder> {
        let s = &self.session;
        let session = builder.session_config_mut();

        if let Some(v) = s.idle_timeout {
            session.idle_timeout = seconds("session.idle_timeout", v)?;
        }
        if let Some(v) = s.startup_timeout {
            session.startup_timeout = seconds("session.startup_timeout", v)?;
        }
        if let Some(v) = s.command_ceiling {
            session.command_ceiling = seconds("session.command_ceiling", v)?;
        }
        if let Some(v) = s.poll_interval {
            session.poll_interval = seconds("session.poll_interval", v)?;
        }
        if let Some(v) = s.command_delay {
            session.command_delay = seconds("session.command_delay", v)?;
        }
        if let Some(v) = s.completion {
            session.completion = v;
        }
        if let Some(v) = &s.prompt_patterns {
            session.prompt_patterns = v.clone();
        }
        if let Some(v) = &s.pager_patterns {
            session.pager_patterns = v.clone();
        }
        if let Some(v) = s.search_depth {
            session.search_depth = v;
        }
        if let Some(v) = s.trim_echo {
            session.trim_echo = v;
        }
        if let Some(v) = s.trim_prompt {
            session.trim_prompt = v;
        }
        if let Some(v) = &s.line_ending {
            session.line_ending = v.clone();
        }

        let ssh = &self.ssh;
        if let Some(port) = ssh.port {
            builder = builder.port(port);
        }
        if let Some(v) = ssh.connect_timeout {
            builder = builder.connect_timeout(seconds("ssh.connect_timeout", v)?);
        }
        if let Some(mode) = ssh.host_key_verification {
            builder = builder.host_key_verification(mode);
        }
        if let Some(path) = &ssh.known_hosts {
            builder = builder.known_hosts_path(path.clone());
        }
        if ssh.terminal_width.is_some() || ssh.terminal_height.is_some() {
            builder = builder.terminal_size(
                ssh.terminal_width.unwrap_or(511),
                ssh.terminal_height.unwrap_or(24),
            );
        }

        Ok(builder)
    }
}

/// Convert a seconds value from the file or command line.
pub fn seconds(key: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{value} is not a valid number of seconds"),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorCategory};
    use crate::transport::mock::{MockScript, MockTransport};

    fn builder() -> SessionBuilder {
        SessionBuilder::new("192.0.2.1").username("admin")
    }

    #[test]
    fn test_empty_file_keeps_defaults() {
        let config = FileConfig::parse("", "empty.toml").unwrap();
        let driver = config
            .apply(builder())
            .unwrap()
            .build_with(MockTransport::new(MockScript::new()))
            .unwrap();
        assert_eq!(driver.config().idle_timeout, Duration::from_secs(3));
        assert_eq!(driver.config().command_ceiling, Duration::from_secs(120));
    }

    #[test]
    fn test_session_values_applied() {
        let text = r#"
            [session]
            idle_timeout = 1.5
            command_ceiling = 300
            command_delay = 0
            completion = "prompt"
            pager_patterns = []
            trim_echo = false
        "#;
        let config = FileConfig::parse(text, "clicollect.toml").unwrap();
        let driver = config
            .apply(builder())
            .unwrap()
            .build_with(MockTransport::new(MockScript::new()))
            .unwrap();

        let session = driver.config();
        assert_eq!(session.idle_timeout, Duration::from_millis(1500));
        assert_eq!(session.command_ceiling, Duration::from_secs(300));
        assert!(session.command_delay.is_zero());
        assert_eq!(session.completion, Completion::Prompt);
        assert!(session.pager_patterns.is_empty());
        assert!(!session.trim_echo);
        assert!(session.trim_prompt);
    }

    #[test]
    fn test_ssh_values_applied() {
        let text = r#"
            [ssh]
            port = 2222
            host_key_verification = "accept-new"
            terminal_width = 200
        "#;
        let config = FileConfig::parse(text, "clicollect.toml").unwrap();
        assert_eq!(config.ssh.port, Some(2222));
        assert_eq!(
            config.ssh.host_key_verification,
            Some(HostKeyVerification::AcceptNew)
        );

        let driver = config.apply(builder()).unwrap().build().unwrap();
        let ssh = driver.transport().config();
        assert_eq!(ssh.port, 2222);
        assert_eq!(ssh.terminal_width, 200);
        assert_eq!(ssh.terminal_height, 24);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = FileConfig::parse("[session]\nidle_timout = 3\n", "typo.toml").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse { .. })));
        assert!(err.to_string().contains("typo.toml"));
    }

    #[test]
    fn test_negative_seconds_rejected() {
        let config = FileConfig::parse("[session]\nidle_timeout = -1.0\n", "neg.toml").unwrap();
        let err = config.apply(builder()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(err.to_string().contains("session.idle_timeout"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clicollect.toml");
        std::fs::write(&path, "[session]\nstartup_timeout = 20.0\n").unwrap();

        let config = tokio_test::assert_ok!(FileConfig::load(&path));
        assert_eq!(config.session.startup_timeout, Some(20.0));

        let err = FileConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ReadFile { .. })));
    }
}
