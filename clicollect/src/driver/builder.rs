//! Builder for creating session drivers.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::config::{Completion, SessionConfig};
use super::session::SessionDriver;
use crate::error::{Result, SessionError};
use crate::transport::config::{AuthMethod, HostKeyVerification, SshConfig};
use crate::transport::{SshTransport, Transport};

/// Builder for constructing session drivers.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use clicollect::SessionBuilder;
///
/// # async fn example() -> Result<(), clicollect::Error> {
/// let mut session = SessionBuilder::new("192.0.2.1")
///     .username("admin")
///     .password("secret")
///     .idle_timeout(Duration::from_secs(5))
///     .build()?;
/// session.open().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SessionBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    auth: AuthMethod,
    connect_timeout: Duration,
    terminal_width: u32,
    terminal_height: u32,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    session: SessionConfig,
}

impl SessionBuilder {
    /// Create a new builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            auth: AuthMethod::None,
            connect_timeout: Duration::from_secs(10),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            session: SessionConfig::default(),
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Password(SecretString::from(password.into()));
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Set the authentication method directly.
    pub fn auth(mut self, auth: AuthMethod) -> Self {
        self.auth = auth;
        self
    }

    /// Bound on TCP connect plus SSH handshake.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Quiet period that ends a command's output.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.session.idle_timeout = timeout;
        self
    }

    /// How long to wait for the first prompt.
    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.session.startup_timeout = timeout;
        self
    }

    /// Hard limit on one command's output.
    pub fn command_ceiling(mut self, ceiling: Duration) -> Self {
        self.session.command_ceiling = ceiling;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.session.poll_interval = interval;
        self
    }

    pub fn command_delay(mut self, delay: Duration) -> Self {
        self.session.command_delay = delay;
        self
    }

    pub fn completion(mut self, completion: Completion) -> Self {
        self.session.completion = completion;
        self
    }

    /// Replace the prompt patterns.
    pub fn prompt_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.session.prompt_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the pager markers. An empty list disables paging.
    pub fn pager_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.session.pager_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn trim_echo(mut self, trim: bool) -> Self {
        self.session.trim_echo = trim;
        self
    }

    pub fn trim_prompt(mut self, trim: bool) -> Self {
        self.session.trim_prompt = trim;
        self
    }

    /// Replace the whole session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session = config;
        self
    }

    /// Mutable access for layered configuration.
    pub fn session_config_mut(&mut self) -> &mut SessionConfig {
        &mut self.session
    }

    fn require_username(&self) -> Result<String> {
        self.username.clone().ok_or_else(|| {
            SessionError::InvalidConfig {
                message: "Username is required".to_string(),
            }
            .into()
        })
    }

    /// Build an SSH-backed driver.
    ///
    /// This creates the driver but does not connect. Call `open()` or
    /// `run()` on the returned driver to establish the connection.
    pub fn build(self) -> Result<SessionDriver<SshTransport>> {
        let username = self.require_username()?;
        let host = self.host.clone();

        let ssh_config = SshConfig {
            host: self.host,
            port: self.port,
            username: username.clone(),
            auth: self.auth,
            connect_timeout: self.connect_timeout,
            terminal_width: self.terminal_width,
            terminal_height: self.terminal_height,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        };

        Ok(SessionDriver::new(SshTransport::new(ssh_config), self.session)?
            .with_target(host, username))
    }

    /// Build a driver over any transport, keeping the session settings.
    pub fn build_with<T: Transport>(self, transport: T) -> Result<SessionDriver<T>> {
        let username = self.require_username()?;
        Ok(SessionDriver::new(transport, self.session)?.with_target(self.host, username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::transport::mock::{MockScript, MockTransport};

    #[test]
    fn test_username_required() {
        let err = SessionBuilder::new("192.0.2.1")
            .password("secret")
            .build()
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(err.to_string().contains("Username"));
    }

    #[test]
    fn test_invalid_timings_rejected() {
        let err = SessionBuilder::new("192.0.2.1")
            .username("admin")
            .idle_timeout(Duration::from_secs(30))
            .command_ceiling(Duration::from_secs(10))
            .build_with(MockTransport::new(MockScript::new()))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Config);
    }

    #[test]
    fn test_session_settings_applied() {
        let driver = SessionBuilder::new("192.0.2.1")
            .username("admin")
            .idle_timeout(Duration::from_secs(5))
            .completion(Completion::Prompt)
            .pager_patterns(Vec::<String>::new())
            .build_with(MockTransport::new(MockScript::new()))
            .unwrap();

        assert_eq!(driver.config().idle_timeout, Duration::from_secs(5));
        assert_eq!(driver.config().completion, Completion::Prompt);
        assert!(driver.config().pager_patterns.is_empty());
        assert_eq!(driver.transcript().host(), Some("192.0.2.1"));
        assert_eq!(driver.transcript().username(), Some("admin"));
    }

    #[test]
    fn test_ssh_settings_applied() {
        let driver = SessionBuilder::new("fw.example.net")
            .port(2222)
            .username("admin")
            .password("secret")
            .terminal_size(200, 50)
            .host_key_verification(HostKeyVerification::Strict)
            .build()
            .unwrap();

        let config = driver.transport().config();
        assert_eq!(config.socket_addr(), "fw.example.net:2222");
        assert_eq!(config.terminal_width, 200);
        assert_eq!(config.host_key_verification, HostKeyVerification::Strict);
        assert!(matches!(config.auth, AuthMethod::Password(_)));
    }
}
