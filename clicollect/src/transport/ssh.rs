//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, trace, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;

use super::Transport;
use super::config::{AuthMethod, HostKeyVerification, SshConfig};
use crate::error::{Result, TransportError};

/// SSH transport wrapping a russh client session and one PTY shell channel.
pub struct SshTransport {
    /// Configuration used for this connection.
    config: SshConfig,

    /// The russh session handle (None until opened).
    session: Option<Handle<SshHandler>>,

    /// The interactive shell channel (None until opened).
    channel: Option<Channel<Msg>>,
}

impl SshTransport {
    /// Create an unconnected transport. Call [`Transport::open`] to connect.
    pub fn new(config: SshConfig) -> Self {
        Self {
            config,
            session: None,
            channel: None,
        }
    }

    /// Configuration this transport connects with.
    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Connect to the SSH server and authenticate.
    async fn connect(config: &SshConfig) -> Result<Handle<SshHandler>> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: None,
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
            host_key_verification: config.host_key_verification,
            known_hosts_path: config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        let mut session = tokio::time::timeout(
            config.connect_timeout,
            client::connect(ssh_config, (config.host.as_str(), config.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.connect_timeout))?
        .map_err(|e| {
            // Prefer the detailed host key error over russh's generic one
            let stored = host_key_error.lock().ok().and_then(|mut slot| slot.take());
            match (stored, e) {
                (Some(hk_err), _) => hk_err,
                (None, russh::Error::IO(source)) => TransportError::ConnectionFailed {
                    host: config.host.clone(),
                    port: config.port,
                    source,
                },
                (None, e) => TransportError::Ssh(e),
            }
        })?;

        tokio::time::timeout(
            config.connect_timeout,
            Self::authenticate(&mut session, config),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.connect_timeout))??;

        Ok(session)
    }

    /// Open a PTY channel running the interactive shell.
    async fn open_shell(&self, session: &Handle<SshHandler>) -> Result<Channel<Msg>> {
        let channel = session
            .channel_open_session()
            .await
            .map_err(|e| TransportError::ShellRequestFailed(e.to_string()))?;

        channel
            .request_pty(
                true,
                "xterm",
                self.config.terminal_width,
                self.config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(|e| TransportError::ShellRequestFailed(e.to_string()))?;

        channel
            .request_shell(true)
            .await
            .map_err(|e| TransportError::ShellRequestFailed(e.to_string()))?;

        Ok(channel)
    }

    /// Authenticate with the server. Rejection is final.
    async fn authenticate(session: &mut Handle<SshHandler>, config: &SshConfig) -> Result<()> {
        let success = match &config.auth {
            AuthMethod::None => session
                .authenticate_none(&config.username)
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::Password(password) => session
                .authenticate_password(&config.username, password.expose_secret())
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::PrivateKey { path, passphrase } => {
                let key = load_secret_key(
                    path,
                    passphrase.as_ref().map(|p| p.expose_secret()),
                )
                .map_err(|e| TransportError::Key(e.to_string()))?;

                // Get the best RSA hash algorithm supported by the server
                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(TransportError::Ssh)?
                    .flatten();

                session
                    .authenticate_publickey(
                        &config.username,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
                    .map_err(TransportError::Ssh)?
                    .success()
            }
        };

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(())
    }
}

impl Transport for SshTransport {
    async fn open(&mut self) -> Result<()> {
        info!(
            "Connecting to {} as {}",
            self.config.socket_addr(),
            self.config.username
        );

        let session = Self::connect(&self.config).await?;
        debug!("Authenticated as {}", self.config.username);

        let channel = match self.open_shell(&session).await {
            Ok(channel) => channel,
            Err(e) => {
                let _ = session
                    .disconnect(russh::Disconnect::ByApplication, "", "en")
                    .await;
                return Err(e);
            }
        };

        self.session = Some(session);
        self.channel = Some(channel);
        Ok(())
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let channel = self.channel.as_mut().ok_or(TransportError::NotOpen)?;
        channel.data(data).await.map_err(TransportError::Ssh)?;
        Ok(())
    }

    async fn receive(&mut self, wait: Duration) -> Result<Option<Vec<u8>>> {
        let channel = self.channel.as_mut().ok_or(TransportError::NotOpen)?;
        let deadline = tokio::time::Instant::now() + wait;

        loop {
            let msg = match tokio::time::timeout_at(deadline, channel.wait()).await {
                Err(_) => return Ok(None),
                Ok(None) => return Err(TransportError::Disconnected.into()),
                Ok(Some(msg)) => msg,
            };

            match msg {
                ChannelMsg::Data { data } => return Ok(Some(data.to_vec())),
                // stderr is part of what the operator would see on screen
                ChannelMsg::ExtendedData { data, .. } => return Ok(Some(data.to_vec())),
                ChannelMsg::Eof | ChannelMsg::Close => {
                    return Err(TransportError::Disconnected.into());
                }
                other => trace!("ignoring channel message: {:?}", other),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(channel) = self.channel.take() {
            if let Err(e) = channel.close().await {
                debug!("channel close failed: {}", e);
            }
        }

        if let Some(session) = self.session.take() {
            session
                .disconnect(russh::Disconnect::ByApplication, "", "en")
                .await
                .map_err(TransportError::Ssh)?;
            info!("Disconnected from {}", self.config.socket_addr());
        }

        Ok(())
    }

    fn is_open(&self) -> bool {
        self.channel.is_some()
    }
}

impl Drop for SshTransport {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!(
                "SshTransport to {} dropped without close()",
                self.config.socket_addr()
            );
        }
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(TransportError::HostKeyChanged)` if key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, error: TransportError) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(error);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key: {}", e);
                    }
                    Ok(true)
                }
                Err(e) => Ok(self.reject(e)),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => Ok(self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                })),
                Err(e) => Ok(self.reject(e)),
            },
        }
    }
}
