//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use log::{debug, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;

use super::config::{HostKeyVerification, SshConfig};
use crate::channel::ShellChannel;
use crate::device::Credentials;
use crate::error::{ChannelError, TransportError};

/// An authenticated SSH connection to one device.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// Configuration used for this connection.
    config: SshConfig,
}

impl SshTransport {
    /// Connect to the SSH server and authenticate.
    ///
    /// The whole exchange (TCP connect, key exchange, authentication) is
    /// bounded by `config.connect_timeout`.
    pub async fn connect(
        config: SshConfig,
        credentials: &Credentials,
    ) -> Result<Self, TransportError> {
        let timeout = config.connect_timeout;
        tokio::time::timeout(timeout, Self::establish(config, credentials))
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
    }

    async fn establish(
        config: SshConfig,
        credentials: &Credentials,
    ) -> Result<Self, TransportError> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.connect_timeout),
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

        debug!("{}: connecting to {}", config.host, config.socket_addr());
        let mut session = client::connect(ssh_config, (config.host.as_str(), config.port), handler)
            .await
            .map_err(|e| {
                // check_server_key may have stored a more precise reason
                // than the generic russh::Error::UnknownKey
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

        Self::authenticate(&mut session, &config, credentials).await?;
        debug!("{}: authenticated as {}", config.host, config.username);

        Ok(Self { session, config })
    }

    /// Open an interactive shell with a PTY on this connection.
    ///
    /// The returned shell owns the connection; closing it disconnects.
    pub async fn open_shell(self) -> Result<SshShell, ChannelError> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(|e| ChannelError::ShellOpenFailed(e.to_string()))?;

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
            .map_err(|e| ChannelError::ShellOpenFailed(e.to_string()))?;

        channel
            .request_shell(true)
            .await
            .map_err(|e| ChannelError::ShellOpenFailed(e.to_string()))?;

        Ok(SshShell {
            channel,
            session: self.session,
        })
    }

    /// Authenticate with the server.
    async fn authenticate(
        session: &mut Handle<SshHandler>,
        config: &SshConfig,
        credentials: &Credentials,
    ) -> Result<(), TransportError> {
        let success = match credentials {
            Credentials::Password(password) => session
                .authenticate_password(&config.username, password.expose_secret())
                .await?
                .success(),
            Credentials::PrivateKey { path, passphrase } => {
                let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                    .map_err(|e| TransportError::Key(format!("{}: {}", path.display(), e)))?;

                // Get the best RSA hash algorithm supported by the server
                let hash_alg = session.best_supported_rsa_hash().await?.flatten();

                session
                    .authenticate_publickey(
                        &config.username,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await?
                    .success()
            }
        };

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            });
        }

        Ok(())
    }
}

/// Interactive shell over an SSH session channel.
pub struct SshShell {
    channel: Channel<Msg>,
    session: Handle<SshHandler>,
}

impl ShellChannel for SshShell {
    async fn write(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        self.channel.data(data).await.map_err(ChannelError::Ssh)
    }

    async fn read_chunk(&mut self) -> Result<Option<Bytes>, ChannelError> {
        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) => return Ok(Some(Bytes::copy_from_slice(&data))),
                Some(ChannelMsg::ExtendedData { data, .. }) => {
                    return Ok(Some(Bytes::copy_from_slice(&data)));
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => return Ok(None),
                Some(_) => continue,
            }
        }
    }

    async fn close(self) -> Result<(), ChannelError> {
        // The peer may already have hung up; that still counts as closed.
        let _ = self.channel.eof().await;
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(ChannelError::Ssh)
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Detailed host-key error surfaced by connect() instead of the
    /// generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(TransportError::HostKeyChanged)` if key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> Result<bool, TransportError> {
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
    fn learn_host_key(&self, pubkey: &PublicKey) -> Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    /// Record why the key was rejected and reject it.
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
    ) -> Result<bool, Self::Error> {
        let accepted = match self.host_key_verification {
            HostKeyVerification::Disabled => true,

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("{}: failed to save host key: {}", self.host, e);
                    }
                    true
                }
                Err(e) => self.reject(e),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                }),
                Err(e) => self.reject(e),
            },
        };

        Ok(accepted)
    }
}
