//! SSH shell implementation using russh.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;

use super::buffer::ReplyBuffer;
use super::config::ShellConfig;
use super::{Dial, ShellChannel};
use crate::error::{ConnectionError, Result};

/// How long one channel poll waits before reporting "nothing yet".
const POLL_WAIT: Duration = Duration::from_millis(10);

/// Dialer producing [`SshShell`] sessions.
pub struct SshDialer;

impl Dial for SshDialer {
    type Shell = SshShell;

    async fn dial(&self, config: &ShellConfig) -> Result<SshShell> {
        SshShell::connect(config).await
    }
}

/// An authenticated interactive shell over SSH.
pub struct SshShell {
    session: Handle<ShellHandler>,
    channel: Channel<Msg>,
    buffer: ReplyBuffer,
}

impl SshShell {
    /// Connect to the device, authenticate, and open a PTY shell.
    pub async fn connect(config: &ShellConfig) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: None,
            ..Default::default()
        });

        debug!(
            "ssh connect to {}:{} ({:?} before timeout)",
            config.host, config.port, config.connect_timeout
        );

        let mut session = tokio::time::timeout(
            config.connect_timeout,
            client::connect(
                ssh_config,
                (config.host.as_str(), config.port),
                ShellHandler,
            ),
        )
        .await
        .map_err(|_| ConnectionError::ConnectTimeout {
            host: config.host.clone(),
            port: config.port,
            timeout: config.connect_timeout,
        })?
        .map_err(ConnectionError::Ssh)?;

        let authenticated = session
            .authenticate_password(&config.username, config.password.expose_secret())
            .await
            .map_err(ConnectionError::Ssh)?
            .success();
        if !authenticated {
            return Err(ConnectionError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        let channel = session
            .channel_open_session()
            .await
            .map_err(ConnectionError::Ssh)?;

        channel
            .request_pty(
                true,
                "xterm",
                config.terminal_width,
                config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(ConnectionError::Ssh)?;

        channel
            .request_shell(true)
            .await
            .map_err(ConnectionError::Ssh)?;

        Ok(Self {
            session,
            channel,
            buffer: ReplyBuffer::new(),
        })
    }

    /// Poll the channel once, buffering any data that arrived.
    ///
    /// Returns `true` if data was buffered, `false` if the channel stayed
    /// quiet for `wait`. Stderr is folded into the same buffer; device CLIs
    /// interleave the two streams freely.
    async fn pump(&mut self, wait: Duration) -> Result<bool> {
        match tokio::time::timeout(wait, self.channel.wait()).await {
            Err(_) => Ok(false),
            Ok(None) => Err(ConnectionError::Closed.into()),
            Ok(Some(message)) => match message {
                ChannelMsg::Data { data } => {
                    self.buffer.extend(&data);
                    Ok(true)
                }
                ChannelMsg::ExtendedData { data, .. } => {
                    self.buffer.extend(&data);
                    Ok(true)
                }
                ChannelMsg::Eof | ChannelMsg::Close => Err(ConnectionError::Closed.into()),
                _ => Ok(false),
            },
        }
    }
}

impl ShellChannel for SshShell {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        let framed = format!("{line}\r\n");
        self.channel
            .data(framed.as_bytes())
            .await
            .map_err(ConnectionError::Ssh)?;
        Ok(())
    }

    async fn recv_ready(&mut self) -> Result<bool> {
        if !self.buffer.is_empty() {
            return Ok(true);
        }
        self.pump(POLL_WAIT).await?;
        Ok(!self.buffer.is_empty())
    }

    async fn recv(&mut self) -> Result<String> {
        // Drain whatever the device has flushed so far.
        loop {
            match self.pump(POLL_WAIT).await {
                Ok(true) => continue,
                Ok(false) => break,
                // A close mid-drain still hands back what arrived.
                Err(_) if !self.buffer.is_empty() => break,
                Err(e) => return Err(e),
            }
        }
        Ok(self.buffer.take_string())
    }

    async fn close(&mut self) -> Result<()> {
        self.channel.eof().await.ok();
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(ConnectionError::Ssh)?;
        Ok(())
    }
}

/// SSH client handler for russh.
///
/// Host keys are accepted unconditionally: the fleet's switches regenerate
/// keys on replacement and no known_hosts store is maintained for them.
struct ShellHandler;

impl client::Handler for ShellHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}
