//! Scripted transport for tests.
//!
//! A [`FakeDialer`] hands out [`FakeShell`]s that answer commands from a
//! canned transcript, so the session layer and the device state machine can
//! be exercised without a network.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use super::config::ShellConfig;
use super::{Dial, ShellChannel};
use crate::error::{ConnectionError, Result};

/// Canned replies for one device, keyed by command.
///
/// Each command maps to a sequence of replies; once the sequence is
/// exhausted the last reply repeats, which is what a real device does when
/// a command is re-issued on retry.
#[derive(Debug, Clone, Default)]
pub(crate) struct Script {
    replies: HashMap<String, Vec<String>>,
}

impl Script {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer `command` with `reply`, every time.
    pub(crate) fn reply(mut self, command: &str, reply: &str) -> Self {
        self.replies.insert(command.to_string(), vec![reply.to_string()]);
        self
    }

    /// Answer `command` with each entry in turn, repeating the last.
    pub(crate) fn reply_seq(mut self, command: &str, replies: &[&str]) -> Self {
        self.replies.insert(
            command.to_string(),
            replies.iter().map(|r| r.to_string()).collect(),
        );
        self
    }
}

#[derive(Debug, Default)]
struct FakeState {
    devices: HashMap<String, Script>,
    /// Hosts whose next N dials fail with a transport error.
    dial_failures: HashMap<String, u32>,
    /// Every command line sent through any shell, in order.
    sent: Vec<String>,
    dial_count: u32,
    closed_count: u32,
}

/// Dialer serving scripted shells. Cloning shares the underlying state, so
/// tests can keep a handle for assertions after moving a clone into the
/// registry.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeDialer {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDialer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register the transcript for one host.
    pub(crate) fn device(&self, host: &str, script: Script) {
        self.state
            .lock()
            .unwrap()
            .devices
            .insert(host.to_string(), script);
    }

    /// Make the next `count` dials to `host` fail.
    pub(crate) fn fail_dials(&self, host: &str, count: u32) {
        self.state
            .lock()
            .unwrap()
            .dial_failures
            .insert(host.to_string(), count);
    }

    /// Commands sent through every shell so far.
    pub(crate) fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    /// How many dials were attempted.
    pub(crate) fn dial_count(&self) -> u32 {
        self.state.lock().unwrap().dial_count
    }

    /// How many shells were closed.
    pub(crate) fn closed_count(&self) -> u32 {
        self.state.lock().unwrap().closed_count
    }
}

impl Dial for FakeDialer {
    type Shell = FakeShell;

    async fn dial(&self, config: &ShellConfig) -> Result<FakeShell> {
        let mut state = self.state.lock().unwrap();
        state.dial_count += 1;
        if let Some(remaining) = state.dial_failures.get_mut(&config.host)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(ConnectionError::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "scripted dial failure",
            ))
            .into());
        }
        let script = state.devices.get(&config.host).cloned().ok_or_else(|| {
            ConnectionError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("no script for {}", config.host),
            ))
        })?;
        Ok(FakeShell {
            script,
            served: HashMap::new(),
            pending: None,
            state: self.state.clone(),
        })
    }
}

/// Shell answering from a [`Script`].
#[derive(Debug)]
pub(crate) struct FakeShell {
    script: Script,
    served: HashMap<String, usize>,
    pending: Option<String>,
    state: Arc<Mutex<FakeState>>,
}

impl ShellChannel for FakeShell {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.state.lock().unwrap().sent.push(line.to_string());
        if let Some(replies) = self.script.replies.get(line) {
            let index = self.served.entry(line.to_string()).or_insert(0);
            let reply = replies
                .get(*index)
                .or_else(|| replies.last())
                .cloned()
                .unwrap_or_default();
            *index += 1;
            self.pending = Some(reply);
        }
        // Unscripted commands stay silent; the caller's timeout handles it.
        Ok(())
    }

    async fn recv_ready(&mut self) -> Result<bool> {
        Ok(self.pending.is_some())
    }

    async fn recv(&mut self) -> Result<String> {
        Ok(self.pending.take().unwrap_or_default())
    }

    async fn close(&mut self) -> Result<()> {
        self.state.lock().unwrap().closed_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;

    #[test]
    fn test_scripted_reply_sequence_repeats_last() {
        tokio_test::block_on(async {
            let dialer = FakeDialer::new();
            dialer.device("host", Script::new().reply_seq("cmd", &["first", "second"]));

            let audit = AuditConfig::new("auditor", "hunter2".to_string());
            let config = ShellConfig::for_host(&audit, "host");
            let mut shell = dialer.dial(&config).await.unwrap();

            shell.send_line("cmd").await.unwrap();
            assert!(shell.recv_ready().await.unwrap());
            assert_eq!(shell.recv().await.unwrap(), "first");

            shell.send_line("cmd").await.unwrap();
            assert_eq!(shell.recv().await.unwrap(), "second");

            shell.send_line("cmd").await.unwrap();
            assert_eq!(shell.recv().await.unwrap(), "second");

            assert_eq!(dialer.sent(), vec!["cmd", "cmd", "cmd"]);
        });
    }

    #[test]
    fn test_unscripted_command_stays_silent() {
        tokio_test::block_on(async {
            let dialer = FakeDialer::new();
            dialer.device("host", Script::new());

            let audit = AuditConfig::new("auditor", "hunter2".to_string());
            let config = ShellConfig::for_host(&audit, "host");
            let mut shell = dialer.dial(&config).await.unwrap();

            shell.send_line("mystery").await.unwrap();
            assert!(!shell.recv_ready().await.unwrap());
        });
    }
}
