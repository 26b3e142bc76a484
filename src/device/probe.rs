//! Per-device probe: the session state machine.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use log::{debug, error, info, warn};
use tokio::time::{Instant, sleep};

use super::{commands, grammar};
use crate::config::AuditConfig;
use crate::error::{ConnectionError, Result};
use crate::report::{DeviceResult, IdleRecord, Outcome, UptimeFact};
use crate::retry::RetryPolicy;
use crate::session::{Session, SessionRegistry};
use crate::transport::{Dial, ShellChannel};

/// Drives one device from `Idle` to a terminal state.
///
/// The sequence is fixed: acquire and connect a session, validate uptime,
/// enumerate `notconnect` interfaces, inspect each admissible one, release
/// the session. Every step that talks to the device runs under its own
/// retry policy; whatever happens, the session is released before the
/// result is returned.
pub struct DeviceProbe<D: Dial> {
    address: Ipv4Addr,
    config: Arc<AuditConfig>,
    registry: Arc<SessionRegistry<D>>,

    /// Self-reported hostname; the first non-empty capture wins and sticks.
    hostname: Option<String>,
    uptime: Option<UptimeFact>,
    idle_ports: Vec<IdleRecord>,
}

impl<D: Dial> DeviceProbe<D> {
    /// Create a probe for one validated address.
    pub fn new(
        address: Ipv4Addr,
        config: Arc<AuditConfig>,
        registry: Arc<SessionRegistry<D>>,
    ) -> Self {
        Self {
            address,
            config,
            registry,
            hostname: None,
            uptime: None,
            idle_ports: Vec::new(),
        }
    }

    /// Device identity for logs: address, plus hostname once known.
    fn identity(&self) -> String {
        match &self.hostname {
            Some(hostname) => format!("{} ({hostname})", self.address),
            None => self.address.to_string(),
        }
    }

    /// Run the state machine to termination.
    ///
    /// Never panics and never propagates an error: every fault is folded
    /// into the returned result so one device cannot abort its siblings.
    pub async fn run(mut self) -> DeviceResult {
        let key = match self.registry.session_key(&self.address.to_string()) {
            Ok(key) => key,
            Err(e) => {
                error!("cannot build session key for {}: {e}", self.address);
                return self.finish(Outcome::Failed(e.to_string()));
            }
        };

        let session = self.registry.acquire(&key);

        if let Err(e) = self.registry.connect(&session).await {
            error!("ssh connection to {} failed: {e}", self.address);
            self.registry.release(&key).await;
            return self.finish(Outcome::Failed(e.to_string()));
        }

        let outcome = {
            let mut guard = session.lock().await;
            let outcome = self.drive(&mut guard).await;
            if matches!(outcome, Outcome::Failed(_)) {
                guard.valid = false;
            }
            outcome
        };

        // Release must happen on every terminal state, fault or not.
        self.registry.release(&key).await;
        self.finish(outcome)
    }

    fn finish(self, outcome: Outcome) -> DeviceResult {
        DeviceResult {
            address: self.address,
            hostname: self.hostname,
            uptime: self.uptime,
            idle_ports: self.idle_ports,
            outcome,
        }
    }

    /// The connected portion of the state machine.
    async fn drive(&mut self, session: &mut Session<D::Shell>) -> Outcome {
        let Some(shell) = session.shell.as_mut() else {
            return Outcome::Failed("session has no open shell".into());
        };

        let config = self.config.clone();
        let min_weeks = config.min_weeks;

        // UptimeCheck: prove the dialect, harvest hostname and uptime.
        let device = self.identity();
        let what = format!("{} on {device}", commands::SHOW_VERSION);
        let reply = RetryPolicy::uptime_check()
            .run(&what, &mut *shell, |sh| {
                let config = config.clone();
                let device = device.clone();
                async move {
                    let text = exec_command(
                        sh,
                        commands::SHOW_VERSION,
                        &config,
                        config.uptime_settle_delay,
                        &device,
                    )
                    .await?;
                    grammar::parse_uptime_reply(&text)
                }
                .boxed()
            })
            .await;
        let parsed = match reply {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("uptime check failed for {}: {e}", self.identity());
                return Outcome::Failed(e.to_string());
            }
        };
        if self.hostname.is_none() {
            self.hostname = parsed.hostname;
        }
        self.uptime = Some(parsed.fact);

        if !parsed.fact.sufficient(min_weeks) {
            warn!(
                "uptime of {} is {}, below the {min_weeks}-week minimum",
                self.identity(),
                parsed.fact.summary()
            );
            return Outcome::UptimeInsufficient;
        }
        info!(
            "uptime of {} is {}, continuing",
            self.identity(),
            parsed.fact.summary()
        );

        // PortEnumeration: collect notconnect interfaces.
        let device = self.identity();
        let what = format!("{} on {device}", commands::SHOW_INTERFACE_STATUS);
        let enumerated = RetryPolicy::port_enumeration()
            .run(&what, &mut *shell, |sh| {
                let config = config.clone();
                let device = device.clone();
                async move {
                    let text = exec_command(
                        sh,
                        commands::SHOW_INTERFACE_STATUS,
                        &config,
                        config.settle_delay,
                        &device,
                    )
                    .await?;
                    grammar::parse_interface_status(&text, &device)
                }
                .boxed()
            })
            .await;
        let down = match enumerated {
            Ok(down) => down,
            Err(e) => {
                error!("interface enumeration failed for {device}: {e}");
                return Outcome::Failed(e.to_string());
            }
        };
        if down.is_empty() {
            info!("{device} has no notconnect interfaces");
            return Outcome::NoIdlePorts;
        }
        info!(
            "{device} has {} notconnect interfaces, checking last input on each",
            down.len()
        );
        debug!("notconnect interfaces on {device}: {down:?}");

        // PortInspection: one command per admissible interface.
        for interface in &down {
            match grammar::admissible(interface, &device) {
                Ok(true) => {}
                Ok(false) => {
                    debug!("{interface} on {device} is outside the supported chassis range");
                    continue;
                }
                Err(e) => {
                    error!("admissibility check failed for {interface} on {device}: {e}");
                    return Outcome::Failed(e.to_string());
                }
            }

            let what = format!("show int {interface} on {device}");
            let inspected = RetryPolicy::port_inspection()
                .run(&what, &mut *shell, |sh| {
                    let config = config.clone();
                    let device = device.clone();
                    let interface = interface.clone();
                    async move {
                        let text = exec_command(
                            sh,
                            &commands::show_interface(&interface),
                            &config,
                            config.settle_delay,
                            &device,
                        )
                        .await?;
                        grammar::parse_last_input(&text, min_weeks, &device)
                    }
                    .boxed()
                })
                .await;
            match inspected {
                Ok(Some(last_input)) => {
                    debug!("{interface} on {device}: last input {last_input}");
                    self.idle_ports.push(IdleRecord {
                        interface: interface.clone(),
                        last_input,
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    error!("last-input check failed for {interface} on {device}: {e}");
                    return Outcome::Failed(e.to_string());
                }
            }
        }

        info!(
            "{} idle interfaces over {min_weeks} weeks found on {device}",
            self.idle_ports.len()
        );
        Outcome::Success
    }
}

/// Issue one command and return its reply text.
///
/// Waits for the first reply bytes by busy-polling at the configured spin
/// interval, then pauses for the settle delay before draining: the device
/// may flush its reply in parts, and reading on first-ready truncates it.
async fn exec_command<S: ShellChannel>(
    shell: &mut S,
    command: &str,
    config: &AuditConfig,
    settle: Duration,
    device: &str,
) -> Result<String> {
    debug!("sending '{command}' to {device}");
    shell.send_line(command).await?;

    let deadline = Instant::now() + config.command_timeout;
    while !shell.recv_ready().await? {
        if Instant::now() >= deadline {
            return Err(ConnectionError::Timeout(config.command_timeout).into());
        }
        sleep(config.poll_interval).await;
    }
    sleep(settle).await;

    shell.recv().await
}
