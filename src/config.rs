//! Run configuration.
//!
//! One [`AuditConfig`] is built at process start and passed explicitly to
//! every component that needs it. Nothing in the crate reads global state.

use std::time::Duration;

use secrecy::SecretString;

/// Configuration for one audit run.
///
/// Constructed with [`AuditConfig::new`] and adjusted through the `with_*`
/// methods. The defaults match the timings the fleet devices are known to
/// tolerate; the concurrency bound is fixed rather than adaptive.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Username for the management account.
    pub username: String,

    /// Secret for the management account. Never logged.
    pub password: SecretString,

    /// TCP port used for both liveness probing and the SSH session.
    pub management_port: u16,

    /// Minimum uptime, in weeks, below which a device is skipped. Also the
    /// idle threshold a port's last-input age must strictly exceed.
    pub min_weeks: u64,

    /// Worker count for each of the two pools (liveness, probe).
    pub pool_width: usize,

    /// Per-address timeout for the TCP liveness probe.
    pub liveness_timeout: Duration,

    /// Timeout for establishing one SSH session.
    pub connect_timeout: Duration,

    /// How long to wait for the first byte of a command reply.
    pub command_timeout: Duration,

    /// Spin interval while busy-polling for reply data.
    pub poll_interval: Duration,

    /// Pause between first-data and reading the buffer. Devices flush their
    /// replies in parts; reading immediately truncates the data.
    pub settle_delay: Duration,

    /// Settle delay for the version/uptime command, whose reply is larger
    /// and slower to flush than the per-interface ones.
    pub uptime_settle_delay: Duration,

    /// Pause before returning from a run that found no reachable devices,
    /// so an operator watching the console can read the error.
    pub grace_delay: Duration,

    /// Terminal width requested for the PTY.
    pub terminal_width: u32,

    /// Terminal height requested for the PTY.
    pub terminal_height: u32,
}

impl AuditConfig {
    /// Create a configuration with the given credentials and default timings.
    pub fn new(username: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            management_port: 22,
            min_weeks: 12,
            pool_width: 50,
            liveness_timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(20),
            command_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
            settle_delay: Duration::from_millis(200),
            uptime_settle_delay: Duration::from_millis(500),
            grace_delay: Duration::from_secs(10),
            terminal_width: 1000,
            terminal_height: 1000,
        }
    }

    /// Set the management port.
    pub fn with_management_port(mut self, port: u16) -> Self {
        self.management_port = port;
        self
    }

    /// Set the minimum-week threshold.
    pub fn with_min_weeks(mut self, weeks: u64) -> Self {
        self.min_weeks = weeks;
        self
    }

    /// Set the worker count used by both pools.
    pub fn with_pool_width(mut self, width: usize) -> Self {
        self.pool_width = width;
        self
    }

    /// Set the per-address liveness probe timeout.
    pub fn with_liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = timeout;
        self
    }

    /// Set the SSH connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the command reply timeout.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the grace delay applied before returning from an empty run.
    pub fn with_grace_delay(mut self, delay: Duration) -> Self {
        self.grace_delay = delay;
        self
    }
}
