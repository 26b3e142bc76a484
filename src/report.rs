//! Per-device results and the rendering-sink interface.
//!
//! Rendering itself (spreadsheet, text file, console) lives outside this
//! crate. The core hands each successful [`DeviceResult`] to a
//! [`ReportSink`] and only looks at whether the hand-off succeeded.

use std::fmt;
use std::net::Ipv4Addr;

use indexmap::IndexMap;
use log::info;
use serde::Serialize;
use thiserror::Error;

/// Elapsed time since boot as parsed from the device's version reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UptimeFact {
    /// Year component, when the reply carried one.
    pub years: Option<u64>,

    /// Week component, when the reply carried one.
    pub weeks: Option<u64>,
}

impl UptimeFact {
    /// Whether this uptime clears the policy threshold.
    ///
    /// A year component is always sufficient. Without one, the week count
    /// must be present and at least `min_weeks`.
    pub fn sufficient(&self, min_weeks: u64) -> bool {
        if self.years.is_some() {
            return true;
        }
        match self.weeks {
            Some(weeks) => weeks >= min_weeks,
            None => false,
        }
    }

    /// Human-readable rendering, e.g. `2 year(s), 3 week(s)`.
    pub fn summary(&self) -> String {
        match (self.years, self.weeks) {
            (Some(years), Some(weeks)) => format!("{years} year(s), {weeks} week(s)"),
            (Some(years), None) => format!("{years} year(s)"),
            (None, Some(weeks)) => format!("{weeks} week(s)"),
            (None, None) => "< 1 week".to_string(),
        }
    }
}

impl fmt::Display for UptimeFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

/// How long an interface has been idle, as self-reported by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LastInput {
    /// The interface never carried traffic.
    Never,

    /// Idle for the given raw duration token (e.g. `13w2d`).
    Weeks {
        /// The token exactly as the device printed it.
        raw: String,
        /// Parsed week count.
        weeks: u64,
    },
}

impl fmt::Display for LastInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastInput::Never => write!(f, "never"),
            LastInput::Weeks { raw, .. } => write!(f, "{raw}"),
        }
    }
}

/// One interface that qualified as idle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdleRecord {
    /// Interface name as enumerated (e.g. `gi1/0/2`).
    pub interface: String,

    /// Idle duration that qualified it.
    pub last_input: LastInput,
}

/// Terminal state of one device's probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// Every admissible port was inspected.
    Success,

    /// Uptime below the policy threshold; port data would be misleading.
    UptimeInsufficient,

    /// The device has no `notconnect` interfaces.
    NoIdlePorts,

    /// A fault terminated the probe (summarized message).
    Failed(String),
}

/// Everything learned about one device.
///
/// Created once per validated address and immutable after the probe
/// terminates, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceResult {
    /// The probed address.
    pub address: Ipv4Addr,

    /// Self-reported hostname, when the version reply revealed one.
    pub hostname: Option<String>,

    /// Parsed uptime, when the probe got that far.
    pub uptime: Option<UptimeFact>,

    /// Qualifying idle interfaces, in enumeration order.
    pub idle_ports: Vec<IdleRecord>,

    /// How the probe terminated.
    pub outcome: Outcome,
}

impl DeviceResult {
    /// Whether the probe reached `Terminated{Success}`.
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Hostname when known, address otherwise.
    pub fn display_name(&self) -> String {
        match &self.hostname {
            Some(hostname) => hostname.clone(),
            None => self.address.to_string(),
        }
    }

    /// Uptime rendering, `unknown` when the probe never parsed one.
    pub fn uptime_summary(&self) -> String {
        match &self.uptime {
            Some(fact) => fact.summary(),
            None => "unknown".to_string(),
        }
    }
}

/// Shared result aggregate: device address to result, insertion-ordered.
pub type Aggregate = IndexMap<Ipv4Addr, DeviceResult>;

/// Error returned by a report sink.
#[derive(Debug, Error)]
#[error("report sink error: {0}")]
pub struct SinkError(pub String);

/// Receiver for successful device results.
///
/// The core forwards each `Terminated{Success}` result exactly once and
/// downgrades any sink failure to a warning; a broken sink never aborts the
/// batch.
pub trait ReportSink: Send + Sync {
    /// Render or store one device's result.
    fn submit(&self, result: &DeviceResult) -> std::result::Result<(), SinkError>;
}

/// Reference sink that renders results to the log.
pub struct LogSink;

impl ReportSink for LogSink {
    fn submit(&self, result: &DeviceResult) -> std::result::Result<(), SinkError> {
        info!(
            "{}: uptime {}",
            result.display_name(),
            result.uptime_summary()
        );
        for record in &result.idle_ports {
            info!("Interface {}, Last input {}", record.interface, record.last_input);
        }
        Ok(())
    }
}
