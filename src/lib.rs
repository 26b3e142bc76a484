//! # Idleport
//!
//! Async SSH audit of administratively-idle switch ports across a device
//! fleet.
//!
//! Given a candidate address set (explicit, dash ranges, or CIDR blocks —
//! see [`addresses`]), idleport TCP-probes the management port with a
//! bounded worker pool, then drives one SSH session per reachable device:
//! validate uptime, enumerate `notconnect` interfaces, and check how long
//! each admissible one has been idle. Each device yields a structured
//! [`DeviceResult`]; successful ones are handed to a [`ReportSink`] for
//! rendering.
//!
//! ## Features
//!
//! - Async SSH sessions via russh, behind a narrow transport contract
//! - Regex grammars for the device's semi-structured CLI replies
//! - Bounded-retry handling of flaky remote shells
//! - Two fixed-width worker pools (liveness, probe), partial-failure safe
//! - Keyed session registry: one live session per (address, credential)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use idleport::{run_batch, AuditConfig, LogSink, SshDialer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Arc::new(AuditConfig::new("auditor", "secret".to_string()));
//!     let addresses = vec![
//!         "192.168.1.10".parse().unwrap(),
//!         "192.168.1.11".parse().unwrap(),
//!     ];
//!
//!     let report = run_batch(config, SshDialer, addresses, Arc::new(LogSink)).await;
//!     for (address, result) in &report {
//!         println!("{address}: {:?}", result.outcome);
//!     }
//! }
//! ```

pub mod addresses;
pub mod config;
pub mod device;
pub mod error;
pub mod report;
pub mod retry;
pub mod session;
pub mod transport;
pub mod worker;

// Re-export main types for convenience
pub use config::AuditConfig;
pub use device::DeviceProbe;
pub use error::{ConnectionError, Error, Result};
pub use report::{
    Aggregate, DeviceResult, IdleRecord, LastInput, LogSink, Outcome, ReportSink, SinkError,
    UptimeFact,
};
pub use retry::RetryPolicy;
pub use session::{Session, SessionKey, SessionRegistry};
pub use transport::{Dial, ShellChannel, ShellConfig, SshDialer, SshShell};
pub use worker::{run_batch, LivenessProber, Orchestrator};
