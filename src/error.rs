//! Error types for idleport.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for idleport operations.
///
/// Policy rejections (insufficient uptime, zero idle ports) are *not* errors;
/// they are terminal outcomes on [`DeviceResult`](crate::report::DeviceResult).
/// Everything here is a fault.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors. The only transient kind: command-level
    /// retries treat these as worth another attempt.
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// A device replied, but not in the expected shape (truncated reply,
    /// unknown command dialect, missing fields).
    #[error("validation error: {0}")]
    Validation(String),

    /// Unexpected fault, wrapped with enough context to diagnose.
    #[error("unknown error on {device}: {message}")]
    Unknown { device: String, message: String },

    /// A session key field was empty at acquisition time.
    #[error("invalid session key: {0} must not be empty")]
    InvalidKey(&'static str),

    /// A candidate-address spec could not be expanded.
    #[error("invalid address spec '{0}'")]
    InvalidAddress(String),
}

impl Error {
    /// Whether a fresh connection attempt could plausibly clear this error.
    ///
    /// Validation and unknown errors already survived command-level retries,
    /// so they are terminal for the device.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}

/// Transport layer errors (TCP connect, SSH handshake, channel I/O).
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The TCP/SSH connect did not complete in time. Usually a wrong or
    /// unreachable address rather than a slow device.
    #[error("connect to {host}:{port} timed out after {timeout:?} - check the supplied address")]
    ConnectTimeout {
        host: String,
        port: u16,
        timeout: Duration,
    },

    /// SSH protocol or handshake error.
    #[error("ssh error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed.
    #[error("authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// The remote side closed the channel.
    #[error("channel closed by peer")]
    Closed,

    /// No reply arrived within the command timeout.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias using idleport's Error.
pub type Result<T> = std::result::Result<T, Error>;
