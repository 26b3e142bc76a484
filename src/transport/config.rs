//! Shell connection configuration.

use std::time::Duration;

use secrecy::SecretString;

use crate::config::AuditConfig;

/// Parameters for one shell connection.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Target host (IP address as text).
    pub host: String,

    /// SSH port.
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Password for authentication. Never logged.
    pub password: SecretString,

    /// Timeout for the whole connect-and-authenticate sequence.
    pub connect_timeout: Duration,

    /// Terminal width for the PTY.
    pub terminal_width: u32,

    /// Terminal height for the PTY.
    pub terminal_height: u32,
}

impl ShellConfig {
    /// Derive the connection parameters for one device from the run config.
    pub fn for_host(audit: &AuditConfig, host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: audit.management_port,
            username: audit.username.clone(),
            password: audit.password.clone(),
            connect_timeout: audit.connect_timeout,
            terminal_width: audit.terminal_width,
            terminal_height: audit.terminal_height,
        }
    }
}
