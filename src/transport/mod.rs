//! Remote shell transport layer.
//!
//! The rest of the crate depends only on the narrow [`Dial`] and
//! [`ShellChannel`] contracts, never on a specific SSH library surface.
//! [`SshDialer`] is the production implementation; tests substitute a
//! scripted fake through the same traits.

mod buffer;
pub mod config;
mod ssh;

#[cfg(test)]
pub(crate) mod fake;

pub use buffer::ReplyBuffer;
pub use config::ShellConfig;
pub use ssh::{SshDialer, SshShell};

use std::future::Future;

use crate::error::Result;

/// Capability to open an interactive shell session on a device.
pub trait Dial: Send + Sync + 'static {
    /// The shell type this dialer produces.
    type Shell: ShellChannel + 'static;

    /// Connect, authenticate, and open an interactive shell.
    fn dial(&self, config: &ShellConfig) -> impl Future<Output = Result<Self::Shell>> + Send;
}

/// An open interactive shell on one device.
///
/// Mirrors the primitives the probing logic actually needs: write a line,
/// ask whether reply data is waiting, drain the reply, hang up. The
/// busy-poll/settle discipline around these lives with the caller.
pub trait ShellChannel: Send {
    /// Send one command line (terminator appended by the implementation).
    fn send_line(&mut self, line: &str) -> impl Future<Output = Result<()>> + Send;

    /// Whether reply data is waiting to be read. Must not block for long.
    fn recv_ready(&mut self) -> impl Future<Output = Result<bool>> + Send;

    /// Drain the accumulated reply as text.
    fn recv(&mut self) -> impl Future<Output = Result<String>> + Send;

    /// Close the shell and the underlying connection.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
