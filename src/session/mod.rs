//! Device sessions and the keyed session registry.
//!
//! At most one live session exists per (address, username, secret) triple;
//! the registry owns the connect/disconnect lifecycle and releasing an
//! entry makes the key available for a later scheduled run.

mod registry;

pub use registry::{SessionRegistry, SharedSession};

use std::fmt;
use std::hash::{Hash, Hasher};

use secrecy::{ExposeSecret, SecretString};

use crate::transport::{ShellChannel, ShellConfig};

/// Identity of one session: address plus the credential used to open it.
#[derive(Clone)]
pub struct SessionKey {
    /// Device address as text.
    pub address: String,

    /// Account username.
    pub username: String,

    secret: SecretString,
}

impl SessionKey {
    /// Build a key. Field validation happens in the registry, which is the
    /// only place keys are minted during a run.
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        secret: SecretString,
    ) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            secret,
        }
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
            && self.username == other.username
            && self.secret.expose_secret() == other.secret.expose_secret()
    }
}

impl Eq for SessionKey {}

impl Hash for SessionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
        self.username.hash(state);
        self.secret.expose_secret().hash(state);
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// One device session: the shell (once connected) plus its bookkeeping.
///
/// Owned by exactly one state machine at a time; concurrent acquisition of
/// the same key yields the same session object, never two half-initialized
/// ones.
pub struct Session<S: ShellChannel> {
    key: SessionKey,
    shell_config: ShellConfig,

    /// Open shell, present between connect and release.
    pub(crate) shell: Option<S>,

    /// Whether the device is usable for report retrieval. Set on connect,
    /// cleared when a probe dies of an unexpected fault.
    pub valid: bool,
}

impl<S: ShellChannel> Session<S> {
    pub(crate) fn new(key: SessionKey, shell_config: ShellConfig) -> Self {
        Self {
            key,
            shell_config,
            shell: None,
            valid: false,
        }
    }

    /// The key this session is registered under.
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Connection parameters for this session's device.
    pub(crate) fn shell_config(&self) -> &ShellConfig {
        &self.shell_config
    }

    /// Whether a shell is currently open.
    pub fn is_connected(&self) -> bool {
        self.shell.is_some()
    }
}
