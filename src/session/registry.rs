//! Keyed store of live sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use log::{debug, info};
use secrecy::ExposeSecret;
use tokio::sync::Mutex as AsyncMutex;

use super::{Session, SessionKey};
use crate::config::AuditConfig;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::transport::{Dial, ShellConfig};

/// A session shared between the registry and the state machine driving it.
pub type SharedSession<S> = Arc<AsyncMutex<Session<S>>>;

/// Keyed cache of at most one live session per (address, username, secret).
///
/// Lookups and mutations are atomic with respect to concurrent callers:
/// workers racing on the same key observe a single session. `release` makes
/// the key available again, which scheduled re-runs rely on.
pub struct SessionRegistry<D: Dial> {
    dialer: D,
    config: Arc<AuditConfig>,
    sessions: Mutex<HashMap<SessionKey, SharedSession<D::Shell>>>,
}

impl<D: Dial> SessionRegistry<D> {
    /// Create an empty registry using `dialer` to open shells.
    pub fn new(dialer: D, config: Arc<AuditConfig>) -> Self {
        Self {
            dialer,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Mint the session key for `host` under the run's credentials.
    ///
    /// Empty key fields are a configuration fault, surfaced here rather
    /// than as a confusing authentication failure later.
    pub fn session_key(&self, host: &str) -> Result<SessionKey> {
        if host.is_empty() {
            return Err(Error::InvalidKey("address"));
        }
        if self.config.username.is_empty() {
            return Err(Error::InvalidKey("username"));
        }
        if self.config.password.expose_secret().is_empty() {
            return Err(Error::InvalidKey("secret"));
        }
        Ok(SessionKey::new(
            host,
            &self.config.username,
            self.config.password.clone(),
        ))
    }

    /// Return the session registered under `key`, creating and registering
    /// one if absent.
    pub fn acquire(&self, key: &SessionKey) -> SharedSession<D::Shell> {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(existing) = sessions.get(key) {
            debug!("reusing registered session for {}", key.address);
            return existing.clone();
        }
        debug!("registering new session for {}", key.address);
        let shell_config = ShellConfig::for_host(&self.config, &key.address);
        let session = Arc::new(AsyncMutex::new(Session::new(key.clone(), shell_config)));
        sessions.insert(key.clone(), session.clone());
        session
    }

    /// Open the session's shell, retrying transient connect failures.
    ///
    /// A no-op when the shell is already open. On success the session is
    /// marked valid.
    pub async fn connect(&self, session: &SharedSession<D::Shell>) -> Result<()> {
        let mut guard = session.lock().await;
        if guard.shell.is_some() {
            debug!("session for {} already connected", guard.key().address);
            return Ok(());
        }

        let what = format!("ssh connect to {}", guard.key().address);
        let shell = RetryPolicy::connect()
            .run(&what, &mut (&self.dialer, &mut *guard), |(dialer, session)| {
                async move { dialer.dial(session.shell_config()).await }.boxed()
            })
            .await?;

        info!("ssh connection to {} established", guard.key().address);
        guard.shell = Some(shell);
        guard.valid = true;
        Ok(())
    }

    /// Remove the entry for `key`, closing its shell if one is open.
    ///
    /// Safe to call for keys that were never registered or were already
    /// released.
    pub async fn release(&self, key: &SessionKey) {
        let removed = self.sessions.lock().unwrap().remove(key);
        let Some(session) = removed else {
            return;
        };
        let mut guard = session.lock().await;
        if let Some(mut shell) = guard.shell.take() {
            use crate::transport::ShellChannel;
            if let Err(e) = shell.close().await {
                debug!("error closing shell for {}: {e}", key.address);
            }
        }
        debug!("released session for {}", key.address);
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Whether no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::fake::{FakeDialer, Script};

    fn test_config() -> Arc<AuditConfig> {
        Arc::new(AuditConfig::new("auditor", "hunter2".to_string()))
    }

    #[tokio::test]
    async fn test_empty_credentials_rejected() {
        let registry = SessionRegistry::new(
            FakeDialer::new(),
            Arc::new(AuditConfig::new("", "secret".to_string())),
        );
        match registry.session_key("10.0.0.1") {
            Err(Error::InvalidKey(field)) => assert_eq!(field, "username"),
            other => panic!("unexpected: {other:?}"),
        }

        let registry = SessionRegistry::new(
            FakeDialer::new(),
            Arc::new(AuditConfig::new("auditor", "".to_string())),
        );
        assert!(matches!(
            registry.session_key("10.0.0.1"),
            Err(Error::InvalidKey("secret"))
        ));
        assert!(matches!(
            registry.session_key(""),
            Err(Error::InvalidKey("address"))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_acquire_yields_one_session() {
        let registry = Arc::new(SessionRegistry::new(FakeDialer::new(), test_config()));
        let key = registry.session_key("10.0.0.1").unwrap();

        let first = {
            let registry = registry.clone();
            let key = key.clone();
            tokio::spawn(async move { registry.acquire(&key) })
        };
        let second = {
            let registry = registry.clone();
            let key = key.clone();
            tokio::spawn(async move { registry.acquire(&key) })
        };

        let first = first.await.unwrap();
        let second = second.await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_retries_transient_failures() {
        let dialer = FakeDialer::new();
        dialer.device("10.0.0.1", Script::new());
        dialer.fail_dials("10.0.0.1", 2);

        let registry = SessionRegistry::new(dialer.clone(), test_config());
        let key = registry.session_key("10.0.0.1").unwrap();
        let session = registry.acquire(&key);

        registry.connect(&session).await.unwrap();
        assert_eq!(dialer.dial_count(), 3);
        assert!(session.lock().await.is_connected());
        assert!(session.lock().await.valid);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_exhaustion_returns_error() {
        let dialer = FakeDialer::new();
        dialer.device("10.0.0.1", Script::new());
        dialer.fail_dials("10.0.0.1", 10);

        let registry = SessionRegistry::new(dialer.clone(), test_config());
        let key = registry.session_key("10.0.0.1").unwrap();
        let session = registry.acquire(&key);

        let err = registry.connect(&session).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(dialer.dial_count(), 3);
        assert!(!session.lock().await.is_connected());
    }

    #[tokio::test]
    async fn test_release_absent_key_is_safe() {
        let registry = SessionRegistry::new(FakeDialer::new(), test_config());
        let key = registry.session_key("10.0.0.9").unwrap();
        registry.release(&key).await;
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_release_permits_reacquisition() {
        let registry = SessionRegistry::new(FakeDialer::new(), test_config());
        let key = registry.session_key("10.0.0.1").unwrap();

        let first = registry.acquire(&key);
        registry.release(&key).await;
        assert!(registry.is_empty());

        let second = registry.acquire(&key);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_release_closes_open_shell() {
        let dialer = FakeDialer::new();
        dialer.device("10.0.0.1", Script::new());

        let registry = SessionRegistry::new(dialer.clone(), test_config());
        let key = registry.session_key("10.0.0.1").unwrap();
        let session = registry.acquire(&key);
        registry.connect(&session).await.unwrap();

        registry.release(&key).await;
        assert_eq!(dialer.closed_count(), 1);
        assert!(!session.lock().await.is_connected());
    }
}
