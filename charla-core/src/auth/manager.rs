//! Session manager owning the single active login

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::credentials::{Authenticator, StaticAuthenticator};
use super::session::Session;
use super::store::{FileSessionStore, SessionStore};
use crate::config::Config;

/// Gates access to the conversation and owns the current [`Session`]
pub struct SessionManager {
    authenticator: Arc<dyn Authenticator>,
    store: Arc<dyn SessionStore>,
    current: RwLock<Option<Session>>,
}

impl SessionManager {
    /// Create a logged-out manager; call [`SessionManager::restore`] once at startup
    pub fn new(authenticator: Arc<dyn Authenticator>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            authenticator,
            store,
            current: RwLock::new(None),
        }
    }

    /// Static credentials and a file store under `config_dir`, already restored
    pub fn from_config(config: &Config, config_dir: &std::path::Path) -> Self {
        let authenticator = Arc::new(StaticAuthenticator::new(Duration::from_millis(
            config.auth.login_delay_ms,
        )));
        let store = Arc::new(FileSessionStore::new(config_dir));
        let manager = Self::new(authenticator, store);
        manager.restore();
        manager
    }

    /// Rehydrate a previously saved session.
    ///
    /// The record is trusted as-is. A missing, unreadable or malformed
    /// record leaves the manager logged out.
    pub fn restore(&self) -> Option<Session> {
        let raw = match self.store.load() {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read saved session: {}", e);
                return None;
            }
        };

        match Session::from_json(&raw) {
            Ok(session) => {
                info!(username = %session.username, "Restored saved session");
                *self.current.write() = Some(session.clone());
                Some(session)
            }
            Err(e) => {
                warn!("Ignoring malformed saved session: {}", e);
                None
            }
        }
    }

    /// Check credentials and, on match, start and persist a session.
    ///
    /// Bad credentials are a normal `false`, not an error; the current
    /// session is left untouched in that case.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        let Some(session) = self.authenticator.validate(username, password).await else {
            info!(username, "Login rejected");
            return false;
        };

        match session.to_json() {
            Ok(record) => {
                if let Err(e) = self.store.save(&record) {
                    warn!("Failed to persist session: {}", e);
                }
            }
            Err(e) => warn!("Failed to encode session: {}", e),
        }

        info!(username = %session.username, "Logged in");
        *self.current.write() = Some(session);
        true
    }

    /// End the current session; a no-op when logged out
    pub fn logout(&self) {
        let previous = self.current.write().take();
        if let Err(e) = self.store.clear() {
            warn!("Failed to remove saved session: {}", e);
        }
        if let Some(session) = previous {
            info!(username = %session.username, "Logged out");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn current(&self) -> Option<Session> {
        self.current.read().clone()
    }

    pub fn username(&self) -> Option<String> {
        self.current.read().as_ref().map(|s| s.username.clone())
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("current", &*self.current.read())
            .finish_non_exhaustive()
    }
}
