/*
[INPUT]:  Session credentials from successful logins, logout and 401 signals
[OUTPUT]: Shared credential state with change notifications
[POS]:    Auth layer - session credential lifecycle
[UPDATE]: When changing credential persistence or invalidation rules
*/

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::auth::token_store::{SESSION_TOKEN_KEY, TokenStore};
use crate::types::SessionCredential;

/// Signal returned when the session was revoked and the caller must route
/// back to the login entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct LoginRedirect;

/// Thread-safe holder of the current session credential
///
/// Cloning shares the same underlying state. Construct one at process start
/// and hand clones to whoever needs the credential.
#[derive(Debug, Clone)]
pub struct SessionStore {
    current: Arc<watch::Sender<Option<SessionCredential>>>,
    backing: Option<Arc<dyn TokenStore>>,
}

impl SessionStore {
    /// Create an in-memory store
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            current: Arc::new(tx),
            backing: None,
        }
    }

    /// Create a store mirrored into a durable token slot
    pub fn with_backing(backing: Arc<dyn TokenStore>) -> Self {
        Self {
            backing: Some(backing),
            ..Self::new()
        }
    }

    /// Load the persisted token, if any, into memory
    pub fn rehydrate(&self) -> Option<SessionCredential> {
        let backing = self.backing.as_ref()?;
        match backing.load(SESSION_TOKEN_KEY) {
            Ok(Some(token)) if !token.is_empty() => {
                let credential = SessionCredential::new(token);
                self.current.send_replace(Some(credential.clone()));
                info!("session rehydrated from token store");
                Some(credential)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "failed to read persisted session token");
                None
            }
        }
    }

    pub fn set(&self, credential: SessionCredential) {
        if let Some(backing) = &self.backing {
            if let Err(e) = backing.save(SESSION_TOKEN_KEY, &credential.token) {
                warn!(error = %e, "failed to persist session token");
            }
        }
        self.current.send_replace(Some(credential));
        debug!("session credential stored");
    }

    pub fn get(&self) -> Option<SessionCredential> {
        self.current.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().is_some()
    }

    pub fn clear(&self) {
        if let Some(backing) = &self.backing {
            if let Err(e) = backing.remove(SESSION_TOKEN_KEY) {
                warn!(error = %e, "failed to remove persisted session token");
            }
        }
        if self.current.send_replace(None).is_some() {
            debug!("session credential cleared");
        }
    }

    /// Drop the credential after a downstream API rejected it
    pub fn handle_unauthorized(&self) -> LoginRedirect {
        warn!("session rejected by backend, signing out");
        self.clear();
        LoginRedirect
    }

    /// Watch credential changes
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionCredential>> {
        self.current.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
