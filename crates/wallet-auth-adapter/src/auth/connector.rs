/*
[INPUT]:  Wallet provider capability and connector configuration
[OUTPUT]: Cached wallet session, signature proofs, session-change notifications
[POS]:    Auth layer - wallet connection lifecycle management
[UPDATE]: When connection rules or session invalidation semantics change
*/

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::auth::subscription::{Handler, HandlerRegistry, Subscription};
use crate::auth::WalletProvider;
use crate::http::{AuthError, Result};
use crate::types::{Challenge, ProviderAccount, SignatureProof, WalletSession};

/// Connector configuration
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Upper bound on how long a connect prompt may stay unanswered
    pub connect_timeout: Duration,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(120),
        }
    }
}

/// State shared with the provider event handlers
#[derive(Debug)]
struct Shared {
    session: RwLock<Option<WalletSession>>,
    epoch: watch::Sender<u64>,
    account_handlers: HandlerRegistry<Option<WalletSession>>,
    network_handlers: HandlerRegistry<Option<String>>,
}

impl Shared {
    fn read(&self) -> RwLockReadGuard<'_, Option<WalletSession>> {
        self.session.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<WalletSession>> {
        self.session.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Must be called with the session write lock held so commits made under
    /// the read lock are ordered against invalidation.
    fn bump_epoch(&self) {
        self.epoch.send_modify(|epoch| *epoch += 1);
    }

    fn apply_account_change(&self, account: &Option<ProviderAccount>) {
        let view = {
            let mut session = self.write();
            let Some(current) = session.as_ref() else {
                debug!("account change ignored, no wallet session");
                return;
            };

            match account {
                Some(next) if next.address == current.address => return,
                Some(next) => {
                    info!(from = %current.address, to = %next.address, "wallet account changed");
                    let network = current.network.clone();
                    *session = Some(WalletSession::from_account(next.clone(), network));
                }
                None => {
                    info!(address = %current.address, "wallet disconnected by provider");
                    *session = None;
                }
            }
            self.bump_epoch();
            (*session).clone()
        };
        self.account_handlers.emit(&view);
    }

    fn apply_network_change(&self, network: &Option<String>) {
        {
            let mut session = self.write();
            let Some(current) = session.as_mut() else {
                debug!("network change ignored, no wallet session");
                return;
            };
            if current.network == *network {
                return;
            }
            info!(from = ?current.network, to = ?network, "wallet network changed");
            current.network = network.clone();
            self.bump_epoch();
        }
        self.network_handlers.emit(network);
    }
}

/// Adapter over a wallet provider
pub struct WalletConnector {
    provider: Arc<dyn WalletProvider>,
    config: ConnectorConfig,
    shared: Arc<Shared>,
    connect_lock: Mutex<()>,
    _provider_subscriptions: Vec<Subscription>,
}

impl WalletConnector {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self::with_config(provider, ConnectorConfig::default())
    }

    pub fn with_config(provider: Arc<dyn WalletProvider>, config: ConnectorConfig) -> Self {
        let (epoch, _rx) = watch::channel(0u64);
        let shared = Arc::new(Shared {
            session: RwLock::new(None),
            epoch,
            account_handlers: HandlerRegistry::new(),
            network_handlers: HandlerRegistry::new(),
        });

        let on_account = shared.clone();
        let on_network = shared.clone();
        let subscriptions = vec![
            provider.on_account_change(Arc::new(move |account: &Option<ProviderAccount>| {
                on_account.apply_account_change(account)
            })),
            provider.on_network_change(Arc::new(move |network: &Option<String>| {
                on_network.apply_network_change(network)
            })),
        ];

        Self {
            provider,
            config,
            shared,
            connect_lock: Mutex::new(()),
            _provider_subscriptions: subscriptions,
        }
    }

    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    pub fn is_provider_installed(&self) -> bool {
        self.provider.is_installed()
    }

    /// Cached session; never calls the provider
    pub fn current_session(&self) -> Option<WalletSession> {
        self.shared.read().clone()
    }

    /// Connect the wallet, prompting the user through the provider if needed.
    ///
    /// Concurrent calls are serialized; a call that finds a live session
    /// returns it without another prompt.
    pub async fn connect(&self, preferred_provider_id: Option<&str>) -> Result<WalletSession> {
        if !self.provider.is_installed() {
            return Err(AuthError::ProviderUnavailable);
        }
        if let Some(id) = preferred_provider_id {
            if id != self.provider.id() {
                warn!(requested = id, available = self.provider.id(), "preferred provider not available");
                return Err(AuthError::ProviderUnavailable);
            }
        }

        let _connecting = self.connect_lock.lock().await;
        if let Some(session) = self.current_session() {
            return Ok(session);
        }

        info!(provider = self.provider.id(), "requesting wallet connection");
        let account = match tokio::time::timeout(self.config.connect_timeout, self.provider.connect()).await {
            Err(_) => {
                return Err(AuthError::ConnectTimeout {
                    duration: self.config.connect_timeout.as_secs(),
                });
            }
            Ok(Err(
                e @ (AuthError::UserRejected { .. }
                | AuthError::ProviderUnavailable
                | AuthError::ConnectTimeout { .. }
                | AuthError::ConnectFailed(_)),
            )) => return Err(e),
            Ok(Err(other)) => return Err(AuthError::ConnectFailed(other.to_string())),
            Ok(Ok(account)) => account,
        };

        let network = self.provider.network().await.unwrap_or_else(|e| {
            warn!(error = %e, "failed to read wallet network");
            None
        });

        let session = WalletSession::from_account(account, network);
        *self.shared.write() = Some(session.clone());
        info!(address = %session.address, network = ?session.network, "wallet connected");
        Ok(session)
    }

    /// Disconnect the wallet; a no-op when nothing is connected
    pub async fn disconnect(&self) {
        let previous = {
            let mut session = self.shared.write();
            let previous = session.take();
            if previous.is_some() {
                self.shared.bump_epoch();
            }
            previous
        };

        let Some(previous) = previous else {
            return;
        };
        if let Err(e) = self.provider.disconnect().await {
            warn!(error = %e, "provider disconnect failed");
        }
        info!(address = %previous.address, "wallet disconnected");
    }

    /// Abort every in-flight attempt bound to the current epoch, whether or
    /// not a wallet is connected. Used when the user signs out.
    pub fn invalidate(&self) {
        let _session = self.shared.write();
        self.shared.bump_epoch();
        debug!("wallet session epoch invalidated");
    }

    /// Ask the wallet to sign a challenge. The challenge is consumed.
    pub async fn sign(&self, challenge: Challenge) -> Result<SignatureProof> {
        let session = self.current_session().filter(|session| session.connected);
        if session.is_none() {
            return Err(AuthError::NotConnected);
        }

        let Challenge { message, nonce, .. } = challenge;
        let signed = self
            .provider
            .sign_message(&message, &nonce)
            .await
            .map_err(|e| match e {
                AuthError::UserRejected { .. } | AuthError::NotConnected => e,
                other => AuthError::SignatureRejected(other.to_string()),
            })?;

        if !signed.full_message.contains(&message) {
            return Err(AuthError::SignatureRejected(
                "wallet signed a different message than requested".to_string(),
            ));
        }

        Ok(SignatureProof {
            signature: signed.signature,
            full_message: signed.full_message,
            nonce,
        })
    }

    /// Receiver whose value changes whenever the session is invalidated
    pub fn session_epoch(&self) -> watch::Receiver<u64> {
        self.shared.epoch.subscribe()
    }

    /// Run `commit` only if no invalidation happened since `epoch` was last
    /// observed. Invalidation waits for the commit to finish.
    pub fn commit_if_current<T>(
        &self,
        epoch: &watch::Receiver<u64>,
        commit: impl FnOnce() -> T,
    ) -> Result<T> {
        let _session = self.shared.read();
        match epoch.has_changed() {
            Ok(false) => Ok(commit()),
            _ => Err(AuthError::SessionChanged),
        }
    }

    /// Notified with the new session (or `None`) after an external account switch
    pub fn subscribe_account_change(
        &self,
        handler: impl Fn(&Option<WalletSession>) + Send + Sync + 'static,
    ) -> Subscription {
        let handler: Handler<Option<WalletSession>> = Arc::new(handler);
        self.shared.account_handlers.subscribe(handler)
    }

    /// Notified with the new network after an external network switch
    pub fn subscribe_network_change(
        &self,
        handler: impl Fn(&Option<String>) + Send + Sync + 'static,
    ) -> Subscription {
        let handler: Handler<Option<String>> = Arc::new(handler);
        self.shared.network_handlers.subscribe(handler)
    }
}

impl std::fmt::Debug for WalletConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConnector")
            .field("provider", &self.provider.id())
            .field("config", &self.config)
            .field("session", &self.current_session())
            .finish()
    }
}
