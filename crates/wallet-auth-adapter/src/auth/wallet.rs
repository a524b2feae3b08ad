/*
[INPUT]:  Wallet provider capability (connect, sign, account queries, events)
[OUTPUT]: Provider abstraction and a scriptable mock provider
[POS]:    Auth layer - wallet provider integration boundary
[UPDATE]: When adding provider capabilities or changing event semantics
*/

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::auth::subscription::{Handler, HandlerRegistry, Subscription};
use crate::http::{AuthError, Result};
use crate::types::{ProviderAccount, SignedMessage};

/// Capability exposed by a wallet provider
///
/// The provider is passed explicitly to the connector; nothing reaches for a
/// global provider object. Event handlers may be invoked from any thread at
/// any time, including while a connect or sign call is pending.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Stable identifier of the provider implementation
    fn id(&self) -> &str;

    /// Whether the provider is available on this host at all
    fn is_installed(&self) -> bool;

    /// Ask the user to connect; resolves once the provider acknowledges the
    /// connection with the selected account.
    async fn connect(&self) -> Result<ProviderAccount>;

    async fn disconnect(&self) -> Result<()>;

    /// Sign `message`; the provider may wrap it in its own envelope, which is
    /// reported back in `SignedMessage::full_message`.
    async fn sign_message(&self, message: &str, nonce: &str) -> Result<SignedMessage>;

    async fn account(&self) -> Result<Option<ProviderAccount>>;

    async fn network(&self) -> Result<Option<String>>;

    /// Register a handler for external account switches (`None` = the wallet
    /// disconnected itself)
    fn on_account_change(&self, handler: Handler<Option<ProviderAccount>>) -> Subscription;

    /// Register a handler for external network switches
    fn on_network_change(&self, handler: Handler<Option<String>>) -> Subscription;
}

/// Envelope mock and local providers wrap around signed messages
pub fn sign_envelope(message: &str, nonce: &str) -> String {
    format!("WALLET\nmessage: {message}\nnonce: {nonce}")
}

/// How the mock answers a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockResponse {
    Approve,
    Reject,
    /// Never answer (for timeout tests)
    Hang,
}

#[derive(Debug)]
struct MockState {
    installed: bool,
    account: ProviderAccount,
    network: Option<String>,
    connected: bool,
    connect_response: MockResponse,
    sign_response: MockResponse,
    switch_on_sign: Option<ProviderAccount>,
    sign_gate: Option<Arc<Notify>>,
}

/// Scriptable wallet provider for testing
#[derive(Debug)]
pub struct MockWalletProvider {
    state: Mutex<MockState>,
    connect_calls: AtomicUsize,
    sign_calls: AtomicUsize,
    accounts: HandlerRegistry<Option<ProviderAccount>>,
    networks: HandlerRegistry<Option<String>>,
}

impl MockWalletProvider {
    /// Create an installed provider that approves every prompt
    pub fn new(address: &str, public_key: &str) -> Self {
        Self {
            state: Mutex::new(MockState {
                installed: true,
                account: ProviderAccount {
                    address: address.to_string(),
                    public_key: public_key.to_string(),
                },
                network: Some("mainnet".to_string()),
                connected: false,
                connect_response: MockResponse::Approve,
                sign_response: MockResponse::Approve,
                switch_on_sign: None,
                sign_gate: None,
            }),
            connect_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
            accounts: HandlerRegistry::new(),
            networks: HandlerRegistry::new(),
        }
    }

    /// Create a provider that reports itself as not installed
    pub fn not_installed() -> Self {
        let provider = Self::new("", "");
        provider.state().installed = false;
        provider
    }

    pub fn set_connect_response(&self, response: MockResponse) {
        self.state().connect_response = response;
    }

    pub fn set_sign_response(&self, response: MockResponse) {
        self.state().sign_response = response;
    }

    /// Switch to `account` (emitting an account-change event) while the next
    /// sign request is being answered
    pub fn switch_account_on_sign(&self, account: ProviderAccount) {
        self.state().switch_on_sign = Some(account);
    }

    /// Hold every sign request until the returned gate is notified
    pub fn hold_sign(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state().sign_gate = Some(gate.clone());
        gate
    }

    /// Simulate the user switching accounts inside the wallet
    pub fn emit_account_change(&self, account: Option<ProviderAccount>) {
        {
            let mut state = self.state();
            match &account {
                Some(next) => state.account = next.clone(),
                None => state.connected = false,
            }
        }
        self.accounts.emit(&account);
    }

    /// Simulate the user switching networks inside the wallet
    pub fn emit_network_change(&self, network: Option<String>) {
        self.state().network = network.clone();
        self.networks.emit(&network);
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    fn id(&self) -> &str {
        "mock"
    }

    fn is_installed(&self) -> bool {
        self.state().installed
    }

    async fn connect(&self) -> Result<ProviderAccount> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let response = self.state().connect_response;
        match response {
            MockResponse::Approve => {
                let mut state = self.state();
                state.connected = true;
                Ok(state.account.clone())
            }
            MockResponse::Reject => Err(AuthError::UserRejected {
                message: "User rejected the connection request".to_string(),
            }),
            MockResponse::Hang => std::future::pending().await,
        }
    }

    async fn disconnect(&self) -> Result<()> {
        self.state().connected = false;
        Ok(())
    }

    async fn sign_message(&self, message: &str, nonce: &str) -> Result<SignedMessage> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.state().sign_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let (connected, response, switch) = {
            let mut state = self.state();
            (state.connected, state.sign_response, state.switch_on_sign.take())
        };
        if !connected {
            return Err(AuthError::NotConnected);
        }

        match response {
            MockResponse::Approve => {}
            MockResponse::Reject => {
                return Err(AuthError::UserRejected {
                    message: "User rejected the signature request".to_string(),
                });
            }
            MockResponse::Hang => return std::future::pending().await,
        }

        if let Some(account) = switch {
            self.emit_account_change(Some(account));
        }

        Ok(SignedMessage {
            signature: format!("0xsig-{nonce}"),
            full_message: sign_envelope(message, nonce),
        })
    }

    async fn account(&self) -> Result<Option<ProviderAccount>> {
        let state = self.state();
        Ok(state.connected.then(|| state.account.clone()))
    }

    async fn network(&self) -> Result<Option<String>> {
        Ok(self.state().network.clone())
    }

    fn on_account_change(&self, handler: Handler<Option<ProviderAccount>>) -> Subscription {
        self.accounts.subscribe(handler)
    }

    fn on_network_change(&self, handler: Handler<Option<String>>) -> Subscription {
        self.networks.subscribe(handler)
    }
}
