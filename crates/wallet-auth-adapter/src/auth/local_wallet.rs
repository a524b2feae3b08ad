/*
[INPUT]:  Ed25519 key material and a user approval hook
[OUTPUT]: Wallet provider that signs challenges with a local key
[POS]:    Auth layer - local wallet provider implementation
[UPDATE]: When signature encoding or the approval flow changes
*/

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::debug;

use crate::auth::subscription::{Handler, Subscription};
use crate::auth::wallet::sign_envelope;
use crate::auth::{Ed25519Signer, WalletProvider};
use crate::http::{AuthError, Result};
use crate::types::{ProviderAccount, SignedMessage};

/// Decides whether the user accepts a provider prompt
#[async_trait]
pub trait Approver: Send + Sync {
    async fn approve_connect(&self, provider_id: &str, address: &str) -> bool;
    async fn approve_sign(&self, address: &str, message: &str) -> bool;
}

/// Approver that accepts every prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl Approver for AutoApprove {
    async fn approve_connect(&self, _provider_id: &str, _address: &str) -> bool {
        true
    }

    async fn approve_sign(&self, _address: &str, _message: &str) -> bool {
        true
    }
}

/// Wallet provider backed by a locally stored Ed25519 key
pub struct LocalKeyProvider {
    signer: Ed25519Signer,
    network: Option<String>,
    approver: Arc<dyn Approver>,
    connected: AtomicBool,
}

impl LocalKeyProvider {
    pub fn new(signer: Ed25519Signer, approver: Arc<dyn Approver>) -> Self {
        Self {
            signer,
            network: None,
            approver,
            connected: AtomicBool::new(false),
        }
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn signer(&self) -> &Ed25519Signer {
        &self.signer
    }

    fn account_info(&self) -> ProviderAccount {
        ProviderAccount {
            address: self.signer.address(),
            public_key: self.signer.public_key_hex(),
        }
    }
}

#[async_trait]
impl WalletProvider for LocalKeyProvider {
    fn id(&self) -> &str {
        "local-key"
    }

    fn is_installed(&self) -> bool {
        true
    }

    async fn connect(&self) -> Result<ProviderAccount> {
        let account = self.account_info();
        if !self.approver.approve_connect(self.id(), &account.address).await {
            return Err(AuthError::UserRejected {
                message: "User rejected the connection request".to_string(),
            });
        }
        self.connected.store(true, Ordering::SeqCst);
        debug!(address = %account.address, "local wallet connected");
        Ok(account)
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn sign_message(&self, message: &str, nonce: &str) -> Result<SignedMessage> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(AuthError::NotConnected);
        }
        if !self.approver.approve_sign(&self.signer.address(), message).await {
            return Err(AuthError::UserRejected {
                message: "User rejected the signature request".to_string(),
            });
        }

        let full_message = sign_envelope(message, nonce);
        let signature = self.signer.sign(full_message.as_bytes());
        Ok(SignedMessage {
            signature: format!("0x{}", hex::encode(signature.to_bytes())),
            full_message,
        })
    }

    async fn account(&self) -> Result<Option<ProviderAccount>> {
        Ok(self
            .connected
            .load(Ordering::SeqCst)
            .then(|| self.account_info()))
    }

    async fn network(&self) -> Result<Option<String>> {
        Ok(self.network.clone())
    }

    // A local key never switches account or network on its own.
    fn on_account_change(&self, _handler: Handler<Option<ProviderAccount>>) -> Subscription {
        Subscription::noop()
    }

    fn on_network_change(&self, _handler: Handler<Option<String>>) -> Subscription {
        Subscription::noop()
    }
}
