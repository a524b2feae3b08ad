/*
[INPUT]:  Provider answers, challenge construction, backend answers
[OUTPUT]: Wallet session, challenge, proof and credential models
[POS]:    Data layer - domain models flowing through an attempt
[UPDATE]: When the session shape or proof contents change
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AttemptKind;

/// Account reported by a wallet provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAccount {
    pub address: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

/// Provider answer to a sign request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMessage {
    pub signature: String,
    /// The exact text the wallet signed, including any provider envelope
    pub full_message: String,
}

/// Client view of a connected wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    pub address: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
    pub connected: bool,
    pub network: Option<String>,
}

impl WalletSession {
    pub fn from_account(account: ProviderAccount, network: Option<String>) -> Self {
        Self {
            address: account.address,
            public_key: account.public_key,
            connected: true,
            network,
        }
    }
}

/// One-time message a wallet must sign
///
/// Not `Clone`: a challenge is moved into the signer and cannot be reused.
#[derive(Debug, PartialEq, Eq)]
pub struct Challenge {
    pub message: String,
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
    pub kind: AttemptKind,
}

/// Signature over a challenge, consumed by a single verification request
#[derive(Debug, PartialEq, Eq)]
pub struct SignatureProof {
    pub signature: String,
    pub full_message: String,
    pub nonce: String,
}

/// Backend-issued session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredential {
    pub token: String,
}

impl SessionCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

/// Correlation record for one authenticate-or-link call
#[derive(Debug, Clone)]
pub struct AuthAttempt {
    pub id: Uuid,
    pub kind: AttemptKind,
    pub started_at: DateTime<Utc>,
}

impl AuthAttempt {
    pub fn new(kind: AttemptKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            started_at: Utc::now(),
        }
    }
}
