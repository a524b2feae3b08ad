/*
[INPUT]:  Connected wallet session and a signature proof
[OUTPUT]: Verification request body for the backend
[POS]:    Data layer - outbound request schema
[UPDATE]: When the verification request body changes
*/

use serde::Serialize;

use super::models::{SignatureProof, WalletSession};

/// Body of `POST /auth/wallet` and `POST /auth/link-wallet`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletVerifyRequest {
    pub address: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
    pub signature: String,
    pub message: String,
    pub nonce: String,
}

impl WalletVerifyRequest {
    /// Build the request, consuming the proof so it cannot be submitted twice.
    pub fn new(session: &WalletSession, proof: SignatureProof) -> Self {
        Self {
            address: session.address.clone(),
            public_key: session.public_key.clone(),
            signature: proof.signature,
            message: proof.full_message,
            nonce: proof.nonce,
        }
    }
}
