/*
[INPUT]:  WALLET_AUTH_API (backend base URL, optional)
[OUTPUT]: Console output of the login and link outcomes
[POS]:    Examples - wallet login with a locally stored key
[UPDATE]: When AuthOrchestrator, LocalKeyProvider or HttpVerificationClient API changes
*/

//! Example: wallet login with a persistent local key
//!
//! Wires `LocalKeyProvider`, `HttpVerificationClient` and `AuthOrchestrator`
//! together and runs one login followed by a wallet link.

use std::sync::Arc;

use wallet_auth_adapter::{
    ApiClient, AttemptKind, AuthOrchestrator, AutoApprove, ChallengeBuilder, ChallengeConfig,
    ClientConfig, FileTokenStore, HttpVerificationClient, LocalKeyProvider, PersistentKeyManager,
    SessionStore, WalletConnector,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_url = std::env::var("WALLET_AUTH_API")
        .unwrap_or_else(|_| "http://localhost:3000/api/".to_string());

    // Step 1: load (or create) the signing key for this wallet
    let keys = PersistentKeyManager::new("./.wallet-auth/keys");
    let signer = keys.get_or_create_signer("example")?;
    println!("=== Wallet Auth Login Example ===");
    println!("Wallet address: {}", signer.address());

    // Step 2: a local wallet that approves every prompt
    let provider = LocalKeyProvider::new(signer, Arc::new(AutoApprove)).with_network("devnet");
    let connector = Arc::new(WalletConnector::new(Arc::new(provider)));

    // Step 3: backend verifier and a session persisted next to the keys
    let client = ApiClient::with_config(ClientConfig {
        base_url,
        ..ClientConfig::default()
    })?;
    let verifier = Arc::new(HttpVerificationClient::new(client));
    println!("Backend: {}", verifier.client().base_url());
    let sessions = SessionStore::with_backing(Arc::new(FileTokenStore::new(
        "./.wallet-auth/session.json",
    )));
    if sessions.rehydrate().is_some() {
        println!("Found a stored session, signing in again anyway");
    }

    let challenges = ChallengeBuilder::new(ChallengeConfig {
        app_name: "Wallet Auth Example".to_string(),
        domain: Some("localhost".to_string()),
    });
    let orchestrator = AuthOrchestrator::new(connector, challenges, verifier, sessions);
    orchestrator.reset(AttemptKind::Login);

    // Step 4: login, then link the same wallet to the account
    let login = orchestrator.authenticate().await;
    println!("Login: {}", serde_json::to_string(&login)?);

    if login.success {
        let link = orchestrator.link_wallet().await;
        println!("Link:  {}", serde_json::to_string(&link)?);
    }

    println!("\nExample complete - point WALLET_AUTH_API at a running backend to get a token");
    Ok(())
}
