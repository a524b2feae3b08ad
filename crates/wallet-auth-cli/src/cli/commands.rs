/*
[INPUT]:  Loaded configuration, approval policy, shutdown token
[OUTPUT]: Auth outcomes and status reports printed as JSON
[POS]:    CLI command layer - login, link, logout and status
[UPDATE]: When subcommand behavior or wiring of the auth stack changes
*/

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wallet_auth_adapter::{
    ApiClient, AttemptKind, AuthOrchestrator, AuthOutcome, ChallengeBuilder, FileTokenStore,
    HttpVerificationClient, LocalKeyProvider, PersistentKeyManager, SessionStore, WalletConnector,
};
use wallet_auth_cli::{AppConfig, TerminalApprover};

/// Auth stack wired for the local wallet
pub struct AuthContext {
    pub orchestrator: AuthOrchestrator,
    pub address: String,
}

impl AuthContext {
    pub fn build(config: &AppConfig, assume_yes: bool) -> Result<Self> {
        let keys = PersistentKeyManager::new(config.key_path()?);
        let signer = keys
            .get_or_create_signer(&config.wallet_name)
            .context("load wallet key")?;
        let address = signer.address();

        let mut provider = LocalKeyProvider::new(signer, Arc::new(TerminalApprover::new(assume_yes)));
        if let Some(network) = &config.network {
            provider = provider.with_network(network.clone());
        }
        let connector = Arc::new(WalletConnector::with_config(
            Arc::new(provider),
            config.connector_config(),
        ));

        let client = ApiClient::with_config(config.client_config()).context("build HTTP client")?;
        let sessions = session_store(config)?;
        sessions.rehydrate();

        let orchestrator = AuthOrchestrator::new(
            connector,
            ChallengeBuilder::new(config.challenge_config()),
            Arc::new(HttpVerificationClient::new(client)),
            sessions,
        );
        Ok(Self {
            orchestrator,
            address,
        })
    }
}

fn session_store(config: &AppConfig) -> Result<SessionStore> {
    Ok(SessionStore::with_backing(Arc::new(FileTokenStore::new(
        config.token_path()?,
    ))))
}

/// Run one login or link attempt; `None` when the user aborted it
pub async fn run_attempt(
    context: &AuthContext,
    kind: AttemptKind,
    shutdown: CancellationToken,
) -> Option<AuthOutcome> {
    info!(%kind, address = %context.address, "starting attempt");
    let attempt = async {
        match kind {
            AttemptKind::Login => context.orchestrator.authenticate().await,
            AttemptKind::Link => context.orchestrator.link_wallet().await,
        }
    };

    tokio::select! {
        outcome = attempt => Some(outcome),
        _ = shutdown.cancelled() => {
            warn!(%kind, "attempt aborted by user");
            None
        }
    }
}

pub fn logout(config: &AppConfig) -> Result<serde_json::Value> {
    let sessions = session_store(config)?;
    let was_authenticated = sessions.rehydrate().is_some();
    sessions.clear();
    info!(was_authenticated, "session cleared");
    Ok(json!({ "success": true, "was_authenticated": was_authenticated }))
}

pub fn status(config: &AppConfig) -> Result<serde_json::Value> {
    let keys = PersistentKeyManager::new(config.key_path()?);
    let address = keys
        .load_signer(&config.wallet_name)
        .context("read wallet key")?
        .map(|signer| signer.address());
    let sessions = session_store(config)?;

    Ok(json!({
        "authenticated": sessions.rehydrate().is_some(),
        "wallet_name": config.wallet_name,
        "address": address,
        "wallets": keys.list_wallets(),
        "api_base_url": config.api_base_url,
        "token_file": config.token_path()?.display().to_string(),
    }))
}
