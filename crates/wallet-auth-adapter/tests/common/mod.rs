/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for wallet-auth-adapter tests

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use wallet_auth_adapter::{
    ApiClient, AuthError, AuthOrchestrator, ChallengeBuilder, ChallengeConfig, ClientConfig,
    MockWalletProvider, ProviderAccount, Result, SessionCredential, SessionStore,
    VerificationClient, WalletConnector, WalletVerifyRequest,
};
use wiremock::MockServer;

pub const TEST_ADDRESS: &str = "0xABC";
pub const TEST_PUBLIC_KEY: &str = "0xPUB";
pub const TEST_TOKEN: &str = "tok123";

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// API client pointed at the mock server
pub fn api_client(server: &MockServer) -> ApiClient {
    let config = ClientConfig {
        base_url: format!("{}/api", server.uri()),
        ..ClientConfig::default()
    };
    ApiClient::with_config(config).expect("mock server url is valid")
}

pub fn other_account() -> ProviderAccount {
    ProviderAccount {
        address: "0xDEF".to_string(),
        public_key: "0xPUB2".to_string(),
    }
}

/// Verifier call as seen by [`RecordingVerifier`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: WalletVerifyRequest,
    pub bearer: Option<String>,
}

/// In-process verification backend
///
/// Records every call, rejects replayed `(signature, nonce)` pairs and answers
/// with scripted failures before falling back to success. A call is recorded
/// before it waits on the hold gate, so `call_count` tells when verify started.
#[derive(Debug, Default)]
pub struct RecordingVerifier {
    token: String,
    calls: Mutex<Vec<RecordedCall>>,
    seen: Mutex<HashSet<(String, String)>>,
    failures: Mutex<VecDeque<AuthError>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl RecordingVerifier {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            ..Self::default()
        }
    }

    /// Answer the next call with `error`
    pub fn fail_next(&self, error: AuthError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Hold every verify call until the returned gate is notified
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn wait_for_release(&self) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn record(&self, request: WalletVerifyRequest, bearer: Option<&str>) -> Result<()> {
        let fresh = self
            .seen
            .lock()
            .unwrap()
            .insert((request.signature.clone(), request.nonce.clone()));
        self.calls.lock().unwrap().push(RecordedCall {
            request,
            bearer: bearer.map(str::to_string),
        });

        if !fresh {
            return Err(AuthError::VerificationRejected {
                message: "Nonce already used".to_string(),
            });
        }
        match self.failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VerificationClient for RecordingVerifier {
    async fn verify_login(&self, request: WalletVerifyRequest) -> Result<SessionCredential> {
        let recorded = self.record(request, None);
        self.wait_for_release().await;
        recorded?;
        Ok(SessionCredential::new(self.token.clone()))
    }

    async fn verify_link(&self, request: WalletVerifyRequest, bearer: Option<&str>) -> Result<()> {
        let recorded = self.record(request, bearer);
        self.wait_for_release().await;
        recorded
    }
}

/// Wired-up orchestrator over a mock wallet and a recording verifier
pub struct Harness {
    pub provider: Arc<MockWalletProvider>,
    pub connector: Arc<WalletConnector>,
    pub verifier: Arc<RecordingVerifier>,
    pub sessions: SessionStore,
    pub orchestrator: AuthOrchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_provider(MockWalletProvider::new(TEST_ADDRESS, TEST_PUBLIC_KEY))
    }

    pub fn with_provider(provider: MockWalletProvider) -> Self {
        Self::build(provider, SessionStore::new())
    }

    pub fn build(provider: MockWalletProvider, sessions: SessionStore) -> Self {
        let provider = Arc::new(provider);
        let connector = Arc::new(WalletConnector::new(provider.clone()));
        let verifier = Arc::new(RecordingVerifier::new(TEST_TOKEN));
        let orchestrator = AuthOrchestrator::new(
            connector.clone(),
            ChallengeBuilder::new(ChallengeConfig::default()),
            verifier.clone(),
            sessions.clone(),
        );
        Self {
            provider,
            connector,
            verifier,
            sessions,
            orchestrator,
        }
    }
}
