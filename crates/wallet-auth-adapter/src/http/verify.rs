/*
[INPUT]:  Wallet verification requests (address, public key, signature, message, nonce)
[OUTPUT]: Session credentials for logins, confirmation for wallet links
[POS]:    HTTP layer - backend signature verification exchange
[UPDATE]: When verification endpoints or replay rules change
*/

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, warn};

use crate::http::{ApiClient, AuthError, Result};
use crate::types::{LinkResponse, LoginResponse, SessionCredential, WalletVerifyRequest};

pub const LOGIN_ENDPOINT: &str = "auth/wallet";
pub const LINK_ENDPOINT: &str = "auth/link-wallet";

/// How long a submitted `(signature, nonce)` pair is remembered. Challenges
/// older than this are stale on the backend side as well.
pub const DEFAULT_REPLAY_RETENTION: Duration = Duration::from_secs(10 * 60);

/// Backend exchange of a signed challenge
#[async_trait]
pub trait VerificationClient: Send + Sync {
    /// Exchange a signed login challenge for a session token
    async fn verify_login(&self, request: WalletVerifyRequest) -> Result<SessionCredential>;

    /// Confirm a signed link challenge, optionally on behalf of a logged-in account
    async fn verify_link(&self, request: WalletVerifyRequest, bearer: Option<&str>) -> Result<()>;
}

/// Verification client talking to the HTTP backend
///
/// Every `(signature, nonce)` pair is recorded before it is sent; a second
/// submission of the same pair within the retention window is rejected
/// locally. Expired pairs are pruned on each submission.
#[derive(Debug)]
pub struct HttpVerificationClient {
    client: ApiClient,
    retention: Duration,
    submitted: Mutex<HashMap<(String, String), Instant>>,
}

impl HttpVerificationClient {
    pub fn new(client: ApiClient) -> Self {
        Self::with_retention(client, DEFAULT_REPLAY_RETENTION)
    }

    pub fn with_retention(client: ApiClient, retention: Duration) -> Self {
        Self {
            client,
            retention,
            submitted: Mutex::new(HashMap::new()),
        }
    }

    /// Number of pairs currently held by the replay guard
    pub fn tracked_submissions(&self) -> usize {
        self.submitted.lock().map(|submitted| submitted.len()).unwrap_or(0)
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn claim(&self, request: &WalletVerifyRequest) -> Result<()> {
        let mut submitted = self
            .submitted
            .lock()
            .map_err(|_| AuthError::Config("replay guard lock poisoned".to_string()))?;

        let now = Instant::now();
        let before = submitted.len();
        submitted.retain(|_, at| now.duration_since(*at) < self.retention);
        if submitted.len() < before {
            debug!(pruned = before - submitted.len(), "expired submissions pruned");
        }

        let key = (request.signature.clone(), request.nonce.clone());
        if submitted.contains_key(&key) {
            warn!(nonce = %request.nonce, "refusing to resubmit a used signature");
            Err(AuthError::VerificationRejected {
                message: "Signature has already been used, please sign a new challenge".to_string(),
            })
        } else {
            submitted.insert(key, now);
            Ok(())
        }
    }
}

#[async_trait]
impl VerificationClient for HttpVerificationClient {
    async fn verify_login(&self, request: WalletVerifyRequest) -> Result<SessionCredential> {
        self.claim(&request)?;
        debug!(address = %request.address, nonce = %request.nonce, "submitting login signature");

        let builder = self.client.request(Method::POST, LOGIN_ENDPOINT)?.json(&request);
        let response: LoginResponse = self.client.send_json(builder).await?;

        if response.data.token.is_empty() {
            return Err(AuthError::InvalidResponse(
                "login response carried an empty token".to_string(),
            ));
        }
        Ok(SessionCredential::new(response.data.token))
    }

    async fn verify_link(&self, request: WalletVerifyRequest, bearer: Option<&str>) -> Result<()> {
        self.claim(&request)?;
        debug!(address = %request.address, nonce = %request.nonce, "submitting link signature");

        let mut builder = self.client.request(Method::POST, LINK_ENDPOINT)?.json(&request);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        let response: LinkResponse = self.client.send_json(builder).await?;

        if response.success {
            Ok(())
        } else {
            Err(AuthError::from_status(
                reqwest::StatusCode::BAD_REQUEST,
                response.message,
            ))
        }
    }
}
