/*
[INPUT]:  HTTP configuration (base URL, timeouts) and session credentials
[OUTPUT]: Configured reqwest client ready for backend calls
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing response handling
*/

use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::SessionStore;
use crate::http::{AuthError, Result};
use crate::types::ErrorResponse;

const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP client for the authentication backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: parse_base_url(&config.base_url)?,
        })
    }

    /// Base URL every endpoint is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build full URL for an endpoint relative to the base URL
    fn url(&self, endpoint: &str) -> Result<Url> {
        Ok(self.base_url.join(endpoint.trim_start_matches('/'))?)
    }

    /// Build request builder for an endpoint
    pub fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.url(endpoint)?;
        Ok(self.http_client.request(method, url))
    }

    /// Build request builder carrying the stored session token, if any
    pub fn authorized_request(
        &self,
        method: Method,
        endpoint: &str,
        sessions: &SessionStore,
    ) -> Result<RequestBuilder> {
        let builder = self.request(method, endpoint)?;
        Ok(match sessions.get() {
            Some(credential) => builder.bearer_auth(credential.token),
            None => builder,
        })
    }

    /// Send a request and decode a JSON body, unwrapping backend error payloads.
    pub async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(&body);
            debug!(%status, message = message.as_deref().unwrap_or(""), "backend returned error");
            return Err(AuthError::from_status(status, message));
        }

        let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| {
            AuthError::InvalidResponse(format!("unexpected response body ({status}): {e}"))
        })
    }

    /// Send an authorized request for downstream APIs.
    ///
    /// A 401 answer clears the session store and surfaces `Unauthorized`
    /// carrying the [`LoginRedirect`](crate::auth::LoginRedirect) callers route on.
    pub async fn send_authorized<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        sessions: &SessionStore,
    ) -> Result<T> {
        let builder = self.authorized_request(method, endpoint, sessions)?;
        let response = builder.send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(endpoint, "session rejected by backend, clearing credential");
            return Err(AuthError::Unauthorized(sessions.handle_unauthorized()));
        }

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::from_status(status, error_message(&body)));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Pull the `message` field out of an error body, if there is one
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|payload| payload.message)
}
