/*
[INPUT]:  Error sources (provider, HTTP, serialization, storage, state machine)
[OUTPUT]: Structured error taxonomy with retry hints and user-facing messages
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or changing failure classification
*/

use reqwest::StatusCode;
use thiserror::Error;

use crate::auth::LoginRedirect;
use crate::types::{AttemptKind, FailureReason};

/// Fallback shown when the backend rejects a request without a message.
pub const GENERIC_VERIFICATION_MESSAGE: &str = "Wallet verification failed, please try again";

/// Main error type for the wallet auth adapter
#[derive(Error, Debug)]
pub enum AuthError {
    /// No wallet provider is installed (terminal until the user installs one)
    #[error("No wallet connected: wallet provider is not installed")]
    ProviderUnavailable,

    /// The user declined a connect or sign prompt
    #[error("Request rejected by user: {message}")]
    UserRejected { message: String },

    /// The provider failed to connect for a reason other than rejection
    #[error("Failed to connect wallet: {0}")]
    ConnectFailed(String),

    /// The provider did not answer the connect prompt in time
    #[error("Wallet connection timed out after {duration}s")]
    ConnectTimeout { duration: u64 },

    /// Signing was requested without a connected wallet
    #[error("No wallet connected")]
    NotConnected,

    /// The provider failed to produce a signature
    #[error("Failed to sign message: {0}")]
    SignatureRejected(String),

    /// The backend declined the signature or nonce
    #[error("{message}")]
    VerificationRejected { message: String },

    /// Transient transport or server failure
    #[error("Network error: {0}")]
    Network(String),

    /// A downstream API call answered 401; the session has been cleared
    #[error("Session is no longer authorized, please sign in again")]
    Unauthorized(LoginRedirect),

    /// The wallet account or network changed while the attempt was in flight
    #[error("Wallet account or network changed, please try again")]
    SessionChanged,

    /// Another attempt of the same kind is still running
    #[error("A {kind} attempt is already in progress")]
    AttemptInProgress { kind: AttemptKind },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A challenge message could not be parsed
    #[error("Invalid challenge: {0}")]
    InvalidChallenge(String),

    /// Token or key persistence failed
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Check if the caller may simply retry the attempt
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            AuthError::ProviderUnavailable
                | AuthError::Config(_)
                | AuthError::InvalidChallenge(_)
                | AuthError::UrlParse(_)
        )
    }

    /// The route-to-login signal, when the session was revoked
    pub fn login_redirect(&self) -> Option<LoginRedirect> {
        match self {
            AuthError::Unauthorized(redirect) => Some(*redirect),
            _ => None,
        }
    }

    /// Check if the error indicates an authorization failure
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            AuthError::Unauthorized(_) | AuthError::VerificationRejected { .. }
        )
    }

    /// Classify the error into the failure reason recorded by the state machine
    /// for the step it happened in.
    pub fn failure_reason(&self, step: FailureStep) -> FailureReason {
        match self {
            AuthError::ProviderUnavailable => FailureReason::ProviderUnavailable,
            AuthError::SessionChanged => FailureReason::SessionChanged,
            AuthError::VerificationRejected { .. } | AuthError::Unauthorized(_) => {
                FailureReason::VerificationRejected
            }
            AuthError::Network(_) | AuthError::Http(_) => match step {
                FailureStep::Verify => FailureReason::NetworkError,
                FailureStep::Connect => FailureReason::ConnectFailed,
                FailureStep::Sign => FailureReason::SignatureRejected,
            },
            _ => match step {
                FailureStep::Connect => FailureReason::ConnectFailed,
                FailureStep::Sign => FailureReason::SignatureRejected,
                FailureStep::Verify => FailureReason::VerificationRejected,
            },
        }
    }

    /// Message surfaced to the user in the `{success:false, error}` contract
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Http(e) if e.is_timeout() => {
                "Network error: request timed out".to_string()
            }
            AuthError::Http(_) => "Network error: unable to reach the server".to_string(),
            AuthError::VerificationRejected { message } if message.trim().is_empty() => {
                GENERIC_VERIFICATION_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }

    /// Classify a non-2xx backend answer
    pub fn from_status(status: StatusCode, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_VERIFICATION_MESSAGE.to_string());

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            AuthError::Network(message)
        } else {
            AuthError::VerificationRejected { message }
        }
    }
}

/// Step of an attempt an error surfaced in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStep {
    Connect,
    Sign,
    Verify,
}

/// Result type alias for wallet auth operations
pub type Result<T> = std::result::Result<T, AuthError>;
