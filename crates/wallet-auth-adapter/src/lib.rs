/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public wallet auth adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod http;
pub mod types;

// Re-export commonly used types from auth
pub use auth::{
    Approver,
    AuthOrchestrator,
    AuthState,
    AutoApprove,
    ChallengeBuilder,
    ChallengeConfig,
    ConnectorConfig,
    Ed25519Signer,
    FileTokenStore,
    LocalKeyProvider,
    LoginRedirect,
    MemoryTokenStore,
    MockResponse,
    MockWalletProvider,
    PersistentKeyManager,
    SessionStore,
    Subscription,
    TokenStore,
    WalletConnector,
    WalletProvider,
};

// Re-export commonly used types from http
pub use http::{
    ApiClient,
    AuthError,
    ClientConfig,
    HttpVerificationClient,
    Result,
    VerificationClient,
};

// Re-export all types
pub use types::*;
