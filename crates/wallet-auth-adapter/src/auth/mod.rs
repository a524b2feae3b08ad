/*
[INPUT]:  Wallet providers, challenge settings, verification backend, token storage
[OUTPUT]: Wallet sessions, signature proofs, session credentials, auth state
[POS]:    Auth layer - wallet-signature login and wallet linking
[UPDATE]: When auth flow, provider capabilities or credential storage change
*/

pub mod challenge;
pub mod connector;
pub mod local_wallet;
pub mod orchestrator;
pub mod persistent_key;
pub mod session;
pub mod signer;
pub mod state;
pub mod subscription;
pub mod token_store;
pub mod wallet;

pub use challenge::{CHALLENGE_VERSION, ChallengeBuilder, ChallengeConfig, ParsedChallenge, parse_challenge};
pub use connector::{ConnectorConfig, WalletConnector};
pub use local_wallet::{Approver, AutoApprove, LocalKeyProvider};
pub use orchestrator::AuthOrchestrator;
pub use persistent_key::PersistentKeyManager;
pub use session::{LoginRedirect, SessionStore};
pub use signer::Ed25519Signer;
pub use state::{AttemptEvent, AuthState};
pub use subscription::{Handler, HandlerRegistry, Subscription};
pub use token_store::{FileTokenStore, MemoryTokenStore, SESSION_TOKEN_KEY, TokenStore};
pub use wallet::{MockResponse, MockWalletProvider, WalletProvider, sign_envelope};
