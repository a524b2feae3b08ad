/*
[INPUT]:  HTTP client configuration and backend endpoints
[OUTPUT]: HTTP responses, typed API results and verification calls
[POS]:    HTTP layer - backend communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod client;
pub mod error;
pub mod verify;

pub use error::{AuthError, FailureStep, Result, GENERIC_VERIFICATION_MESSAGE};
pub use verify::{DEFAULT_REPLAY_RETENTION, HttpVerificationClient, VerificationClient};

pub use client::{ApiClient, ClientConfig};
