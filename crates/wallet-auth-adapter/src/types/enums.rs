/*
[INPUT]:  Attempt kinds and failure classifications
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - type definitions for attempts and outcomes
[UPDATE]: When new attempt kinds or failure reasons are added
*/

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of authentication attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptKind {
    Login,
    Link,
}

impl AttemptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptKind::Login => "login",
            AttemptKind::Link => "link",
        }
    }
}

impl fmt::Display for AttemptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an attempt ended in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    ProviderUnavailable,
    ConnectFailed,
    SignatureRejected,
    VerificationRejected,
    NetworkError,
    SessionChanged,
}
