/*
[INPUT]:  Backend response bodies and attempt results
[OUTPUT]: Typed response structs and the caller-facing outcome contract
[POS]:    Data layer - inbound response schema and result contract
[UPDATE]: When backend responses or the outcome contract change
*/

use serde::{Deserialize, Serialize};

use crate::http::AuthError;

/// `POST /auth/wallet` success body: `{data: {token}}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    pub data: LoginData,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginData {
    pub token: String,
}

/// `POST /auth/link-wallet` success body: `{success}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LinkResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_success() -> bool {
    true
}

/// Error payload returned with non-2xx statuses
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Result returned to callers of `authenticate` and `link_wallet`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthOutcome {
    pub fn authenticated(token: impl Into<String>) -> Self {
        Self {
            success: true,
            token: Some(token.into()),
            error: None,
        }
    }

    pub fn linked() -> Self {
        Self {
            success: true,
            token: None,
            error: None,
        }
    }

    pub fn failed(error: &AuthError) -> Self {
        Self {
            success: false,
            token: None,
            error: Some(error.user_message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serialization() {
        let ok = serde_json::to_value(AuthOutcome::authenticated("tok123")).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "token": "tok123"}));

        let linked = serde_json::to_value(AuthOutcome::linked()).unwrap();
        assert_eq!(linked, serde_json::json!({"success": true}));

        let failed = serde_json::to_value(AuthOutcome::failed(&AuthError::NotConnected)).unwrap();
        assert_eq!(failed, serde_json::json!({"success": false, "error": "No wallet connected"}));
    }

    #[test]
    fn test_link_response_defaults_to_success() {
        let parsed: LinkResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.success);
    }
}
