/*
[INPUT]:  Wallet address and attempt kind (login or link)
[OUTPUT]: Single-use, purpose-bound challenge messages with fresh nonces
[POS]:    Auth layer - challenge construction and parsing
[UPDATE]: When the challenge text format or its version changes
*/

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::http::{AuthError, Result};
use crate::types::{AttemptKind, Challenge};

/// Version written into every challenge; bump on any format change
pub const CHALLENGE_VERSION: u32 = 1;

const LOGIN_PURPOSE: &str = "login";
const LINK_PURPOSE: &str = "link-wallet";
const NO_FEES_NOTICE: &str =
    "This request will not trigger a blockchain transaction or cost any fees.";

/// Challenge text settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeConfig {
    /// Application name shown in the preamble
    pub app_name: String,
    /// Optional domain binding line
    pub domain: Option<String>,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            app_name: "Wallet Auth".to_string(),
            domain: None,
        }
    }
}

/// Builds challenges; one builder should live as long as the session so the
/// sequence component of its nonces never repeats.
#[derive(Debug)]
pub struct ChallengeBuilder {
    config: ChallengeConfig,
    sequence: AtomicU64,
}

impl ChallengeBuilder {
    pub fn new(config: ChallengeConfig) -> Self {
        Self {
            config,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ChallengeConfig {
        &self.config
    }

    pub fn build_login_challenge(&self, address: &str) -> Challenge {
        self.build(AttemptKind::Login, address)
    }

    pub fn build_link_challenge(&self, address: &str) -> Challenge {
        self.build(AttemptKind::Link, address)
    }

    pub fn build(&self, kind: AttemptKind, address: &str) -> Challenge {
        let issued_at = Utc::now();
        let nonce = self.next_nonce(issued_at);

        let preamble = match kind {
            AttemptKind::Login => format!(
                "Sign this message to authenticate with {}.",
                self.config.app_name
            ),
            AttemptKind::Link => format!(
                "Sign this message to link this wallet to your {} account.",
                self.config.app_name
            ),
        };

        let mut lines = vec![
            preamble,
            NO_FEES_NOTICE.to_string(),
            String::new(),
            format!("Purpose: {}", purpose(kind)),
        ];
        if let Some(domain) = &self.config.domain {
            lines.push(format!("Domain: {domain}"));
        }
        lines.push(format!("Address: {address}"));
        lines.push(format!("Nonce: {nonce}"));
        lines.push(format!(
            "Issued At: {}",
            issued_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        ));
        lines.push(format!("Version: {CHALLENGE_VERSION}"));

        Challenge {
            message: lines.join("\n"),
            nonce,
            issued_at,
            kind,
        }
    }

    /// `{millis}-{sequence}-{128 random bits}`, all hex
    fn next_nonce(&self, issued_at: DateTime<Utc>) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let random: u128 = rand::random();
        format!(
            "{:x}-{:x}-{:032x}",
            issued_at.timestamp_millis(),
            sequence,
            random
        )
    }
}

impl Default for ChallengeBuilder {
    fn default() -> Self {
        Self::new(ChallengeConfig::default())
    }
}

fn purpose(kind: AttemptKind) -> &'static str {
    match kind {
        AttemptKind::Login => LOGIN_PURPOSE,
        AttemptKind::Link => LINK_PURPOSE,
    }
}

/// Fields recovered from a challenge message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChallenge {
    pub kind: AttemptKind,
    pub domain: Option<String>,
    pub address: String,
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
    pub version: u32,
}

/// Parse a message produced by [`ChallengeBuilder`]
pub fn parse_challenge(message: &str) -> Result<ParsedChallenge> {
    let mut lines = message.lines();
    let preamble = lines.next().unwrap_or_default();
    if !preamble.starts_with("Sign this message to ") {
        return Err(invalid("missing preamble"));
    }

    let mut kind = None;
    let mut domain = None;
    let mut address = None;
    let mut nonce = None;
    let mut issued_at = None;
    let mut version = None;

    for line in lines {
        let Some((key, value)) = line.split_once(": ") else {
            continue;
        };
        match key {
            "Purpose" => {
                kind = Some(match value {
                    LOGIN_PURPOSE => AttemptKind::Login,
                    LINK_PURPOSE => AttemptKind::Link,
                    other => return Err(invalid(&format!("unknown purpose '{other}'"))),
                });
            }
            "Domain" => domain = Some(value.to_string()),
            "Address" => address = Some(value.to_string()),
            "Nonce" => nonce = Some(value.to_string()),
            "Issued At" => {
                let parsed = DateTime::parse_from_rfc3339(value)
                    .map_err(|e| invalid(&format!("bad timestamp: {e}")))?;
                issued_at = Some(parsed.with_timezone(&Utc));
            }
            "Version" => {
                version = Some(
                    value
                        .parse::<u32>()
                        .map_err(|_| invalid(&format!("bad version '{value}'")))?,
                );
            }
            _ => {}
        }
    }

    let version = version.ok_or_else(|| invalid("missing version"))?;
    if version != CHALLENGE_VERSION {
        return Err(invalid(&format!("unsupported version {version}")));
    }

    let kind = kind.ok_or_else(|| invalid("missing purpose"))?;
    let expected_preamble = match kind {
        AttemptKind::Login => "Sign this message to authenticate with ",
        AttemptKind::Link => "Sign this message to link this wallet to your ",
    };
    if !preamble.starts_with(expected_preamble) {
        return Err(invalid("preamble does not match purpose"));
    }

    Ok(ParsedChallenge {
        kind,
        domain,
        address: address.ok_or_else(|| invalid("missing address"))?,
        nonce: nonce.ok_or_else(|| invalid("missing nonce"))?,
        issued_at: issued_at.ok_or_else(|| invalid("missing timestamp"))?,
        version,
    })
}

fn invalid(reason: &str) -> AuthError {
    AuthError::InvalidChallenge(reason.to_string())
}
