/*
[INPUT]:  Attempt events (start, step results, session changes, resets)
[OUTPUT]: Next authentication state or rejection of an illegal transition
[POS]:    Auth layer - authentication state machine definition
[UPDATE]: When adding states, events or transitions
*/

use std::fmt;

use serde::Serialize;

use crate::types::FailureReason;

/// Authentication state of one attempt kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum AuthState {
    Idle,
    Connecting,
    AwaitingSignature,
    Verifying,
    Authenticated,
    Failed(FailureReason),
}

/// Input to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptEvent {
    /// A new attempt begins; skips the connect step when a wallet is connected
    Start { has_session: bool },
    Connected,
    Signed,
    Verified,
    Fail(FailureReason),
    /// The wallet account or network changed
    SessionChanged,
    /// Return a finished attempt to `Idle`
    Reset,
}

impl AuthState {
    /// Apply `event`; `None` means the transition is not allowed from here.
    pub fn next(self, event: AttemptEvent) -> Option<AuthState> {
        use AttemptEvent as E;
        use AuthState::*;

        match (self, event) {
            (_, E::SessionChanged) => Some(Idle),

            (Idle, E::Start { has_session: false }) => Some(Connecting),
            (Idle, E::Start { has_session: true }) => Some(AwaitingSignature),
            (Connecting, E::Connected) => Some(AwaitingSignature),
            (AwaitingSignature, E::Signed) => Some(Verifying),
            (Verifying, E::Verified) => Some(Authenticated),

            (Connecting | AwaitingSignature | Verifying, E::Fail(reason)) => Some(Failed(reason)),

            (Idle | Authenticated | Failed(_), E::Reset) => Some(Idle),

            (Connecting | AwaitingSignature | Verifying, E::Reset)
            | (Connecting | AwaitingSignature | Verifying | Authenticated | Failed(_), E::Start { .. })
            | (Idle | AwaitingSignature | Verifying | Authenticated | Failed(_), E::Connected)
            | (Idle | Connecting | Verifying | Authenticated | Failed(_), E::Signed)
            | (Idle | Connecting | AwaitingSignature | Authenticated | Failed(_), E::Verified)
            | (Idle | Authenticated | Failed(_), E::Fail(_)) => None,
        }
    }

    /// An attempt is suspended in one of the external calls
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            AuthState::Connecting | AuthState::AwaitingSignature | AuthState::Verifying
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AuthState::Authenticated | AuthState::Failed(_))
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthState::Idle => f.write_str("idle"),
            AuthState::Connecting => f.write_str("connecting"),
            AuthState::AwaitingSignature => f.write_str("awaiting signature"),
            AuthState::Verifying => f.write_str("verifying"),
            AuthState::Authenticated => f.write_str("authenticated"),
            AuthState::Failed(reason) => write!(f, "failed ({reason:?})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_happy_path_without_session() {
        let state = AuthState::Idle
            .next(AttemptEvent::Start { has_session: false })
            .and_then(|s| s.next(AttemptEvent::Connected))
            .and_then(|s| s.next(AttemptEvent::Signed))
            .and_then(|s| s.next(AttemptEvent::Verified));
        assert_eq!(state, Some(AuthState::Authenticated));
    }

    #[test]
    fn test_existing_session_skips_connecting() {
        assert_eq!(
            AuthState::Idle.next(AttemptEvent::Start { has_session: true }),
            Some(AuthState::AwaitingSignature)
        );
    }

    #[rstest]
    #[case(AuthState::Connecting, FailureReason::ConnectFailed)]
    #[case(AuthState::Connecting, FailureReason::ProviderUnavailable)]
    #[case(AuthState::AwaitingSignature, FailureReason::SignatureRejected)]
    #[case(AuthState::Verifying, FailureReason::VerificationRejected)]
    #[case(AuthState::Verifying, FailureReason::NetworkError)]
    fn test_in_flight_failures(#[case] from: AuthState, #[case] reason: FailureReason) {
        assert_eq!(
            from.next(AttemptEvent::Fail(reason)),
            Some(AuthState::Failed(reason))
        );
    }

    #[rstest]
    #[case(AuthState::Idle)]
    #[case(AuthState::Connecting)]
    #[case(AuthState::AwaitingSignature)]
    #[case(AuthState::Verifying)]
    #[case(AuthState::Authenticated)]
    #[case(AuthState::Failed(FailureReason::NetworkError))]
    fn test_session_change_returns_to_idle(#[case] from: AuthState) {
        assert_eq!(from.next(AttemptEvent::SessionChanged), Some(AuthState::Idle));
    }

    #[rstest]
    #[case(AuthState::Idle, AttemptEvent::Signed)]
    #[case(AuthState::Idle, AttemptEvent::Fail(FailureReason::ConnectFailed))]
    #[case(AuthState::Verifying, AttemptEvent::Start { has_session: true })]
    #[case(AuthState::Authenticated, AttemptEvent::Start { has_session: false })]
    #[case(AuthState::Connecting, AttemptEvent::Reset)]
    #[case(AuthState::AwaitingSignature, AttemptEvent::Verified)]
    fn test_illegal_transitions(#[case] from: AuthState, #[case] event: AttemptEvent) {
        assert_eq!(from.next(event), None);
    }

    #[test]
    fn test_failed_attempt_is_retryable_through_reset() {
        let failed = AuthState::Failed(FailureReason::SignatureRejected);
        assert!(failed.is_terminal());
        let idle = failed.next(AttemptEvent::Reset).unwrap();
        assert_eq!(
            idle.next(AttemptEvent::Start { has_session: true }),
            Some(AuthState::AwaitingSignature)
        );
    }
}
