/*
[INPUT]:  Mock wallet provider and in-process verification backend
[OUTPUT]: Test results for the login and wallet-link flows
[POS]:    Integration tests - auth orchestration
[UPDATE]: When flow steps, deduplication or invalidation rules change
*/

mod common;

use std::sync::Arc;

use common::{Harness, TEST_ADDRESS, TEST_PUBLIC_KEY, TEST_TOKEN, other_account};
use tokio_test::assert_ok;
use wallet_auth_adapter::auth::parse_challenge;
use wallet_auth_adapter::{
    AttemptKind, AuthError, AuthState, FailureReason, MemoryTokenStore, MockResponse,
    MockWalletProvider, SessionCredential, SessionStore, TokenStore,
};

#[tokio::test]
async fn test_login_end_to_end() {
    let h = Harness::new();

    let outcome = h.orchestrator.authenticate().await;

    assert!(outcome.success);
    assert_eq!(outcome.token.as_deref(), Some(TEST_TOKEN));
    assert_eq!(outcome.error, None);
    assert_eq!(h.sessions.get(), Some(SessionCredential::new(TEST_TOKEN)));
    assert_eq!(h.orchestrator.state(AttemptKind::Login), AuthState::Authenticated);

    let calls = h.verifier.calls();
    assert_eq!(calls.len(), 1);
    let request = &calls[0].request;
    assert_eq!(request.address, TEST_ADDRESS);
    assert_eq!(request.public_key, TEST_PUBLIC_KEY);
    assert_eq!(request.signature, format!("0xsig-{}", request.nonce));
    assert!(request.message.contains(&format!("Nonce: {}", request.nonce)));

    let session = h.orchestrator.wallet_session().unwrap();
    assert_eq!(session.address, TEST_ADDRESS);
    assert!(session.connected);
    assert_eq!(session.network.as_deref(), Some("mainnet"));
}

#[tokio::test]
async fn test_signed_message_is_a_login_challenge() {
    let h = Harness::new();
    assert_ok!(h.orchestrator.try_authenticate().await);

    let request = h.verifier.calls().remove(0).request;
    let embedded = request
        .message
        .strip_prefix("WALLET\nmessage: ")
        .and_then(|rest| rest.rsplit_once("\nnonce: "))
        .map(|(message, _)| message)
        .unwrap();
    let parsed = assert_ok!(parse_challenge(embedded));
    assert_eq!(parsed.kind, AttemptKind::Login);
    assert_eq!(parsed.address, TEST_ADDRESS);
    assert_eq!(parsed.nonce, request.nonce);
}

#[tokio::test]
async fn test_provider_not_installed() {
    let h = Harness::with_provider(MockWalletProvider::not_installed());

    let outcome = h.orchestrator.authenticate().await;

    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("No wallet connected"));
    assert_eq!(h.provider.connect_calls(), 0);
    assert_eq!(h.verifier.call_count(), 0);
    assert_eq!(
        h.orchestrator.state(AttemptKind::Login),
        AuthState::Failed(FailureReason::ProviderUnavailable)
    );
}

#[tokio::test]
async fn test_connect_rejected() {
    let h = Harness::new();
    h.provider.set_connect_response(MockResponse::Reject);

    let err = h.orchestrator.try_authenticate().await.unwrap_err();

    assert!(matches!(err, AuthError::UserRejected { .. }));
    assert_eq!(
        h.orchestrator.state(AttemptKind::Login),
        AuthState::Failed(FailureReason::ConnectFailed)
    );
    assert_eq!(h.orchestrator.wallet_session(), None);
}

#[tokio::test]
async fn test_sign_rejected_keeps_wallet_connected() {
    let h = Harness::new();
    h.provider.set_sign_response(MockResponse::Reject);

    let outcome = h.orchestrator.authenticate().await;

    assert!(!outcome.success);
    assert_eq!(
        h.orchestrator.state(AttemptKind::Login),
        AuthState::Failed(FailureReason::SignatureRejected)
    );
    assert!(h.provider.is_connected());
    assert!(h.orchestrator.wallet_session().unwrap().connected);
    assert_eq!(h.verifier.call_count(), 0);
    assert_eq!(h.sessions.get(), None);
}

#[tokio::test]
async fn test_retry_after_failure_uses_fresh_nonce() {
    let h = Harness::new();
    h.verifier.fail_next(AuthError::Network("Service unavailable".to_string()));

    let first = h.orchestrator.authenticate().await;
    assert!(!first.success);
    assert_eq!(first.error.as_deref(), Some("Network error: Service unavailable"));
    assert_eq!(
        h.orchestrator.state(AttemptKind::Login),
        AuthState::Failed(FailureReason::NetworkError)
    );

    let second = h.orchestrator.authenticate().await;
    assert!(second.success);

    let calls = h.verifier.calls();
    assert_eq!(calls.len(), 2);
    assert_ne!(calls[0].request.nonce, calls[1].request.nonce);
    assert_eq!(h.provider.connect_calls(), 1);
}

#[tokio::test]
async fn test_backend_message_is_surfaced() {
    let h = Harness::new();
    h.verifier.fail_next(AuthError::VerificationRejected {
        message: "Wallet is banned".to_string(),
    });

    let outcome = h.orchestrator.authenticate().await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Wallet is banned"));
    assert_eq!(
        h.orchestrator.state(AttemptKind::Login),
        AuthState::Failed(FailureReason::VerificationRejected)
    );
}

#[tokio::test]
async fn test_account_switch_mid_flight_prevents_verify() {
    let h = Harness::new();
    h.provider.switch_account_on_sign(other_account());

    let err = h.orchestrator.try_authenticate().await.unwrap_err();

    assert!(matches!(err, AuthError::SessionChanged));
    assert_eq!(h.verifier.call_count(), 0);
    assert_eq!(h.sessions.get(), None);
    assert_eq!(h.orchestrator.state(AttemptKind::Login), AuthState::Idle);
    assert_eq!(h.orchestrator.wallet_session().unwrap().address, "0xDEF");

    // The next attempt signs with the new account
    let outcome = h.orchestrator.authenticate().await;
    assert!(outcome.success);
    assert_eq!(h.verifier.calls()[0].request.address, "0xDEF");
}

#[tokio::test]
async fn test_network_switch_while_signing_aborts_attempt() {
    let h = Harness::new();
    assert_ok!(h.connector.connect(None).await);
    let gate = h.provider.hold_sign();

    let (result, ()) = tokio::join!(h.orchestrator.try_authenticate(), async {
        while h.provider.sign_calls() == 0 {
            tokio::task::yield_now().await;
        }
        h.provider.emit_network_change(Some("devnet".to_string()));
        gate.notify_one();
    });

    assert!(matches!(result, Err(AuthError::SessionChanged)));
    assert_eq!(h.verifier.call_count(), 0);
    assert_eq!(h.orchestrator.state(AttemptKind::Login), AuthState::Idle);
    assert_eq!(
        h.orchestrator.wallet_session().unwrap().network.as_deref(),
        Some("devnet")
    );
}

#[tokio::test]
async fn test_account_switch_during_verify_discards_credential() {
    let h = Harness::new();
    let gate = h.verifier.hold();

    let (result, ()) = tokio::join!(h.orchestrator.try_authenticate(), async {
        while h.verifier.call_count() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            h.orchestrator.state(AttemptKind::Login),
            AuthState::Verifying
        );
        h.provider.emit_account_change(Some(other_account()));
        gate.notify_one();
    });

    assert!(matches!(result, Err(AuthError::SessionChanged)));
    assert_eq!(h.verifier.call_count(), 1);
    assert_eq!(h.sessions.get(), None);
    assert_eq!(h.orchestrator.state(AttemptKind::Login), AuthState::Idle);
    assert_eq!(h.orchestrator.wallet_session().unwrap().address, "0xDEF");
}

#[tokio::test]
async fn test_logout_during_verify_keeps_session_cleared() {
    let h = Harness::new();
    let gate = h.verifier.hold();

    let (result, ()) = tokio::join!(h.orchestrator.try_authenticate(), async {
        while h.verifier.call_count() == 0 {
            tokio::task::yield_now().await;
        }
        h.orchestrator.logout().await;
        gate.notify_one();
    });

    assert!(matches!(result, Err(AuthError::SessionChanged)));
    assert_eq!(h.sessions.get(), None);
    assert_eq!(h.orchestrator.wallet_session(), None);
    assert_eq!(h.orchestrator.state(AttemptKind::Login), AuthState::Idle);
}

#[tokio::test]
async fn test_logout_while_connecting_aborts_attempt() {
    let h = Harness::new();
    h.provider.set_connect_response(MockResponse::Hang);

    let (result, ()) = tokio::join!(h.orchestrator.try_authenticate(), async {
        while h.provider.connect_calls() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            h.orchestrator.state(AttemptKind::Login),
            AuthState::Connecting
        );
        h.orchestrator.logout().await;
    });

    assert!(matches!(result, Err(AuthError::SessionChanged)));
    assert_eq!(h.verifier.call_count(), 0);
    assert_eq!(h.sessions.get(), None);
    assert_eq!(h.orchestrator.wallet_session(), None);
    assert_eq!(h.orchestrator.state(AttemptKind::Login), AuthState::Idle);

    // The slot is free again once the wallet answers
    h.provider.set_connect_response(MockResponse::Approve);
    assert_ok!(h.orchestrator.try_authenticate().await);
}

#[tokio::test]
async fn test_concurrent_login_is_rejected() {
    let h = Harness::new();
    let gate = h.provider.hold_sign();

    let (first, second) = tokio::join!(h.orchestrator.try_authenticate(), async {
        while h.provider.sign_calls() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            h.orchestrator.state(AttemptKind::Login),
            AuthState::AwaitingSignature
        );
        let second = h.orchestrator.try_authenticate().await;
        gate.notify_one();
        second
    });

    assert_eq!(assert_ok!(first).token, TEST_TOKEN);
    assert!(matches!(
        second,
        Err(AuthError::AttemptInProgress {
            kind: AttemptKind::Login
        })
    ));
    assert_eq!(h.provider.connect_calls(), 1);
    assert_eq!(h.provider.sign_calls(), 1);
    assert_eq!(h.verifier.call_count(), 1);
}

#[tokio::test]
async fn test_dropped_attempt_releases_slot() {
    let h = Harness::new();
    h.provider.set_sign_response(MockResponse::Hang);

    let timed_out = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        h.orchestrator.try_authenticate(),
    )
    .await;
    assert!(timed_out.is_err());
    assert_eq!(h.orchestrator.state(AttemptKind::Login), AuthState::Idle);

    h.provider.set_sign_response(MockResponse::Approve);
    assert_ok!(h.orchestrator.try_authenticate().await);
}

#[tokio::test]
async fn test_link_without_login_session() {
    let h = Harness::new();

    let outcome = h.orchestrator.link_wallet().await;

    assert!(outcome.success);
    assert_eq!(outcome.token, None);
    assert_eq!(h.sessions.get(), None);
    assert_eq!(h.orchestrator.state(AttemptKind::Link), AuthState::Authenticated);
    assert_eq!(h.orchestrator.state(AttemptKind::Login), AuthState::Idle);

    let calls = h.verifier.calls();
    assert_eq!(calls[0].bearer, None);
    assert!(calls[0].request.message.contains("link this wallet"));
}

#[tokio::test]
async fn test_link_after_login_sends_bearer_and_keeps_token() {
    let h = Harness::new();
    assert_ok!(h.orchestrator.try_authenticate().await);

    assert_ok!(h.orchestrator.try_link_wallet().await);

    let calls = h.verifier.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].bearer.as_deref(), Some(TEST_TOKEN));
    assert_ne!(calls[0].request.message, calls[1].request.message);
    assert_eq!(h.sessions.get(), Some(SessionCredential::new(TEST_TOKEN)));
}

#[tokio::test]
async fn test_login_and_link_run_side_by_side() {
    let h = Harness::new();

    let (login, link) = tokio::join!(h.orchestrator.authenticate(), h.orchestrator.link_wallet());

    assert!(login.success);
    assert!(link.success);
    assert_eq!(h.provider.connect_calls(), 1);
    assert_eq!(h.verifier.call_count(), 2);
}

#[tokio::test]
async fn test_wallet_change_settles_finished_attempt() {
    let h = Harness::new();
    assert_ok!(h.orchestrator.try_authenticate().await);
    let mut states = h.orchestrator.subscribe_state(AttemptKind::Login);

    h.provider.emit_account_change(Some(other_account()));

    assert_ok!(states.changed().await);
    assert_eq!(*states.borrow(), AuthState::Idle);
}

#[tokio::test]
async fn test_logout_clears_everything() {
    let h = Harness::new();
    assert_ok!(h.orchestrator.try_authenticate().await);

    h.orchestrator.logout().await;

    assert_eq!(h.sessions.get(), None);
    assert_eq!(h.orchestrator.wallet_session(), None);
    assert!(!h.provider.is_connected());
    assert_eq!(h.orchestrator.state(AttemptKind::Login), AuthState::Idle);

    // A second logout is a no-op
    h.orchestrator.logout().await;
    assert_eq!(h.orchestrator.state(AttemptKind::Login), AuthState::Idle);
}

#[tokio::test]
async fn test_rehydrated_session_starts_authenticated() {
    let tokens = Arc::new(MemoryTokenStore::new());
    assert_ok!(tokens.save("auth_token", "persisted"));
    let sessions = SessionStore::with_backing(tokens.clone());
    assert!(sessions.rehydrate().is_some());

    let h = Harness::build(
        MockWalletProvider::new(TEST_ADDRESS, TEST_PUBLIC_KEY),
        sessions,
    );

    assert_eq!(h.orchestrator.state(AttemptKind::Login), AuthState::Authenticated);
    assert_eq!(h.sessions.get(), Some(SessionCredential::new("persisted")));

    h.orchestrator.reset(AttemptKind::Login);
    assert_ok!(h.orchestrator.try_authenticate().await);
    assert_eq!(assert_ok!(tokens.load("auth_token")).as_deref(), Some(TEST_TOKEN));
}
