/*
[INPUT]:  Wallet connector, challenge builder, verification client, session store
[OUTPUT]: Login and wallet-link outcomes, observable per-kind auth state
[POS]:    Auth layer - orchestrates the connect -> sign -> verify flow
[UPDATE]: When flow steps, deduplication or invalidation rules change
*/

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::auth::state::{AttemptEvent, AuthState};
use crate::auth::subscription::Subscription;
use crate::auth::{ChallengeBuilder, SessionStore, WalletConnector};
use crate::http::{AuthError, FailureStep, Result, VerificationClient};
use crate::types::{
    AttemptKind, AuthAttempt, AuthOutcome, SessionCredential, WalletSession, WalletVerifyRequest,
};

/// Per-kind attempt bookkeeping
#[derive(Debug)]
struct AttemptSlot {
    kind: AttemptKind,
    busy: AtomicBool,
    state: watch::Sender<AuthState>,
}

impl AttemptSlot {
    fn new(kind: AttemptKind, initial: AuthState) -> Self {
        let (state, _rx) = watch::channel(initial);
        Self {
            kind,
            busy: AtomicBool::new(false),
            state,
        }
    }

    fn try_acquire(&self) -> Option<AttemptGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| AttemptGuard { slot: self })
    }

    fn advance(&self, event: AttemptEvent) {
        let kind = self.kind;
        self.state.send_if_modified(|state| match state.next(event) {
            Some(next) => {
                debug!(%kind, from = %state, to = %next, "auth state transition");
                let modified = *state != next;
                *state = next;
                modified
            }
            None => {
                warn!(%kind, state = %state, ?event, "ignoring illegal auth state transition");
                false
            }
        });
    }

    /// Return a finished attempt to `Idle` after an external wallet change.
    /// In-flight attempts notice the change themselves.
    fn settle_after_wallet_change(&self) {
        self.state.send_if_modified(|state| {
            if state.is_terminal() {
                *state = AuthState::Idle;
                true
            } else {
                false
            }
        });
    }
}

/// Releases the slot when the attempt ends, including when the caller drops
/// the attempt future.
struct AttemptGuard<'a> {
    slot: &'a AttemptSlot,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if self.slot.state.borrow().is_in_flight() {
            self.slot.advance(AttemptEvent::SessionChanged);
        }
        self.slot.busy.store(false, Ordering::Release);
    }
}

/// Successful result of one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
enum Completed {
    Authenticated(SessionCredential),
    Linked,
}

/// Drives wallet login and wallet linking
///
/// At most one attempt per kind runs at a time; a second call of the same
/// kind is rejected with `AttemptInProgress`. Login and link attempts may run
/// side by side and share the connector, which serializes connects.
pub struct AuthOrchestrator {
    connector: Arc<WalletConnector>,
    challenges: ChallengeBuilder,
    verifier: Arc<dyn VerificationClient>,
    sessions: SessionStore,
    login: Arc<AttemptSlot>,
    link: Arc<AttemptSlot>,
    _wallet_subscriptions: Vec<Subscription>,
}

impl AuthOrchestrator {
    pub fn new(
        connector: Arc<WalletConnector>,
        challenges: ChallengeBuilder,
        verifier: Arc<dyn VerificationClient>,
        sessions: SessionStore,
    ) -> Self {
        let initial_login = if sessions.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Idle
        };
        let login = Arc::new(AttemptSlot::new(AttemptKind::Login, initial_login));
        let link = Arc::new(AttemptSlot::new(AttemptKind::Link, AuthState::Idle));

        let subscriptions = {
            let (login_a, link_a) = (login.clone(), link.clone());
            let (login_n, link_n) = (login.clone(), link.clone());
            vec![
                connector.subscribe_account_change(move |_| {
                    login_a.settle_after_wallet_change();
                    link_a.settle_after_wallet_change();
                }),
                connector.subscribe_network_change(move |_| {
                    login_n.settle_after_wallet_change();
                    link_n.settle_after_wallet_change();
                }),
            ]
        };

        Self {
            connector,
            challenges,
            verifier,
            sessions,
            login,
            link,
            _wallet_subscriptions: subscriptions,
        }
    }

    pub fn connector(&self) -> &Arc<WalletConnector> {
        &self.connector
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Read-only view of the connected wallet
    pub fn wallet_session(&self) -> Option<WalletSession> {
        self.connector.current_session()
    }

    pub fn state(&self, kind: AttemptKind) -> AuthState {
        *self.slot(kind).state.borrow()
    }

    pub fn subscribe_state(&self, kind: AttemptKind) -> watch::Receiver<AuthState> {
        self.slot(kind).state.subscribe()
    }

    /// Return a finished attempt of `kind` to `Idle`
    pub fn reset(&self, kind: AttemptKind) {
        self.slot(kind).advance(AttemptEvent::Reset);
    }

    /// Log in with the wallet: `{success, token}` or `{success: false, error}`
    pub async fn authenticate(&self) -> AuthOutcome {
        match self.try_authenticate().await {
            Ok(credential) => AuthOutcome::authenticated(credential.token),
            Err(e) => AuthOutcome::failed(&e),
        }
    }

    /// Link the wallet to the current account: `{success}` or `{success: false, error}`
    pub async fn link_wallet(&self) -> AuthOutcome {
        match self.try_link_wallet().await {
            Ok(()) => AuthOutcome::linked(),
            Err(e) => AuthOutcome::failed(&e),
        }
    }

    /// Log in with the wallet, returning typed errors
    pub async fn try_authenticate(&self) -> Result<SessionCredential> {
        match self.run(AttemptKind::Login).await? {
            Completed::Authenticated(credential) => Ok(credential),
            Completed::Linked => Err(AuthError::InvalidResponse(
                "login attempt completed without a credential".to_string(),
            )),
        }
    }

    /// Link the wallet, returning typed errors
    pub async fn try_link_wallet(&self) -> Result<()> {
        self.run(AttemptKind::Link).await.map(|_| ())
    }

    /// Sign out: abort running attempts, disconnect the wallet, then drop
    /// the credential.
    ///
    /// The epoch is bumped before the credential is cleared so an attempt
    /// that is about to commit is refused instead of restoring a token.
    pub async fn logout(&self) {
        self.connector.invalidate();
        self.connector.disconnect().await;
        self.sessions.clear();
        self.login.advance(AttemptEvent::Reset);
        info!("logged out");
    }

    fn slot(&self, kind: AttemptKind) -> &AttemptSlot {
        match kind {
            AttemptKind::Login => &self.login,
            AttemptKind::Link => &self.link,
        }
    }

    async fn run(&self, kind: AttemptKind) -> Result<Completed> {
        let slot = self.slot(kind);
        let Some(_guard) = slot.try_acquire() else {
            debug!(%kind, "rejecting concurrent attempt");
            return Err(AuthError::AttemptInProgress { kind });
        };

        let attempt = AuthAttempt::new(kind);
        let span = info_span!("auth_attempt", attempt_id = %attempt.id, %kind);

        async move {
            slot.advance(AttemptEvent::Reset);

            let mut epoch = self.connector.session_epoch();
            let existing = self.connector.current_session();
            slot.advance(AttemptEvent::Start {
                has_session: existing.is_some(),
            });

            match self.drive(slot, existing, &mut epoch).await {
                Ok(completed) => {
                    slot.advance(AttemptEvent::Verified);
                    let elapsed = chrono::Utc::now() - attempt.started_at;
                    info!(elapsed_ms = elapsed.num_milliseconds(), "attempt succeeded");
                    Ok(completed)
                }
                Err((step, AuthError::SessionChanged)) => {
                    warn!(?step, "attempt aborted, wallet session changed");
                    slot.advance(AttemptEvent::SessionChanged);
                    Err(AuthError::SessionChanged)
                }
                Err((step, e)) => {
                    let reason = e.failure_reason(step);
                    warn!(?step, ?reason, error = %e, "attempt failed");
                    slot.advance(AttemptEvent::Fail(reason));
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        slot: &AttemptSlot,
        existing: Option<WalletSession>,
        epoch: &mut watch::Receiver<u64>,
    ) -> std::result::Result<Completed, (FailureStep, AuthError)> {
        use FailureStep::{Connect, Sign, Verify};

        if !self.connector.is_provider_installed() {
            return Err((Connect, AuthError::ProviderUnavailable));
        }

        let session = match existing {
            Some(session) => session,
            None => {
                let session = guarded(epoch, self.connector.connect(None))
                    .await
                    .map_err(|e| (Connect, e))?;
                slot.advance(AttemptEvent::Connected);
                session
            }
        };

        let challenge = self.challenges.build(slot.kind, &session.address);
        debug!(address = %session.address, nonce = %challenge.nonce, "challenge issued");

        let proof = guarded(epoch, self.connector.sign(challenge))
            .await
            .map_err(|e| (Sign, e))?;
        ensure_current(epoch).map_err(|e| (Sign, e))?;
        slot.advance(AttemptEvent::Signed);

        let request = WalletVerifyRequest::new(&session, proof);
        match slot.kind {
            AttemptKind::Login => {
                let credential = guarded(epoch, self.verifier.verify_login(request))
                    .await
                    .map_err(|e| (Verify, e))?;
                self.connector
                    .commit_if_current(epoch, || self.sessions.set(credential.clone()))
                    .map_err(|e| (Verify, e))?;
                Ok(Completed::Authenticated(credential))
            }
            AttemptKind::Link => {
                let bearer = self.sessions.get().map(|credential| credential.token);
                guarded(epoch, self.verifier.verify_link(request, bearer.as_deref()))
                    .await
                    .map_err(|e| (Verify, e))?;
                ensure_current(epoch).map_err(|e| (Verify, e))?;
                Ok(Completed::Linked)
            }
        }
    }
}

impl std::fmt::Debug for AuthOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthOrchestrator")
            .field("connector", &self.connector)
            .field("login", &self.state(AttemptKind::Login))
            .field("link", &self.state(AttemptKind::Link))
            .finish()
    }
}

/// Race an external call against session invalidation
async fn guarded<T>(
    epoch: &mut watch::Receiver<u64>,
    step: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        Ok(()) = epoch.changed() => Err(AuthError::SessionChanged),
        result = step => result,
    }
}

fn ensure_current(epoch: &watch::Receiver<u64>) -> Result<()> {
    match epoch.has_changed() {
        Ok(false) => Ok(()),
        _ => Err(AuthError::SessionChanged),
    }
}
