//! The password gate in front of the diary.
//!
//! `Unverified --success--> Verified`, `Unverified --3rd failure--> Locked`,
//! `Locked --deadline passes--> Unverified`. `Verified` lasts until sign-out.

use time::{Duration, OffsetDateTime};
use tracing::{debug, info, instrument, warn};

use crate::{
    clock::{Clock, SystemClock},
    credential::{Credential, VerificationMode},
    domain::{AccessPhase, AccessState, GateError, StoreCredentials},
    ports::{LockoutNotifier, VerificationBackend},
};

/// Proof that the gate was passed. Listing requires one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSession {
    store: Option<StoreCredentials>,
}

impl VerifiedSession {
    /// Resumes a session persisted as verified.
    pub fn resume(state: &AccessState, store: Option<StoreCredentials>) -> Option<Self> {
        state.verified.then_some(Self { store })
    }

    pub fn store_credentials(&self) -> Option<&StoreCredentials> {
        self.store.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Granted(VerifiedSession),
    Rejected {
        remaining_attempts: u32,
    },
    Locked {
        unlock_at: OffsetDateTime,
        remaining: Duration,
    },
}

pub struct AccessGate<B, N = (), C = SystemClock> {
    backend: B,
    notifier: N,
    clock: C,
    mode: VerificationMode,
}

impl<B: VerificationBackend> AccessGate<B> {
    pub fn new(backend: B, mode: VerificationMode) -> Self {
        Self {
            backend,
            notifier: (),
            clock: SystemClock,
            mode,
        }
    }
}

impl<B, N, C> AccessGate<B, N, C> {
    pub fn with_notifier<N2: LockoutNotifier>(self, notifier: N2) -> AccessGate<B, N2, C> {
        AccessGate {
            backend: self.backend,
            notifier,
            clock: self.clock,
            mode: self.mode,
        }
    }

    pub fn with_clock<C2: Clock>(self, clock: C2) -> AccessGate<B, N, C2> {
        AccessGate {
            backend: self.backend,
            notifier: self.notifier,
            clock,
            mode: self.mode,
        }
    }

    pub fn mode(&self) -> VerificationMode {
        self.mode
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }
}

impl<B, N, C> AccessGate<B, N, C>
where
    B: VerificationBackend,
    N: LockoutNotifier,
    C: Clock,
{
    pub fn phase(&self, state: &AccessState) -> AccessPhase {
        state.phase(self.clock.now())
    }

    /// Checks `candidate`, updating `state` in place.
    ///
    /// Callers persist `state` afterwards whatever the outcome; on `Err` it
    /// is left exactly as it was.
    #[instrument(name = "submit_credential", skip_all, fields(mode = %self.mode))]
    pub async fn submit_credential(
        &self,
        state: &mut AccessState,
        candidate: &str,
    ) -> Result<GateOutcome, GateError> {
        let now = self.clock.now();

        match state.phase(now) {
            AccessPhase::Locked { until } => {
                debug!(%until, "gate locked, not contacting backend");
                return Ok(GateOutcome::Locked {
                    unlock_at: until,
                    remaining: until - now,
                });
            }
            AccessPhase::Verified => {
                return Ok(GateOutcome::Granted(VerifiedSession { store: None }));
            }
            AccessPhase::Unverified => {}
        }

        let credential = Credential::for_mode(self.mode, candidate);
        let verdict = self.backend.verify(&credential).await?;

        if verdict.success {
            info!("credential accepted");
            state.record_success();
            return Ok(GateOutcome::Granted(VerifiedSession {
                store: verdict.store,
            }));
        }

        match state.record_failure(now) {
            Some(until) => {
                warn!(failures = state.failure_count, %until, "gate locked");
                self.notifier.notify_lockout();
                Ok(GateOutcome::Locked {
                    unlock_at: until,
                    remaining: until - now,
                })
            }
            None => {
                debug!(failures = state.failure_count, "credential rejected");
                Ok(GateOutcome::Rejected {
                    remaining_attempts: state.remaining_attempts(),
                })
            }
        }
    }
}
