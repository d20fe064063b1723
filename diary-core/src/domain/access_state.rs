use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Consecutive failures that trigger a lockout.
pub const MAX_ATTEMPTS: u32 = 3;

/// How long a lockout lasts.
pub const LOCKOUT_DURATION: Duration = Duration::HOUR;

/// Gate bookkeeping that survives restarts.
///
/// The serialized key names are fixed; persisted files written by older
/// clients must keep loading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessState {
    #[serde(rename = "passwordErrorCount", default)]
    pub failure_count: u32,
    #[serde(
        rename = "passwordLockTime",
        default,
        with = "time::serde::rfc3339::option"
    )]
    pub lock_until: Option<OffsetDateTime>,
    #[serde(rename = "diaryVerified", default)]
    pub verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPhase {
    Unverified,
    Locked { until: OffsetDateTime },
    Verified,
}

impl AccessState {
    pub fn phase(&self, now: OffsetDateTime) -> AccessPhase {
        match self.lock_until {
            Some(until) if now < until => AccessPhase::Locked { until },
            _ if self.verified => AccessPhase::Verified,
            _ => AccessPhase::Unverified,
        }
    }

    pub fn remaining_attempts(&self) -> u32 {
        MAX_ATTEMPTS.saturating_sub(self.failure_count)
    }

    pub(crate) fn record_success(&mut self) {
        self.failure_count = 0;
        self.lock_until = None;
        self.verified = true;
    }

    /// Returns the lock deadline when this failure locked the gate.
    pub(crate) fn record_failure(&mut self, now: OffsetDateTime) -> Option<OffsetDateTime> {
        self.failure_count = self.failure_count.saturating_add(1);
        if self.failure_count >= MAX_ATTEMPTS {
            let until = now + LOCKOUT_DURATION;
            self.lock_until = Some(until);
            Some(until)
        } else {
            None
        }
    }

    /// Ends the verified session. Failure bookkeeping is left alone.
    pub fn sign_out(&mut self) {
        self.verified = false;
    }
}
