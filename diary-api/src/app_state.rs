use std::sync::Arc;

use diary_core::{CredentialVerifier, StoreCredentials, VerificationMode};

use crate::config::Settings;

#[derive(Debug, thiserror::Error)]
pub enum AppStateError {
    #[error("{0} is not configured")]
    Misconfigured(&'static str),
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    mode: VerificationMode,
    verifier: Option<CredentialVerifier>,
    store: Option<StoreCredentials>,
}

impl AppState {
    pub fn new(
        mode: VerificationMode,
        secret: Option<&str>,
        store: Option<StoreCredentials>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                mode,
                verifier: secret.map(|s| CredentialVerifier::new(mode, s)),
                store,
            }),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.gate.mode,
            settings.gate.secret(),
            settings.store.credentials(),
        )
    }

    pub fn mode(&self) -> VerificationMode {
        self.inner.mode
    }

    /// The verifier and the store handed out on success. Both must be set.
    pub fn configured(&self) -> Result<(&CredentialVerifier, &StoreCredentials), AppStateError> {
        let verifier = self
            .inner
            .verifier
            .as_ref()
            .ok_or(AppStateError::Misconfigured("gate.password"))?;
        let store = self
            .inner
            .store
            .as_ref()
            .ok_or(AppStateError::Misconfigured("store"))?;
        Ok((verifier, store))
    }
}
