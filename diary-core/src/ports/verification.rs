//! Verification backend port (outbound).

use async_trait::async_trait;

use crate::{credential::Credential, domain::GateError, domain::StoreCredentials};

/// Answer of a verification backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub success: bool,
    /// Store connection details revealed on success, when the backend has them.
    pub store: Option<StoreCredentials>,
}

impl Verdict {
    pub fn rejected() -> Self {
        Self {
            success: false,
            store: None,
        }
    }
}

#[async_trait]
pub trait VerificationBackend: Send + Sync + 'static {
    /// `Ok` with `success: false` is a credential rejection; `Err` means the
    /// check could not be made at all.
    async fn verify(&self, credential: &Credential) -> Result<Verdict, GateError>;
}
