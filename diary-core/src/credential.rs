//! Password checking shared by the client and the verification service.
//!
//! Challenge mode sends `SHA256(password + salt)` together with a fresh salt
//! instead of the password. Anyone who captures a `{hash, salt}` pair can
//! still guess the secret offline; only an encrypted transport prevents that.

use std::fmt;

use async_trait::async_trait;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::{
    domain::GateError,
    ports::{Verdict, VerificationBackend},
};

const SALT_BYTES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMode {
    /// Password travels as-is; only acceptable over TLS.
    Direct,
    /// Password travels as a salted SHA-256.
    #[default]
    Challenge,
}

impl fmt::Display for VerificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Challenge => f.write_str("challenge"),
        }
    }
}

/// What the client submits to the verification service.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Credential {
    Plain {
        password: String,
    },
    Hashed {
        #[serde(rename = "hashedPassword")]
        hash: String,
        salt: String,
    },
}

impl Credential {
    /// Builds the credential for `mode`, drawing a fresh salt for challenges.
    pub fn for_mode(mode: VerificationMode, candidate: &str) -> Self {
        match mode {
            VerificationMode::Direct => Self::Plain {
                password: candidate.to_string(),
            },
            VerificationMode::Challenge => Self::challenge(candidate, generate_salt()),
        }
    }

    pub fn challenge(candidate: &str, salt: String) -> Self {
        Self::Hashed {
            hash: salted_hash(candidate, &salt),
            salt,
        }
    }

    pub fn mode(&self) -> VerificationMode {
        match self {
            Self::Plain { .. } => VerificationMode::Direct,
            Self::Hashed { .. } => VerificationMode::Challenge,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain { .. } => f.write_str("Credential::Plain(<redacted>)"),
            Self::Hashed { salt, .. } => f
                .debug_struct("Credential::Hashed")
                .field("salt", salt)
                .finish_non_exhaustive(),
        }
    }
}

/// Lowercase hex of `SHA256(secret || salt)`.
pub fn salted_hash(secret: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(salt.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected} credentials, got {got}")]
pub struct UnexpectedCredential {
    pub expected: VerificationMode,
    pub got: VerificationMode,
}

/// Checks submitted credentials against the server-held secret.
#[derive(Clone)]
pub enum CredentialVerifier {
    PlaintextCompare { secret: String },
    SaltedHashChallenge { secret: String },
}

impl CredentialVerifier {
    pub fn new(mode: VerificationMode, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        match mode {
            VerificationMode::Direct => Self::PlaintextCompare { secret },
            VerificationMode::Challenge => Self::SaltedHashChallenge { secret },
        }
    }

    pub fn mode(&self) -> VerificationMode {
        match self {
            Self::PlaintextCompare { .. } => VerificationMode::Direct,
            Self::SaltedHashChallenge { .. } => VerificationMode::Challenge,
        }
    }

    pub fn check(&self, credential: &Credential) -> Result<bool, UnexpectedCredential> {
        match (self, credential) {
            (Self::PlaintextCompare { secret }, Credential::Plain { password }) => {
                Ok(password.as_bytes() == secret.as_bytes())
            }
            (Self::SaltedHashChallenge { secret }, Credential::Hashed { hash, salt }) => {
                Ok(*hash == salted_hash(secret, salt))
            }
            _ => Err(UnexpectedCredential {
                expected: self.mode(),
                got: credential.mode(),
            }),
        }
    }
}

impl fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialVerifier({})", self.mode())
    }
}

/// Local verification, used by dev mode and tests in place of the service.
#[async_trait]
impl VerificationBackend for CredentialVerifier {
    async fn verify(&self, credential: &Credential) -> Result<Verdict, GateError> {
        let success = self.check(credential).map_err(|e| {
            GateError::Server {
                status: 400,
                message: e.to_string(),
            }
        })?;

        Ok(Verdict {
            success,
            store: None,
        })
    }
}
