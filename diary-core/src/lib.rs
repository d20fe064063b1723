//! Core of the diary: the password gate, the paginated entry listing and the
//! mutations that resynchronize it, written against ports so the hosted
//! store and the verification service can be swapped for in-memory doubles.

pub mod adapters;
pub mod clock;
pub mod credential;
pub mod domain;
pub mod gate;
pub mod listing;
mod mutations;
pub mod ports;

pub use clock::{Clock, SystemClock};
pub use credential::{Credential, CredentialVerifier, VerificationMode};
pub use domain::*;
pub use gate::{AccessGate, GateOutcome, VerifiedSession};
pub use listing::{ListingConfig, ListingController, LoadOutcome, ScrollPosition};
pub use mutations::EntryDraft;
