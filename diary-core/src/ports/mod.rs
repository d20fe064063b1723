mod entry_store;
mod lockout_notifier;
mod verification;

pub use entry_store::*;
pub use lockout_notifier::*;
pub use verification::*;
