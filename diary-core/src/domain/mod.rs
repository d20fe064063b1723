mod access_state;
mod entry;
mod error;
mod store_credentials;

pub use access_state::*;
pub use entry::*;
pub use error::*;
pub use store_credentials::*;
