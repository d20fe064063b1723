mod beacon;
mod http_verifier;
mod memory;
mod postgrest;

pub use beacon::BeaconNotifier;
pub use http_verifier::HttpVerifier;
pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
