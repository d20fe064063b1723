use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection details for the hosted entry store, as handed out by the
/// verification service once the password checks out.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCredentials {
    #[serde(rename = "supabaseUrl")]
    pub url: String,
    #[serde(rename = "supabaseKey")]
    pub anon_key: String,
}

impl StoreCredentials {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
        }
    }
}

impl fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .finish()
    }
}
