use anyhow::{bail, Context, Result};
use diary_core::{ListingConfig, StoreCredentials, VerificationMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryConfig {
    /// Base URL of the verification service, e.g. "http://localhost:8080"
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Must match the service's `gate.mode`
    #[serde(default)]
    pub mode: VerificationMode,
    #[serde(flatten)]
    pub listing: ListingConfig,
    /// Where lockouts are reported; nothing is sent when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beacon_url: Option<String>,
    /// Page identifier sent with lockout reports
    #[serde(default = "default_page_url")]
    pub page_url: String,
    /// Store URL and key to use instead of the ones handed out on unlock
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_key: Option<String>,
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_page_url() -> String {
    "diary-cli".to_string()
}

impl Default for DiaryConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            mode: VerificationMode::default(),
            listing: ListingConfig::default(),
            beacon_url: None,
            page_url: default_page_url(),
            store_url: None,
            store_key: None,
        }
    }
}

impl DiaryConfig {
    pub fn root_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Cannot determine config directory")?
            .join("diary-cli"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::root_path()?.join("config.toml"))
    }

    /// Load config from disk. Returns default config if file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        if config.listing.page_size == 0 {
            bail!("Invalid config at {}: page_size must be at least 1", path.display());
        }
        Ok(config)
    }

    /// Writes the default config unless a file already exists.
    pub fn write_default_if_missing(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(&Self::default())?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write config at {}", path.display()))?;
        Ok(true)
    }

    pub fn store_override(&self) -> Option<StoreCredentials> {
        match (&self.store_url, &self.store_key) {
            (Some(url), Some(key)) => Some(StoreCredentials::new(url.as_str(), key.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DiaryConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, DiaryConfig::default());
        assert_eq!(config.listing.page_size, 10);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "api_url = \"https://diary.example.com\"\nmode = \"direct\"\npage_size = 5\n",
        )
        .unwrap();

        let config = DiaryConfig::load_from(&path).unwrap();

        assert_eq!(config.api_url, "https://diary.example.com");
        assert_eq!(config.mode, VerificationMode::Direct);
        assert_eq!(config.listing.page_size, 5);
        assert_eq!(config.listing.preview_len, 100);
        assert_eq!(config.store_override(), None);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "page_size = 0\n").unwrap();

        let err = DiaryConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("page_size must be at least 1"));
    }

    #[test]
    fn default_file_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(DiaryConfig::write_default_if_missing(&path).unwrap());
        assert!(!DiaryConfig::write_default_if_missing(&path).unwrap());
        assert_eq!(DiaryConfig::load_from(&path).unwrap(), DiaryConfig::default());
    }

    #[test]
    fn store_override_needs_both_halves() {
        let config = DiaryConfig {
            store_url: Some("https://abc.supabase.co".to_string()),
            ..DiaryConfig::default()
        };
        assert_eq!(config.store_override(), None);

        let config = DiaryConfig {
            store_key: Some("anon".to_string()),
            ..config
        };
        assert_eq!(
            config.store_override(),
            Some(StoreCredentials::new("https://abc.supabase.co", "anon"))
        );
    }
}
