use std::{path::Path, str::FromStr};

use diary_core::{StoreCredentials, VerificationMode};
use serde::Deserialize;
use serde_with::serde_as;
use strum::{Display, EnumString};

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub gate: GateSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub port: u16,
    pub host: String,
    /// Origins allowed to call the API from a browser.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Deserialize, Clone, Default)]
pub struct GateSettings {
    #[serde(default)]
    pub mode: VerificationMode,
    /// The diary password. Usually supplied as `DIARY_GATE__PASSWORD`.
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Deserialize, Clone, Default)]
pub struct StoreSettings {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub anon_key: Option<String>,
}

impl GateSettings {
    pub fn secret(&self) -> Option<&str> {
        non_empty(self.password.as_deref())
    }
}

impl StoreSettings {
    /// Both halves must be present for the store to be handed out.
    pub fn credentials(&self) -> Option<StoreCredentials> {
        let url = non_empty(self.url.as_deref())?;
        let key = non_empty(self.anon_key.as_deref())?;
        Some(StoreCredentials::new(url, key))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn read_config() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!("Failed to determine the current directory: {e}"))
    })?;

    let environment = Environment::from_str(
        std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .as_str(),
    )
    .map_err(|e| config::ConfigError::Message(format!("Failed to parse APP_ENVIRONMENT: {e}")))?;

    build_settings(&base_path.join("config"), environment)
}

pub fn build_settings(
    config_directory: &Path,
    environment: Environment,
) -> Result<Settings, config::ConfigError> {
    let environment_filename = format!("{}.yaml", environment);

    let settings = config::Config::builder()
        .add_source(config::File::from(config_directory.join("base.yaml")))
        .add_source(config::File::from(
            config_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("DIARY")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, EnumString)]
pub enum Environment {
    #[strum(ascii_case_insensitive, serialize = "local")]
    Local,
    #[strum(ascii_case_insensitive, serialize = "production")]
    Production,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_dir() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("config")
    }

    #[test]
    fn environment_parses_case_insensitively() {
        assert_eq!(Environment::from_str("Production"), Ok(Environment::Production));
        assert_eq!(Environment::from_str("LOCAL"), Ok(Environment::Local));
        assert!(Environment::from_str("staging").is_err());
    }

    #[test]
    fn local_overrides_base() {
        let settings = build_settings(&config_dir(), Environment::Local).unwrap();

        assert_eq!(settings.application.host, "127.0.0.1");
        assert_eq!(settings.application.port, 8080);
        assert_eq!(settings.gate.mode, VerificationMode::Challenge);
    }

    #[test]
    fn blank_values_count_as_missing() {
        let store = StoreSettings {
            url: Some("https://abc.supabase.co".to_string()),
            anon_key: Some("  ".to_string()),
        };
        assert_eq!(store.credentials(), None);

        let gate = GateSettings {
            password: Some(String::new()),
            ..GateSettings::default()
        };
        assert_eq!(gate.secret(), None);
    }
}
