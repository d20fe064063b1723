use anyhow::{Context, Result};
use diary_core::{AccessState, StoreCredentials};
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::{io::Write, os::unix::fs::OpenOptionsExt};

use crate::config::DiaryConfig;

const ACCESS_STATE_FILE: &str = "access_state.json";
const STORE_CREDENTIALS_FILE: &str = "store_credentials.json";

/// Directory holding gate state and store credentials. Dev mode keeps its
/// own copy so it never touches a real session.
pub fn session_dir(dev: bool) -> Result<PathBuf> {
    let root = DiaryConfig::root_path()?;
    Ok(if dev { root.join("dev") } else { root })
}

fn secure_write(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    #[cfg(unix)]
    {
        std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?
            .write_all(content.as_bytes())?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(path, content)?;
    }

    Ok(())
}

/// Missing file means a fresh gate. A corrupt one is logged and replaced
/// by a fresh gate too.
pub fn load_access_state(dir: &Path) -> Result<AccessState> {
    let path = dir.join(ACCESS_STATE_FILE);
    if !path.exists() {
        return Ok(AccessState::default());
    }

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    match serde_json::from_str(&raw) {
        Ok(state) => Ok(state),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable access state");
            Ok(AccessState::default())
        }
    }
}

pub fn save_access_state(dir: &Path, state: &AccessState) -> Result<()> {
    let raw = serde_json::to_string_pretty(state)?;
    secure_write(&dir.join(ACCESS_STATE_FILE), &raw)
}

pub fn load_store_credentials(dir: &Path) -> Result<Option<StoreCredentials>> {
    let path = dir.join(STORE_CREDENTIALS_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let credentials = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(credentials))
}

pub fn save_store_credentials(dir: &Path, credentials: &StoreCredentials) -> Result<()> {
    let raw = serde_json::to_string_pretty(credentials)?;
    secure_write(&dir.join(STORE_CREDENTIALS_FILE), &raw)
}

pub fn clear_store_credentials(dir: &Path) -> Result<()> {
    let path = dir.join(STORE_CREDENTIALS_FILE);
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use diary_core::AccessPhase;
    use std::time::{Duration, SystemTime};

    #[test]
    fn fresh_directory_has_default_state() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_access_state(dir.path()).unwrap(), AccessState::default());
        assert_eq!(load_store_credentials(dir.path()).unwrap(), None);
    }

    #[test]
    fn lock_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let lock_until = SystemTime::now() + Duration::from_secs(1800);
        let state = AccessState {
            failure_count: 3,
            lock_until: Some(lock_until.into()),
            verified: false,
        };

        save_access_state(dir.path(), &state).unwrap();
        let loaded = load_access_state(dir.path()).unwrap();

        assert_eq!(loaded, state);
        assert!(matches!(
            loaded.phase(SystemTime::now().into()),
            AccessPhase::Locked { .. }
        ));
    }

    #[test]
    fn uses_the_fixed_key_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(ACCESS_STATE_FILE),
            r#"{"passwordErrorCount":2,"passwordLockTime":null,"diaryVerified":false}"#,
        )
        .unwrap();

        let state = load_access_state(dir.path()).unwrap();
        assert_eq!(state.failure_count, 2);
        assert_eq!(state.remaining_attempts(), 1);
    }

    #[test]
    fn corrupt_state_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ACCESS_STATE_FILE), "{ nope").unwrap();

        assert_eq!(load_access_state(dir.path()).unwrap(), AccessState::default());
    }

    #[test]
    fn store_credentials_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let credentials = StoreCredentials::new("https://abc.supabase.co", "anon");

        save_store_credentials(dir.path(), &credentials).unwrap();
        assert_eq!(
            load_store_credentials(dir.path()).unwrap(),
            Some(credentials)
        );

        clear_store_credentials(dir.path()).unwrap();
        assert_eq!(load_store_credentials(dir.path()).unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn files_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        save_access_state(dir.path(), &AccessState::default()).unwrap();

        let mode = std::fs::metadata(dir.path().join(ACCESS_STATE_FILE))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
