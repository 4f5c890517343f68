//! Persisted session storage.
//!
//! The store is the single owner of the credential pair's storage slot.
//! Everything a login returns (both tokens plus the user attributes) is
//! written as one unit and cleared as one unit; nothing else in the crate
//! touches the file. A lone access token with no refresh token can only
//! arise from external interference and is treated as "needs refresh".

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Session file name inside the session directory
const SESSION_FILE: &str = "session.json";

/// User attributes returned by the login endpoint, persisted with the tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: i64,
    pub username: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub email: String,
}

/// The persisted unit: credential pair plus user attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionData {
    pub access: Option<String>,
    pub refresh: Option<String>,
    pub profile: Option<UserProfile>,
}

impl SessionData {
    fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none() && self.profile.is_none()
    }
}

pub struct SessionStore {
    dir: PathBuf,
    data: SessionData,
}

impl SessionStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            data: SessionData::default(),
        }
    }

    /// Load a previously persisted session from disk. Returns whether any
    /// session data was found. An unreadable file is an error; an absent
    /// file is just an empty store.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(false);
        }
        let contents =
            std::fs::read_to_string(&path).context("Failed to read session file")?;
        self.data =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(!self.data.is_empty())
    }

    fn save(&self) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Overwrite the whole session (login success). No merging.
    pub fn replace(&mut self, data: SessionData) -> Result<()> {
        self.data = data;
        self.save()
    }

    /// Store a fresh access token (refresh success).
    pub fn set_access(&mut self, access: String) -> Result<()> {
        self.data.access = Some(access);
        self.save()
    }

    /// Store a rotated refresh token.
    pub fn set_refresh(&mut self, refresh: String) -> Result<()> {
        self.data.refresh = Some(refresh);
        self.save()
    }

    /// Clear all session state, in memory and on disk.
    pub fn clear(&mut self) -> Result<()> {
        self.data = SessionData::default();
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn access_token(&self) -> Option<&str> {
        self.data.access.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.data.refresh.as_deref()
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.data.profile.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> SessionData {
        SessionData {
            access: Some("A1".into()),
            refresh: Some("R1".into()),
            profile: Some(UserProfile {
                user_id: 7,
                username: "alice".into(),
                is_staff: true,
                is_superuser: false,
                email: "alice@example.com".into(),
            }),
        }
    }

    #[test]
    fn replace_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SessionStore::new(dir.path().to_path_buf());
        store.replace(sample_data()).expect("replace");

        let mut reloaded = SessionStore::new(dir.path().to_path_buf());
        assert!(reloaded.load().expect("load"));
        assert_eq!(reloaded.access_token(), Some("A1"));
        assert_eq!(reloaded.refresh_token(), Some("R1"));
        assert_eq!(reloaded.profile().map(|p| p.username.as_str()), Some("alice"));
    }

    #[test]
    fn clear_removes_file_and_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SessionStore::new(dir.path().to_path_buf());
        store.replace(sample_data()).expect("replace");
        store.clear().expect("clear");

        assert!(store.is_empty());
        assert!(!dir.path().join(SESSION_FILE).exists());

        let mut reloaded = SessionStore::new(dir.path().to_path_buf());
        assert!(!reloaded.load().expect("load"));
    }

    #[test]
    fn load_with_no_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SessionStore::new(dir.path().to_path_buf());
        assert!(!store.load().expect("load"));
        assert!(store.is_empty());
    }

    #[test]
    fn rotation_only_touches_refresh_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SessionStore::new(dir.path().to_path_buf());
        store.replace(sample_data()).expect("replace");
        store.set_refresh("R2".into()).expect("set_refresh");

        assert_eq!(store.access_token(), Some("A1"));
        assert_eq!(store.refresh_token(), Some("R2"));
    }
}
