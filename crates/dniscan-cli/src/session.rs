//! Logged-in user, persisted as a small JSON file between invocations.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use dniscan_core::User;
use tracing::info;

pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `~/.dniscan/session.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".dniscan").join("session.json"))
    }

    /// The stored user, or `None` when nobody is logged in.
    pub fn load(&self) -> Result<Option<User>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading session file {}", self.path.display()))?;
        let user = serde_json::from_str(&text)
            .with_context(|| format!("corrupt session file {}", self.path.display()))?;
        Ok(Some(user))
    }

    pub fn save(&self, user: &User) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(user)?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing session file {}", self.path.display()))?;
        info!(user = %user.username, path = %self.path.display(), "session saved");
        Ok(())
    }

    /// Remove the session. Returns whether one existed.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)
            .with_context(|| format!("removing session file {}", self.path.display()))?;
        Ok(true)
    }

    /// The logged-in user, or an error telling the operator to log in.
    pub fn require(&self) -> Result<User> {
        self.load()?
            .context("not logged in; run `dniscan login <username>` first")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            username: "recepcion".into(),
        }
    }

    #[test]
    fn save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionFile::new(dir.path().join("nested").join("session.json"));

        assert_eq!(session.load().unwrap(), None);
        session.save(&user()).unwrap();
        assert_eq!(session.load().unwrap(), Some(user()));
        assert!(session.clear().unwrap());
        assert!(!session.clear().unwrap());
        assert_eq!(session.load().unwrap(), None);
    }

    #[test]
    fn require_without_login_errors() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionFile::new(dir.path().join("session.json"));
        let err = session.require().unwrap_err();
        assert!(err.to_string().contains("not logged in"));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        let err = SessionFile::new(path).load().unwrap_err();
        assert!(err.to_string().contains("corrupt session file"));
    }
}
