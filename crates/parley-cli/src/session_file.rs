//! Persisted identity between runs

use parley_sync::PersistedSession;
use std::fs;
use std::path::{Path, PathBuf};

/// JSON file holding the last user id and conversation id
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    /// Get the default session file path
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("parley")
            .join("session.json")
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored session. A missing or corrupt file yields an empty one.
    pub fn load(&self) -> PersistedSession {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return PersistedSession::default();
            }
            Err(e) => {
                tracing::warn!("Failed to read session file {}: {}", self.path.display(), e);
                return PersistedSession::default();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Ignoring corrupt session file {}: {}", self.path.display(), e);
            PersistedSession::default()
        })
    }

    pub fn save(&self, session: &PersistedSession) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file() -> (PathBuf, SessionFile) {
        let dir = std::env::temp_dir().join(format!("parley-session-{}", uuid::Uuid::new_v4()));
        let file = SessionFile::new(dir.join("session.json"));
        (dir, file)
    }

    #[test]
    fn test_missing_file_is_empty_session() {
        let (_dir, file) = temp_file();
        assert_eq!(file.load(), PersistedSession::default());
    }

    #[test]
    fn test_save_then_load() {
        let (dir, file) = temp_file();
        let session = PersistedSession {
            user_id: Some("u1".into()),
            conversation_id: Some("c1".into()),
        };
        file.save(&session).unwrap();
        assert_eq!(file.load(), session);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let (dir, file) = temp_file();
        fs::create_dir_all(&dir).unwrap();
        fs::write(file.path(), "not json").unwrap();
        assert_eq!(file.load(), PersistedSession::default());
        fs::remove_dir_all(dir).unwrap();
    }
}
