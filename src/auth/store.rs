//! Where the session token lives between page loads.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{SiteError, SiteResult};

pub trait TokenStore: Send + Sync {
    fn load(&self) -> SiteResult<Option<String>>;

    fn save(&self, token: &str) -> SiteResult<()>;

    fn clear(&self) -> SiteResult<()>;
}

/// Process-lifetime store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> SiteResult<std::sync::MutexGuard<'_, Option<String>>> {
        self.token
            .lock()
            .map_err(|_| SiteError::Internal("token store lock poisoned".to_string()))
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> SiteResult<Option<String>> {
        Ok(self.slot()?.clone())
    }

    fn save(&self, token: &str) -> SiteResult<()> {
        *self.slot()? = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> SiteResult<()> {
        *self.slot()? = None;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    token: String,
}

/// JSON file holding `{"token": "..."}`.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `<data dir>/haile/session.json`, or the working directory when the
    /// platform has no data dir.
    pub fn default_location() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("haile").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> SiteResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                let session: SessionFile = serde_json::from_str(&raw)?;
                Ok(Some(session.token).filter(|t| !t.is_empty()))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, token: &str) -> SiteResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(&SessionFile {
            token: token.to_string(),
        })?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    fn clear(&self) -> SiteResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
