//! At-rest session store
//!
//! One pretty-printed `JsonSession` document per session, grouped by
//! app under a root directory. Saves go through a temp file and an
//! atomic rename so a crash never leaves a half-written document.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use sg_api::{AppId, AppSessionId, JsonSession, SessionId};

const SESSION_EXTENSION: &str = "json";

/// Store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Directory-backed store of session documents
pub struct JsonSessionStore {
    root: PathBuf,
}

impl JsonSessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn session_path(&self, id: &AppSessionId) -> PathBuf {
        self.root
            .join(id.app_id.as_str())
            .join(format!("{}.{SESSION_EXTENSION}", id.session_id))
    }

    /// Persist one session document, replacing any previous version
    pub fn save(&self, id: &AppSessionId, doc: &JsonSession) -> Result<(), StoreError> {
        let path = self.session_path(id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(doc)?;
        let tmp = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        log::debug!("Saved session {id} at version {}", doc.version);
        Ok(())
    }

    /// Load one session document, `None` when it was never saved
    pub fn load(&self, id: &AppSessionId) -> Result<Option<JsonSession>, StoreError> {
        let path = self.session_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Load every session document under the root
    ///
    /// Unreadable entries are skipped with a warning rather than
    /// aborting the whole rehydration.
    pub fn load_all(&self) -> Result<HashMap<AppSessionId, JsonSession>, StoreError> {
        let mut sessions = HashMap::new();
        if !self.root.exists() {
            return Ok(sessions);
        }

        for app_entry in fs::read_dir(&self.root)? {
            let app_dir = app_entry?.path();
            if !app_dir.is_dir() {
                continue;
            }
            let Some(app_id) = app_dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let app_id = AppId::from(app_id);

            for session_entry in fs::read_dir(&app_dir)? {
                let path = session_entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some(SESSION_EXTENSION) {
                    continue;
                }
                let Some(session_id) = path.file_stem().and_then(|n| n.to_str()) else {
                    continue;
                };

                let id = AppSessionId::new(app_id.clone(), SessionId::from(session_id));
                match load_doc(&path) {
                    Ok(doc) => {
                        sessions.insert(id, doc);
                    }
                    Err(e) => {
                        log::warn!("Skipping unreadable session document {path:?}: {e}");
                    }
                }
            }
        }

        log::info!("Loaded {} session document(s) from {:?}", sessions.len(), self.root);
        Ok(sessions)
    }
}

fn load_doc(path: &Path) -> Result<JsonSession, StoreError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
