//! File-backed session store
//!
//! One pretty-printed JSON record per session under a data directory,
//! written to a temporary file and renamed into place.

use bail_core::{PersistenceError, SessionId, SessionRecord, SessionStore};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Directory of `<session>.json` records
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Record file of a session
    #[must_use]
    pub fn record_path(&self, id: &SessionId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    /// Ids of every stored session, sorted
    ///
    /// # Errors
    /// Returns error if the directory cannot be read
    pub async fn list(&self) -> Result<Vec<SessionId>, PersistenceError> {
        let mut ids = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Ok(id) = stem.parse() {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[async_trait::async_trait]
impl SessionStore for JsonDirStore {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, PersistenceError> {
        let bytes = match tokio::fs::read(self.record_path(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), PersistenceError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let target = self.record_path(&record.id);
        let staging = self.root.join(format!(".{}.json.tmp", record.id));
        let bytes = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, &target).await?;
        tracing::debug!(path = %target.display(), version = record.state.version, "record written");
        Ok(())
    }
}
