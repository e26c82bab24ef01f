//! Session persistence contract
//!
//! The orchestrator only loads and saves whole records; durability is the
//! store's concern.

use crate::error::PersistenceError;
use crate::session::{SessionId, SessionRecord};
use dashmap::DashMap;

/// Load/save capability for session records
///
/// Implement this trait to plug a durable backend into the orchestrator.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Stored record of `id`, `None` if the session was never saved
    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, PersistenceError>;

    /// Replace the stored record of `record.id`
    async fn save(&self, record: &SessionRecord) -> Result<(), PersistenceError>;
}

/// Non-durable in-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<SessionId, SessionRecord>,
}

impl MemoryStore {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy of a stored record
    #[must_use]
    pub fn record(&self, id: &SessionId) -> Option<SessionRecord> {
        self.records.get(id).map(|r| r.value().clone())
    }

    /// Store a record directly, bypassing any orchestrator
    pub fn put(&self, record: SessionRecord) {
        self.records.insert(record.id.clone(), record);
    }
}

#[async_trait::async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, PersistenceError> {
        Ok(self.record(id))
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), PersistenceError> {
        self.put(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        let id: SessionId = "s1".parse().unwrap();
        assert!(store.load(&id).await.unwrap().is_none());

        let record = Session::new(id.clone()).to_record();
        store.save(&record).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), Some(record));
        assert_eq!(store.len(), 1);
    }
}
