//! Sessions and their persisted records

use crate::error::{OrchestratorError, PersistenceError};
use bail_schema::Schema;
use bail_state::{DocumentState, PersistedState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

const MAX_ID_LEN: usize = 128;

/// Conversation identifier
///
/// 1 to 128 characters of `[A-Za-z0-9_-]`, so that an id is always a safe
/// file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Fresh random id (UUIDv4)
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && s.len() <= MAX_ID_LEN
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(OrchestratorError::InvalidSessionId(s.to_string()))
        }
    }
}

impl TryFrom<String> for SessionId {
    type Error = OrchestratorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One conversation and the contract it is filling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    pub(crate) state: DocumentState,
    created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Session {
    /// Empty session created now
    #[must_use]
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            state: DocumentState::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    /// Version of the owned state
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.version()
    }

    #[inline]
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Snapshot for storage
    #[must_use]
    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            id: self.id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            state: self.state.to_persisted(),
        }
    }

    /// Rebuild a session from its record
    ///
    /// # Errors
    /// Returns [`PersistenceError::Corrupt`] if any record disagrees with
    /// `schema`
    pub fn from_record(schema: &Schema, record: &SessionRecord) -> Result<Self, PersistenceError> {
        let state = DocumentState::restore(schema, &record.state).map_err(|source| {
            PersistenceError::Corrupt {
                session: record.id.to_string(),
                source,
            }
        })?;
        Ok(Self {
            id: record.id.clone(),
            state,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// Stored form of a [`Session`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub state: PersistedState,
}
