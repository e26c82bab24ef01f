//! Session orchestrator
//!
//! Owns the live sessions, serializes mutations per session, persists
//! snapshots and serves renders through the version-keyed cache.
//!
//! Locking: each session has a `parking_lot` mutation lock that is never
//! held across an `.await`, and a `tokio` save lock that orders snapshots
//! so an older one never overwrites a newer one.

use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, PersistenceError};
use crate::report::{BatchReport, OpResult};
use crate::session::{Session, SessionId, SessionRecord};
use crate::store::SessionStore;
use bail_render::{
    Outline, ProgressReport, RenderCache, RenderKey, RenderResult, SectionDetails,
};
use bail_schema::{FieldPath, Schema, Value};
use bail_state::MutationOp;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

struct SessionSlot {
    session: parking_lot::Mutex<Session>,
    /// Version of the last snapshot written to the store
    saved: tokio::sync::Mutex<Option<u64>>,
}

impl SessionSlot {
    fn new(session: Session, saved: Option<u64>) -> Self {
        Self {
            session: parking_lot::Mutex::new(session),
            saved: tokio::sync::Mutex::new(saved),
        }
    }

    fn snapshot(&self) -> Session {
        self.session.lock().clone()
    }
}

/// Entry point for agents and preview surfaces
pub struct SessionOrchestrator {
    schema: Arc<Schema>,
    outline: Arc<Outline>,
    store: Arc<dyn SessionStore>,
    sessions: DashMap<SessionId, Arc<SessionSlot>>,
    cache: RenderCache,
    config: OrchestratorConfig,
}

impl SessionOrchestrator {
    /// Create an orchestrator over a compiled schema and outline
    ///
    /// # Errors
    /// Returns [`OrchestratorError::Render`] if the outline was compiled
    /// against another schema
    pub fn new(
        schema: Arc<Schema>,
        outline: Arc<Outline>,
        store: Arc<dyn SessionStore>,
        config: OrchestratorConfig,
    ) -> Result<Self, OrchestratorError> {
        outline.check(&schema)?;
        let cache = match config.render_cache_ttl() {
            Some(ttl) => RenderCache::with_ttl(config.render_cache_capacity, ttl),
            None => RenderCache::new(config.render_cache_capacity),
        };
        info!(
            schema = schema.name(),
            fingerprint = %schema.fingerprint().short(),
            "orchestrator ready"
        );
        Ok(Self {
            schema,
            outline,
            store,
            sessions: DashMap::new(),
            cache,
            config,
        })
    }

    /// Orchestrator for the embedded furnished-lease schema and outline
    ///
    /// # Errors
    /// Returns error if the embedded declarations fail to load
    pub fn furnished_lease(
        store: Arc<dyn SessionStore>,
        config: OrchestratorConfig,
    ) -> Result<Self, OrchestratorError> {
        let schema = Schema::furnished_lease()?;
        let outline = Outline::furnished_lease(&schema)?;
        Self::new(Arc::new(schema), Arc::new(outline), store, config)
    }

    #[inline]
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[inline]
    #[must_use]
    pub fn outline(&self) -> &Arc<Outline> {
        &self.outline
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn render_cache(&self) -> &RenderCache {
        &self.cache
    }

    /// Load a session, or create and save an empty one
    ///
    /// # Errors
    /// Returns [`OrchestratorError::Persistence`] if the store fails or the
    /// stored record is corrupt
    #[instrument(skip_all, fields(session = %id))]
    pub async fn get_or_create(&self, id: &SessionId) -> Result<Session, OrchestratorError> {
        Ok(self.slot(id).await?.snapshot())
    }

    /// Apply operations in order under the session lock
    ///
    /// Each operation succeeds or fails on its own; earlier successes are
    /// kept when a later operation fails. The resulting snapshot is saved
    /// once the lock is released.
    ///
    /// # Errors
    /// - [`OrchestratorError::BatchTooLarge`] before any operation runs
    /// - [`OrchestratorError::PersistFailed`] if the save fails; the report
    ///   of the in-memory batch travels with the error
    #[instrument(skip_all, fields(session = %id, ops = ops.len()))]
    pub async fn apply_mutation_batch(
        &self,
        id: &SessionId,
        ops: &[MutationOp],
    ) -> Result<BatchReport, OrchestratorError> {
        if ops.len() > self.config.max_batch_ops {
            return Err(OrchestratorError::BatchTooLarge {
                size: ops.len(),
                max: self.config.max_batch_ops,
            });
        }
        let slot = self.slot(id).await?;

        let (report, record) = {
            let mut session = slot.session.lock();
            let mut results = Vec::with_capacity(ops.len());
            for (index, op) in ops.iter().enumerate() {
                let target = op.target().clone();
                match op.apply(&mut session.state, &self.schema) {
                    Ok(outcome) => {
                        debug!(index, op = op.name(), %target, "applied");
                        results.push(OpResult::applied(index, op.name(), target, outcome));
                    }
                    Err(error) => {
                        warn!(index, op = op.name(), %target, %error, "rejected");
                        results.push(OpResult::rejected(index, op.name(), target, &error));
                    }
                }
            }
            let report = BatchReport {
                session: id.clone(),
                version: session.version(),
                results,
            };
            let record = (report.applied_count() > 0).then(|| {
                session.updated_at = Utc::now();
                session.to_record()
            });
            (report, record)
        };

        if let Some(record) = record {
            if let Err(source) = self.persist(&slot, &record).await {
                warn!(error = %source, version = report.version, "snapshot not saved");
                return Err(OrchestratorError::PersistFailed {
                    source,
                    report: Box::new(report),
                });
            }
        }
        info!(
            version = report.version,
            applied = report.applied_count(),
            rejected = report.results.len() - report.applied_count(),
            "batch done"
        );
        Ok(report)
    }

    /// Render of the session's current state
    ///
    /// Computed once per (session, version, schema) and shared.
    ///
    /// # Errors
    /// Returns [`OrchestratorError::Render`] on outline drift
    #[instrument(skip_all, fields(session = %id))]
    pub async fn current_render(
        &self,
        id: &SessionId,
    ) -> Result<Arc<RenderResult>, OrchestratorError> {
        let session = self.slot(id).await?.snapshot();
        let key = RenderKey::new(id.as_str(), session.version(), self.schema.fingerprint());
        let (state, schema, outline) = (session.state(), &*self.schema, &*self.outline);
        let result = self
            .cache
            .try_get_or_insert_with(key, || async move {
                bail_render::render(state, schema, outline)
            })
            .await?;
        Ok(result)
    }

    /// Current value at a concrete path, `None` when unset
    ///
    /// # Errors
    /// Returns [`OrchestratorError::Schema`] if the path is undeclared
    pub async fn get(
        &self,
        id: &SessionId,
        path: &FieldPath,
    ) -> Result<Option<Value>, OrchestratorError> {
        self.schema.resolve(path)?;
        let slot = self.slot(id).await?;
        let session = slot.session.lock();
        Ok(session.state().get(path).cloned())
    }

    /// Completion figures per section
    ///
    /// # Errors
    /// Returns [`OrchestratorError::Persistence`] if the session cannot be loaded
    pub async fn progress(&self, id: &SessionId) -> Result<ProgressReport, OrchestratorError> {
        let slot = self.slot(id).await?;
        let session = slot.session.lock();
        Ok(bail_render::progress(session.state(), &self.schema))
    }

    /// Every field of one section with its value and flags
    ///
    /// # Errors
    /// Returns [`OrchestratorError::UnknownSection`] for an undeclared section
    pub async fn section_details(
        &self,
        id: &SessionId,
        section: &str,
    ) -> Result<SectionDetails, OrchestratorError> {
        let slot = self.slot(id).await?;
        let session = slot.session.lock();
        bail_render::section_details(session.state(), &self.schema, section)
            .ok_or_else(|| OrchestratorError::UnknownSection(section.to_string()))
    }

    /// Number of sessions held in memory
    #[inline]
    #[must_use]
    pub fn live_sessions(&self) -> usize {
        self.sessions.len()
    }

    async fn slot(&self, id: &SessionId) -> Result<Arc<SessionSlot>, OrchestratorError> {
        if let Some(slot) = self.sessions.get(id) {
            return Ok(Arc::clone(slot.value()));
        }

        let loaded = self.store.load(id).await?;
        let (candidate, fresh) = match loaded {
            Some(record) => {
                if record.id != *id {
                    return Err(PersistenceError::Misfiled {
                        requested: id.to_string(),
                        found: record.id.to_string(),
                    }
                    .into());
                }
                let session = Session::from_record(&self.schema, &record)?;
                let version = session.version();
                (Arc::new(SessionSlot::new(session, Some(version))), false)
            }
            None => (Arc::new(SessionSlot::new(Session::new(id.clone()), None)), true),
        };

        // A concurrent caller may have won the race; keep its slot.
        let slot = Arc::clone(
            self.sessions
                .entry(id.clone())
                .or_insert_with(|| Arc::clone(&candidate))
                .value(),
        );
        if fresh && Arc::ptr_eq(&slot, &candidate) {
            let record = slot.snapshot().to_record();
            self.persist(&slot, &record).await?;
            info!(session = %id, "session created");
        }
        Ok(slot)
    }

    async fn persist(
        &self,
        slot: &SessionSlot,
        record: &SessionRecord,
    ) -> Result<(), PersistenceError> {
        let mut saved = slot.saved.lock().await;
        let version = record.state.version;
        if saved.is_some_and(|last| last >= version) {
            debug!(version, "newer snapshot already saved");
            return Ok(());
        }
        self.store.save(record).await?;
        *saved = Some(version);
        debug!(version, "snapshot saved");
        Ok(())
    }
}

impl std::fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOrchestrator")
            .field("schema", &self.schema.name())
            .field("sessions", &self.sessions.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
