//! Bail Core - Session Orchestrator
//!
//! Binds schema, document state and renderer into conversation sessions:
//! - Loads or creates a session on first interaction
//! - Applies agent mutation batches under a per-session lock
//! - Persists snapshots through a pluggable [`SessionStore`]
//! - Serves renders from a version-keyed cache
//!
//! # Example
//!
//! ```rust,ignore
//! use bail_core::{MemoryStore, OrchestratorConfig, SessionId, SessionOrchestrator};
//! use bail_state::MutationOp;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let orchestrator = SessionOrchestrator::furnished_lease(store, OrchestratorConfig::new())?;
//! let id = SessionId::generate();
//!
//! let ops = vec![MutationOp::set("garanties.montant_depot_garantie".parse()?, "1500")];
//! let report = orchestrator.apply_mutation_batch(&id, &ops).await?;
//! let render = orchestrator.current_render(&id).await?;
//! println!("v{} complete={}", report.version, render.complete);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod error;
mod orchestrator;
mod report;
mod session;
mod store;

pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, PersistenceError};
pub use orchestrator::SessionOrchestrator;
pub use report::{BatchReport, OpResult, OpStatus};
pub use session::{Session, SessionId, SessionRecord};
pub use store::{MemoryStore, SessionStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
