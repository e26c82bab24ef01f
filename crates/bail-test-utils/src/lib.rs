//! Testing utilities for the bail workspace
//!
//! Shared fixtures and mutation builders.

#![allow(missing_docs)]

use bail_core::{MemoryStore, OrchestratorConfig, SessionOrchestrator};
use bail_render::Outline;
use bail_schema::{FieldPath, Schema};
use bail_state::MutationOp;
use serde_json::json;
use std::sync::Arc;

pub fn path(raw: &str) -> FieldPath {
    raw.parse().unwrap()
}

pub fn lease_schema() -> Schema {
    Schema::furnished_lease().unwrap()
}

pub fn lease_outline(schema: &Schema) -> Outline {
    Outline::furnished_lease(schema).unwrap()
}

pub fn set(raw: &str, value: impl Into<serde_json::Value>) -> MutationOp {
    MutationOp::set(path(raw), value)
}

pub fn append(group: &str) -> MutationOp {
    MutationOp::AppendListItem { group: path(group) }
}

pub fn remove(group: &str, index: usize) -> MutationOp {
    MutationOp::RemoveListItem {
        group: path(group),
        index,
    }
}

pub fn clear(raw: &str) -> MutationOp {
    MutationOp::Clear { path: path(raw) }
}

/// Orchestrator over the furnished-lease catalog with a fresh memory store
pub fn setup_orchestrator() -> (SessionOrchestrator, Arc<MemoryStore>) {
    setup_orchestrator_with(OrchestratorConfig::new())
}

pub fn setup_orchestrator_with(
    config: OrchestratorConfig,
) -> (SessionOrchestrator, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let schema = lease_schema();
    let outline = lease_outline(&schema);
    let orchestrator =
        SessionOrchestrator::new(Arc::new(schema), Arc::new(outline), store.clone(), config)
            .unwrap();
    (orchestrator, store)
}

/// The smallest batch that makes the lease complete
pub fn minimal_valid_batch() -> Vec<MutationOp> {
    vec![
        set(
            "designation_parties.bailleur.nom_prenom_ou_denomination",
            "Jean Dupont",
        ),
        set(
            "designation_parties.bailleur.adresse_siege_social",
            "12 rue des Lilas, 75011 Paris",
        ),
        append("designation_parties.locataires"),
        set("designation_parties.locataires[0].nom_prenom", "Claire Martin"),
        set("duree_contrat.date_prise_effet", "2025-09-01"),
        set("conditions_financieres.loyer.montant_hors_charges", json!(1500)),
        set("garanties.montant_depot_garantie", "3000"),
    ]
}
