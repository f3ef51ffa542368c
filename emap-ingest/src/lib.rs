//! emap-ingest library interface
//!
//! Reconciles emergency-dispatch feed snapshots against persisted incident
//! state. Entry point: [`reconcile::ReconciliationEngine::reconcile`].

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod geocode;
pub mod models;
pub mod query;
pub mod reconcile;
pub mod repository;

pub use crate::error::{PersistenceError, ReconcileError, RecordError};
pub use crate::models::{Incident, IncidentCandidate, IncidentStatus, MarkerIcon, ResourceAssignment};
pub use crate::reconcile::{ReconcileOutcome, ReconciliationEngine};
