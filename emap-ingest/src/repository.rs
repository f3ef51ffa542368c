//! Persistence collaborator traits
//!
//! The SQLite implementations live in [`crate::db`]. Implementations must
//! serialize writes per (date, time) key, and a write never moves a stored
//! incident backwards: a CLOSED incident stays CLOSED with its duration, and
//! stored coordinates are never cleared.

use crate::error::PersistenceError;
use crate::models::{Incident, ResourceAssignment};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

/// Incident storage keyed by (date, time)
#[async_trait]
pub trait IncidentRepository: Send + Sync {
    async fn find_by_date_time(
        &self,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Option<Incident>, PersistenceError>;

    /// Create or update; returns the incident as stored, with its identity
    async fn save(&self, incident: Incident) -> Result<Incident, PersistenceError>;

    /// Store a new incident together with its dispatch list, all or nothing
    ///
    /// If the key is already stored (a concurrent pass got there first) the
    /// write merges into that row like [`save`](Self::save) and its dispatch
    /// list is kept.
    async fn create(
        &self,
        incident: Incident,
        resources: &[String],
    ) -> Result<Incident, PersistenceError>;

    /// All incidents of a calendar day, ordered by time
    async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<Incident>, PersistenceError>;
}

/// Resource assignment storage
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    /// Assignments of a saved incident, in dispatch order
    async fn find_by_incident(
        &self,
        incident: &Incident,
    ) -> Result<Vec<ResourceAssignment>, PersistenceError>;

    async fn attach(&self, incident: &Incident, resources: &[String]) -> Result<(), PersistenceError>;
}
