//! Error types for emap-ingest
//!
//! Only [`ReconcileError`] aborts a reconciliation pass. Everything else is
//! scoped to one feed record and collected into the pass outcome.

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

/// Fatal error for a whole reconciliation pass
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The feed document cannot be interpreted at all
    #[error("Malformed feed: {0}")]
    MalformedFeed(String),
}

/// Persistence collaborator failure
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Database operation error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored row could not be decoded into a domain value
    #[error("Invalid stored row: {0}")]
    InvalidRow(String),

    /// Operation requires an incident that has been saved at least once
    #[error("Incident {date} {time} has no identity yet")]
    Unsaved { date: NaiveDate, time: NaiveTime },
}

/// Recoverable error scoped to a single feed record
///
/// `index` is the record's position in the feed `result` array.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Record skipped: required field missing or unparseable
    #[error("Record #{index} malformed: {reason}")]
    MalformedRecord { index: usize, reason: String },

    /// Incident kept, but without coordinates
    #[error("Record #{index} geocode unavailable for '{address}': {reason}")]
    GeocodeUnavailable {
        index: usize,
        address: String,
        reason: String,
    },

    /// Lookup or write failed; the record's effects were skipped
    #[error("Record #{index} ({date} {time}) persistence failed: {source}")]
    Persistence {
        index: usize,
        date: NaiveDate,
        time: NaiveTime,
        #[source]
        source: PersistenceError,
    },
}

impl RecordError {
    /// Position of the offending record in the feed
    pub fn index(&self) -> usize {
        match self {
            RecordError::MalformedRecord { index, .. }
            | RecordError::GeocodeUnavailable { index, .. }
            | RecordError::Persistence { index, .. } => *index,
        }
    }

    /// Whether the record still produced an incident
    pub fn is_degraded_only(&self) -> bool {
        matches!(self, RecordError::GeocodeUnavailable { .. })
    }
}
