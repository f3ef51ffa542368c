//! Feed record ready for reconciliation

use super::MatchKey;
use chrono::{NaiveDate, NaiveTime};

/// One parsed feed record
///
/// Created fresh on every parse and discarded after reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentCandidate {
    /// Position in the feed `result` array
    pub index: usize,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub incident_type: String,
    pub address: String,
    /// Empty while the incident is still in progress
    pub duration: String,
    /// Dispatched resource names, in feed order
    pub resources: Vec<String>,
}

impl IncidentCandidate {
    pub fn key(&self) -> MatchKey {
        MatchKey::new(self.date, self.time)
    }
}
