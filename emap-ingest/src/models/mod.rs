//! Domain types for incident reconciliation

mod candidate;
mod incident;
mod marker;

pub use candidate::IncidentCandidate;
pub use incident::{Coordinates, Incident, IncidentStatus, MatchKey, ResourceAssignment};
pub use marker::MarkerIcon;
