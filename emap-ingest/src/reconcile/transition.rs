//! Create / close / retain decision for one feed record

use crate::models::{Incident, IncidentStatus};

/// Why a matched incident is left untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetainReason {
    /// OPEN incident seen again in an OPEN batch
    StillOpen,
    /// Finalized incidents are never reopened or re-enriched
    AlreadyClosed,
}

/// Action to take for one candidate
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// No stored incident for the key
    Create,
    /// Stored OPEN incident reported by a CLOSED batch
    Close(Incident),
    /// Stored incident kept as is; no writes
    Retain(Incident, RetainReason),
}

impl Transition {
    /// Decide from the lookup result and the batch phase
    pub fn decide(existing: Option<Incident>, phase: IncidentStatus) -> Self {
        let Some(incident) = existing else {
            return Transition::Create;
        };

        match (incident.status, phase) {
            (IncidentStatus::Open, IncidentStatus::Closed) => Transition::Close(incident),
            (IncidentStatus::Open, IncidentStatus::Open) => {
                Transition::Retain(incident, RetainReason::StillOpen)
            }
            (IncidentStatus::Closed, _) => Transition::Retain(incident, RetainReason::AlreadyClosed),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Transition::Create => "create",
            Transition::Close(_) => "close",
            Transition::Retain(_, RetainReason::StillOpen) => "retain-open",
            Transition::Retain(_, RetainReason::AlreadyClosed) => "retain-closed",
        }
    }
}
