//! Reconciliation engine
//!
//! Folds one feed batch into the incident store, record by record, in feed
//! order. Per record:
//! 1. Look up the stored incident by (date, time)
//! 2. Decide the [`Transition`]
//! 3. CREATE: geocode, then store incident and resources atomically
//! 4. CLOSE: save duration + status, resources untouched
//! 5. RETAIN: no writes at all
//!
//! Failures are isolated per record: only a document that cannot be read
//! at all aborts the pass.

use super::transition::{RetainReason, Transition};
use crate::error::{ReconcileError, RecordError};
use crate::feed::FeedParser;
use crate::geocode::{GeocodeClient, GeocodeEnricher};
use crate::models::{Incident, IncidentCandidate, IncidentStatus};
use crate::repository::IncidentRepository;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Per-pass transition counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub created: usize,
    pub closed: usize,
    pub unchanged: usize,
}

/// Result of one reconciliation pass
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    /// Incidents reconciled, in feed order
    pub incidents: Vec<Incident>,
    /// Recoverable per-record errors, in feed order
    pub errors: Vec<RecordError>,
    pub stats: ReconcileStats,
}

impl ReconcileOutcome {
    /// Whether any record lost its effects (geocode misses excluded)
    pub fn has_failures(&self) -> bool {
        self.errors.iter().any(|e| !e.is_degraded_only())
    }
}

/// Feed batch → incident store reconciler
pub struct ReconciliationEngine {
    parser: FeedParser,
    enricher: GeocodeEnricher,
    incidents: Arc<dyn IncidentRepository>,
}

impl ReconciliationEngine {
    pub fn new(geocoder: Arc<dyn GeocodeClient>, incidents: Arc<dyn IncidentRepository>) -> Self {
        Self {
            parser: FeedParser::new(),
            enricher: GeocodeEnricher::new(geocoder),
            incidents,
        }
    }

    /// Reconcile one raw feed document
    ///
    /// `phase` is the status the whole batch represents. Returns
    /// `MalformedFeed` only when the document structure is unreadable.
    pub async fn reconcile(
        &self,
        raw: &[u8],
        phase: IncidentStatus,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let feed = self.parser.parse(raw)?;
        info!(phase = %phase, records = feed.len(), "Starting reconciliation pass");

        let mut outcome = ReconcileOutcome::default();

        for parsed in feed.candidates() {
            let candidate = match parsed {
                Ok(candidate) => candidate,
                Err(e) => {
                    outcome.errors.push(e);
                    continue;
                }
            };

            match self.reconcile_candidate(&candidate, phase, &mut outcome).await {
                Ok(incident) => outcome.incidents.push(incident),
                Err(e) => {
                    error!(index = candidate.index, key = %candidate.key(), error = %e, "Record not reconciled");
                    outcome.errors.push(e);
                }
            }
        }

        info!(
            phase = %phase,
            reconciled = outcome.incidents.len(),
            created = outcome.stats.created,
            closed = outcome.stats.closed,
            unchanged = outcome.stats.unchanged,
            errors = outcome.errors.len(),
            "Reconciliation pass complete"
        );

        Ok(outcome)
    }

    async fn reconcile_candidate(
        &self,
        candidate: &IncidentCandidate,
        phase: IncidentStatus,
        outcome: &mut ReconcileOutcome,
    ) -> Result<Incident, RecordError> {
        let existing = self
            .incidents
            .find_by_date_time(candidate.date, candidate.time)
            .await
            .map_err(|source| persistence(candidate, source))?;

        let transition = Transition::decide(existing, phase);
        debug!(
            index = candidate.index,
            key = %candidate.key(),
            transition = transition.label(),
            "Transition decided"
        );

        match transition {
            Transition::Create => {
                let incident = self.create(candidate, phase, &mut outcome.errors).await?;
                outcome.stats.created += 1;
                Ok(incident)
            }
            Transition::Close(mut incident) => {
                incident.close(&candidate.duration);
                let incident = self
                    .incidents
                    .save(incident)
                    .await
                    .map_err(|source| persistence(candidate, source))?;
                outcome.stats.closed += 1;
                Ok(incident)
            }
            Transition::Retain(incident, reason) => {
                if reason == RetainReason::AlreadyClosed && phase == IncidentStatus::Open {
                    debug!(key = %incident.key(), "Closed incident listed in an OPEN batch; ignoring");
                }
                outcome.stats.unchanged += 1;
                Ok(incident)
            }
        }
    }

    async fn create(
        &self,
        candidate: &IncidentCandidate,
        phase: IncidentStatus,
        errors: &mut Vec<RecordError>,
    ) -> Result<Incident, RecordError> {
        let (coordinates, miss) = match self.enricher.enrich(&candidate.address).await {
            Ok(coordinates) => (Some(coordinates), None),
            Err(miss) => (None, Some(miss)),
        };

        let incident = Incident::from_candidate(candidate, phase, coordinates);
        let incident = self
            .incidents
            .create(incident, &candidate.resources)
            .await
            .map_err(|source| persistence(candidate, source))?;

        if incident.status != phase {
            debug!(key = %incident.key(), status = %incident.status, "Key was stored concurrently");
        }

        // Only reported for records that were actually stored
        if let Some(miss) = miss {
            errors.push(RecordError::GeocodeUnavailable {
                index: candidate.index,
                address: candidate.address.clone(),
                reason: miss.to_string(),
            });
        }

        Ok(incident)
    }
}

fn persistence(candidate: &IncidentCandidate, source: crate::error::PersistenceError) -> RecordError {
    RecordError::Persistence {
        index: candidate.index,
        date: candidate.date,
        time: candidate.time,
        source,
    }
}
