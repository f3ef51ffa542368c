//! Persistent incident entity and its resource assignments

use super::{IncidentCandidate, MarkerIcon};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Incident lifecycle status
///
/// Also used as the phase tag of a feed batch: an OPEN batch lists incidents
/// in progress, a CLOSED batch lists finished ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentStatus {
    Open,
    Closed,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Open => "OPEN",
            IncidentStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(IncidentStatus::Open),
            "CLOSED" => Ok(IncidentStatus::Closed),
            other => Err(format!("unknown incident status '{}'", other)),
        }
    }
}

/// Matching key correlating feed records with stored incidents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl MatchKey {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self { date, time }
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.time)
    }
}

/// Geographic point produced by enrichment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Persisted emergency incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Assigned by the repository on first save
    pub id: Option<Uuid>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub incident_type: String,
    pub marker_icon: MarkerIcon,
    pub address: String,
    /// Empty until the incident closes
    pub duration: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: IncidentStatus,
}

impl Incident {
    /// Build a not-yet-persisted incident from a feed record
    pub fn from_candidate(
        candidate: &IncidentCandidate,
        status: IncidentStatus,
        coordinates: Option<Coordinates>,
    ) -> Self {
        Self {
            id: None,
            date: candidate.date,
            time: candidate.time,
            incident_type: candidate.incident_type.clone(),
            marker_icon: MarkerIcon::classify(&candidate.incident_type),
            address: candidate.address.clone(),
            duration: candidate.duration.clone(),
            latitude: coordinates.map(|c| c.latitude),
            longitude: coordinates.map(|c| c.longitude),
            status,
        }
    }

    pub fn key(&self) -> MatchKey {
        MatchKey::new(self.date, self.time)
    }

    /// Both coordinates, if enrichment succeeded
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }

    /// Finalize the incident with its reported duration
    pub fn close(&mut self, duration: &str) {
        self.duration = duration.to_string();
        self.status = IncidentStatus::Closed;
    }
}

/// Resource dispatched to an incident
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAssignment {
    pub incident_id: Uuid,
    /// Zero-based position in the dispatch list
    pub position: u32,
    pub resource: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> IncidentCandidate {
        IncidentCandidate {
            index: 0,
            date: NaiveDate::from_ymd_opt(2024, 8, 14).unwrap(),
            time: NaiveTime::from_hms_opt(22, 24, 4).unwrap(),
            incident_type: "Incendio de vivienda".to_string(),
            address: "calle Mayor 1 (Zaragoza)".to_string(),
            duration: String::new(),
            resources: vec!["Bomba urbana ligera".to_string()],
        }
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("open".parse::<IncidentStatus>().unwrap(), IncidentStatus::Open);
        assert_eq!(" CLOSED ".parse::<IncidentStatus>().unwrap(), IncidentStatus::Closed);
        assert!("pending".parse::<IncidentStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&IncidentStatus::Closed).unwrap();
        assert_eq!(json, "\"CLOSED\"");
    }

    #[test]
    fn test_from_candidate_without_coordinates() {
        let incident = Incident::from_candidate(&candidate(), IncidentStatus::Open, None);

        assert!(incident.id.is_none());
        assert!(incident.coordinates().is_none());
        assert_eq!(incident.marker_icon, MarkerIcon::Fire);
        assert_eq!(incident.key(), candidate().key());
    }

    #[test]
    fn test_close_sets_duration_and_status() {
        let coords = Coordinates {
            latitude: 41.6,
            longitude: -0.9,
        };
        let mut incident = Incident::from_candidate(&candidate(), IncidentStatus::Open, Some(coords));
        incident.close("1 h 5 m");

        assert_eq!(incident.status, IncidentStatus::Closed);
        assert_eq!(incident.duration, "1 h 5 m");
        assert_eq!(incident.coordinates(), Some(coords));
    }
}
