//! Read side for the map client
//!
//! Joins a day's incidents with their dispatch lists.

use crate::error::PersistenceError;
use crate::models::{Incident, IncidentStatus, MarkerIcon};
use crate::repository::{IncidentRepository, ResourceRepository};
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Incident as shown on the map, with its resource names
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentView {
    pub id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: IncidentStatus,
    pub incident_type: String,
    pub marker_icon: MarkerIcon,
    pub address: String,
    pub duration: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub resources: Vec<String>,
}

impl IncidentView {
    fn new(id: Uuid, incident: Incident, resources: Vec<String>) -> Self {
        Self {
            id,
            date: incident.date,
            time: incident.time,
            status: incident.status,
            incident_type: incident.incident_type,
            marker_icon: incident.marker_icon,
            address: incident.address,
            duration: incident.duration,
            latitude: incident.latitude,
            longitude: incident.longitude,
            resources,
        }
    }
}

pub struct IncidentQuery {
    incidents: Arc<dyn IncidentRepository>,
    resources: Arc<dyn ResourceRepository>,
}

impl IncidentQuery {
    pub fn new(
        incidents: Arc<dyn IncidentRepository>,
        resources: Arc<dyn ResourceRepository>,
    ) -> Self {
        Self {
            incidents,
            resources,
        }
    }

    /// Incidents of `date`, ordered by time
    pub async fn incidents_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<IncidentView>, PersistenceError> {
        let incidents = self.incidents.find_by_date(date).await?;
        let mut views = Vec::with_capacity(incidents.len());

        for incident in incidents {
            let id = incident.id.ok_or(PersistenceError::Unsaved {
                date: incident.date,
                time: incident.time,
            })?;
            let resources = self
                .resources
                .find_by_incident(&incident)
                .await?
                .into_iter()
                .map(|a| a.resource)
                .collect();
            views.push(IncidentView::new(id, incident, resources));
        }

        Ok(views)
    }
}
