//! Incident database operations

use super::resources::replace_assignments;
use super::{date_from_db, date_to_db, time_from_db, time_to_db};
use crate::error::PersistenceError;
use crate::models::{Incident, IncidentStatus, MarkerIcon};
use crate::repository::IncidentRepository;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const SELECT_COLUMNS: &str = "guid, date, time, incident_type, marker_icon, address, duration, \
                              latitude, longitude, status";

/// SQLite-backed [`IncidentRepository`]
#[derive(Clone)]
pub struct SqliteIncidentRepository {
    pool: SqlitePool,
}

impl SqliteIncidentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IncidentRepository for SqliteIncidentRepository {
    async fn find_by_date_time(
        &self,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Option<Incident>, PersistenceError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM incidents WHERE date = ? AND time = ?",
            SELECT_COLUMNS
        ))
        .bind(date_to_db(date))
        .bind(time_to_db(time))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(incident_from_row).transpose()
    }

    async fn save(&self, incident: Incident) -> Result<Incident, PersistenceError> {
        let id = incident.id.unwrap_or_else(Uuid::new_v4);
        let mut conn = self.pool.acquire().await?;
        upsert(&mut conn, &incident, id).await
    }

    async fn create(
        &self,
        incident: Incident,
        resources: &[String],
    ) -> Result<Incident, PersistenceError> {
        let new_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        let stored = upsert(&mut tx, &incident, new_id).await?;
        if stored.id == Some(new_id) {
            replace_assignments(&mut tx, new_id, resources).await?;
        } else {
            tracing::debug!(
                key = %stored.key(),
                status = %stored.status,
                "Incident already stored; keeping its dispatch list"
            );
        }

        tx.commit().await?;
        Ok(stored)
    }

    async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<Incident>, PersistenceError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM incidents WHERE date = ? ORDER BY time",
            SELECT_COLUMNS
        ))
        .bind(date_to_db(date))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(incident_from_row).collect()
    }
}

/// Insert or merge one incident keyed on (date, time)
///
/// A new row gets `id`; an existing row keeps its identity. The merge never
/// reopens a CLOSED row, never changes a CLOSED row's duration and never
/// replaces stored coordinates with unset ones. Returns the row as stored.
async fn upsert(
    conn: &mut SqliteConnection,
    incident: &Incident,
    id: Uuid,
) -> Result<Incident, PersistenceError> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO incidents (
            guid, date, time, incident_type, marker_icon, address, duration,
            latitude, longitude, status, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(date, time) DO UPDATE SET
            incident_type = excluded.incident_type,
            marker_icon = excluded.marker_icon,
            address = excluded.address,
            duration = CASE WHEN incidents.status = 'CLOSED'
                THEN incidents.duration ELSE excluded.duration END,
            latitude = CASE WHEN excluded.latitude IS NULL OR excluded.longitude IS NULL
                THEN incidents.latitude ELSE excluded.latitude END,
            longitude = CASE WHEN excluded.latitude IS NULL OR excluded.longitude IS NULL
                THEN incidents.longitude ELSE excluded.longitude END,
            status = CASE WHEN incidents.status = 'CLOSED'
                THEN incidents.status ELSE excluded.status END,
            updated_at = CURRENT_TIMESTAMP
        RETURNING {}
        "#,
        SELECT_COLUMNS
    ))
    .bind(id.to_string())
    .bind(date_to_db(incident.date))
    .bind(time_to_db(incident.time))
    .bind(&incident.incident_type)
    .bind(incident.marker_icon.as_str())
    .bind(&incident.address)
    .bind(&incident.duration)
    .bind(incident.latitude)
    .bind(incident.longitude)
    .bind(incident.status.as_str())
    .fetch_one(&mut *conn)
    .await?;

    let stored = incident_from_row(&row)?;
    tracing::debug!(
        id = ?stored.id,
        key = %stored.key(),
        status = %stored.status,
        "Incident saved"
    );
    Ok(stored)
}

fn parse_guid(value: &str) -> Result<Uuid, PersistenceError> {
    Uuid::parse_str(value)
        .map_err(|e| PersistenceError::InvalidRow(format!("invalid guid '{}': {}", value, e)))
}

fn incident_from_row(row: &SqliteRow) -> Result<Incident, PersistenceError> {
    let guid: String = row.try_get("guid")?;
    let date: String = row.try_get("date")?;
    let time: String = row.try_get("time")?;
    let marker_icon: String = row.try_get("marker_icon")?;
    let status: String = row.try_get("status")?;

    Ok(Incident {
        id: Some(parse_guid(&guid)?),
        date: date_from_db(&date)?,
        time: time_from_db(&time)?,
        incident_type: row.try_get("incident_type")?,
        // Unknown icons from older rows fall back to the default pictogram
        marker_icon: marker_icon.parse::<MarkerIcon>().unwrap_or_default(),
        address: row.try_get("address")?,
        duration: row.try_get("duration")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        status: status
            .parse::<IncidentStatus>()
            .map_err(PersistenceError::InvalidRow)?,
    })
}
