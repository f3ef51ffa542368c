//! Resource assignment database operations

use crate::error::PersistenceError;
use crate::models::{Incident, ResourceAssignment};
use crate::repository::ResourceRepository;
use async_trait::async_trait;
use sqlx::sqlite::SqliteConnection;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// SQLite-backed [`ResourceRepository`]
///
/// Resource names are deduplicated in `resources`; the per-incident
/// dispatch list (which may name the same unit type twice) lives in
/// `incident_resources` keyed by position.
#[derive(Clone)]
pub struct SqliteResourceRepository {
    pool: SqlitePool,
}

impl SqliteResourceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn saved_id(incident: &Incident) -> Result<Uuid, PersistenceError> {
    incident.id.ok_or(PersistenceError::Unsaved {
        date: incident.date,
        time: incident.time,
    })
}

#[async_trait]
impl ResourceRepository for SqliteResourceRepository {
    async fn find_by_incident(
        &self,
        incident: &Incident,
    ) -> Result<Vec<ResourceAssignment>, PersistenceError> {
        let incident_id = saved_id(incident)?;

        let rows = sqlx::query(
            r#"
            SELECT ir.position, r.name
            FROM incident_resources ir
            JOIN resources r ON r.id = ir.resource_id
            WHERE ir.incident_id = ?
            ORDER BY ir.position
            "#,
        )
        .bind(incident_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ResourceAssignment, PersistenceError> {
                let position: i64 = row.try_get("position")?;
                Ok(ResourceAssignment {
                    incident_id,
                    position: u32::try_from(position).map_err(|_| {
                        PersistenceError::InvalidRow(format!("invalid position {}", position))
                    })?,
                    resource: row.try_get("name")?,
                })
            })
            .collect()
    }

    /// Replace the incident's dispatch list in one transaction
    async fn attach(&self, incident: &Incident, resources: &[String]) -> Result<(), PersistenceError> {
        let incident_id = saved_id(incident)?;
        let mut tx = self.pool.begin().await?;
        replace_assignments(&mut tx, incident_id, resources).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Replace an incident's dispatch list on an open connection
///
/// Callers run this inside their own transaction.
pub(crate) async fn replace_assignments(
    conn: &mut SqliteConnection,
    incident_id: Uuid,
    resources: &[String],
) -> Result<(), PersistenceError> {
    let incident_id = incident_id.to_string();

    sqlx::query("DELETE FROM incident_resources WHERE incident_id = ?")
        .bind(&incident_id)
        .execute(&mut *conn)
        .await?;

    for (position, name) in resources.iter().enumerate() {
        sqlx::query("INSERT INTO resources (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .execute(&mut *conn)
            .await?;

        let resource_id: i64 = sqlx::query_scalar("SELECT id FROM resources WHERE name = ?")
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;

        sqlx::query(
            "INSERT INTO incident_resources (incident_id, position, resource_id) VALUES (?, ?, ?)",
        )
        .bind(&incident_id)
        .bind(position as i64)
        .bind(resource_id)
        .execute(&mut *conn)
        .await?;
    }

    tracing::debug!(
        incident_id = %incident_id,
        count = resources.len(),
        "Resources attached"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_pool, SqliteIncidentRepository};
    use crate::models::{IncidentStatus, MarkerIcon};
    use crate::repository::IncidentRepository;
    use chrono::{NaiveDate, NaiveTime};

    async fn saved_incident(pool: &SqlitePool) -> Incident {
        SqliteIncidentRepository::new(pool.clone())
            .save(Incident {
                id: None,
                date: NaiveDate::from_ymd_opt(2024, 8, 14).unwrap(),
                time: NaiveTime::from_hms_opt(22, 24, 4).unwrap(),
                incident_type: "Accidente de tráfico".to_string(),
                marker_icon: MarkerIcon::Traffic,
                address: "camino monzalbarba (Zaragoza)".to_string(),
                duration: "0 h 55 m".to_string(),
                latitude: None,
                longitude: None,
                status: IncidentStatus::Closed,
            })
            .await
            .unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_attach_preserves_order_and_duplicates() {
        let pool = test_pool().await;
        let incident = saved_incident(&pool).await;
        let repo = SqliteResourceRepository::new(pool);

        let dispatched = names(&[
            "Bomba pesada mixta",
            "Bomba nodriza pesada",
            "Bomba pesada mixta",
        ]);
        repo.attach(&incident, &dispatched).await.unwrap();

        let assignments = repo.find_by_incident(&incident).await.unwrap();
        let loaded: Vec<String> = assignments.iter().map(|a| a.resource.clone()).collect();
        assert_eq!(loaded, dispatched);
        assert!(assignments.iter().all(|a| Some(a.incident_id) == incident.id));
        assert_eq!(assignments[2].position, 2);

        // Names are shared across assignments
        let distinct: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resources")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(distinct, 2);
    }

    #[tokio::test]
    async fn test_attach_replaces_previous_list() {
        let pool = test_pool().await;
        let incident = saved_incident(&pool).await;
        let repo = SqliteResourceRepository::new(pool);

        repo.attach(&incident, &names(&["A", "B", "C"])).await.unwrap();
        repo.attach(&incident, &names(&["D"])).await.unwrap();

        let assignments = repo.find_by_incident(&incident).await.unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].resource, "D");
    }

    #[tokio::test]
    async fn test_unsaved_incident_is_rejected() {
        let pool = test_pool().await;
        let mut incident = saved_incident(&pool).await;
        incident.id = None;
        let repo = SqliteResourceRepository::new(pool);

        let err = repo.attach(&incident, &names(&["A"])).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Unsaved { .. }));
        assert!(repo.find_by_incident(&incident).await.is_err());
    }

    #[tokio::test]
    async fn test_incident_without_resources() {
        let pool = test_pool().await;
        let incident = saved_incident(&pool).await;
        let repo = SqliteResourceRepository::new(pool);

        repo.attach(&incident, &[]).await.unwrap();
        assert!(repo.find_by_incident(&incident).await.unwrap().is_empty());
    }
}
