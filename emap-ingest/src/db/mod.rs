//! SQLite persistence for emap-ingest

pub mod incidents;
pub mod resources;
pub mod settings;

pub use incidents::SqliteIncidentRepository;
pub use resources::SqliteResourceRepository;

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use sqlx::SqlitePool;
use std::path::Path;

use crate::error::PersistenceError;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Open the database and make sure the ingest tables exist
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    let pool = emap_common::db::init_database_pool(db_path).await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Create settings, incidents, resources and incident_resources tables
pub async fn init_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // UNIQUE(date, time) backs the upsert that serializes writes per key
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS incidents (
            guid TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            time TEXT NOT NULL,
            incident_type TEXT NOT NULL,
            marker_icon TEXT NOT NULL DEFAULT 'DEFAULT',
            address TEXT NOT NULL,
            duration TEXT NOT NULL DEFAULT '',
            latitude REAL,
            longitude REAL,
            status TEXT NOT NULL CHECK (status IN ('OPEN', 'CLOSED')),
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (date, time)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS incident_resources (
            incident_id TEXT NOT NULL REFERENCES incidents(guid) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            resource_id INTEGER NOT NULL REFERENCES resources(id),
            PRIMARY KEY (incident_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (settings, incidents, resources, incident_resources)");

    Ok(())
}

pub(crate) fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn time_to_db(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub(crate) fn date_from_db(value: &str) -> Result<NaiveDate, PersistenceError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| PersistenceError::InvalidRow(format!("invalid date '{}': {}", value, e)))
}

pub(crate) fn time_from_db(value: &str) -> Result<NaiveTime, PersistenceError> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .map_err(|e| PersistenceError::InvalidRow(format!("invalid time '{}': {}", value, e)))
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = emap_common::db::in_memory_pool()
        .await
        .expect("Failed to create in-memory database");
    init_tables(&pool).await.expect("Failed to create tables");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_database_pool_creates_file_and_tables() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("emap.db");

        let pool = init_database_pool(&db_path).await.unwrap();
        assert!(db_path.exists());

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["incident_resources", "incidents", "resources", "settings"]);

        // Idempotent
        init_tables(&pool).await.unwrap();
    }

    #[test]
    fn test_key_formats_round_trip() {
        let date = NaiveDate::from_ymd_opt(2024, 8, 14).unwrap();
        let time = NaiveTime::from_hms_opt(22, 24, 4).unwrap();
        assert_eq!(date_to_db(date), "2024-08-14");
        assert_eq!(time_to_db(time), "22:24:04");
        assert_eq!(date_from_db("2024-08-14").unwrap(), date);
        assert_eq!(time_from_db("22:24:04").unwrap(), time);
        assert!(time_from_db("25:00").is_err());
    }
}
