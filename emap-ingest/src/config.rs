//! Configuration resolution for emap-ingest
//!
//! The geocoding API key is resolved with Database → ENV → TOML priority.
//! Unlike the other settings, a missing key is not fatal: requests go out
//! without one, the provider rejects them, and enrichment degrades to
//! "no coordinates".

use emap_common::config::TomlConfig;
use emap_common::Result;
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};

/// Environment variable holding the geocoding API key
pub const GEOCODE_API_KEY_ENV: &str = "EMAP_GEOCODE_API_KEY";

/// Resolve the geocoding API key from the three configuration tiers
pub async fn resolve_geocode_api_key(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<Option<String>> {
    let db_key = crate::db::settings::get_geocode_api_key(db)
        .await?
        .filter(|k| is_valid_key(k));
    let env_key = std::env::var(GEOCODE_API_KEY_ENV)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .geocode
        .api_key
        .clone()
        .filter(|k| is_valid_key(k));

    Ok(pick_key(db_key, env_key, toml_key))
}

fn pick_key(
    db_key: Option<String>,
    env_key: Option<String>,
    toml_key: Option<String>,
) -> Option<String> {
    let sources: Vec<&str> = [
        db_key.as_ref().map(|_| "database"),
        env_key.as_ref().map(|_| "environment"),
        toml_key.as_ref().map(|_| "TOML"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if sources.len() > 1 {
        warn!(
            "Geocode API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(key) = db_key {
        info!("Geocode API key loaded from database");
        return Some(key);
    }
    if let Some(key) = env_key {
        info!("Geocode API key loaded from environment variable");
        return Some(key);
    }
    if let Some(key) = toml_key {
        info!("Geocode API key loaded from TOML config");
        return Some(key);
    }

    warn!(
        "Geocode API key not configured (set {} or [geocode] api_key); incidents will be stored without coordinates",
        GEOCODE_API_KEY_ENV
    );
    None
}

/// Non-empty, non-whitespace
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use serial_test::serial;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(pick_key(some("db"), some("env"), some("toml")), some("db"));
        assert_eq!(pick_key(None, some("env"), some("toml")), some("env"));
        assert_eq!(pick_key(None, None, some("toml")), some("toml"));
        assert_eq!(pick_key(None, None, None), None);
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }

    #[tokio::test]
    #[serial]
    async fn test_database_key_beats_toml() {
        std::env::remove_var(GEOCODE_API_KEY_ENV);
        let pool = test_pool().await;
        crate::db::settings::set_geocode_api_key(&pool, "from-db".to_string())
            .await
            .unwrap();

        let mut config = TomlConfig::default();
        config.geocode.api_key = some("from-toml");

        let key = resolve_geocode_api_key(&pool, &config).await.unwrap();
        assert_eq!(key, some("from-db"));
    }

    #[tokio::test]
    #[serial]
    async fn test_blank_values_are_skipped() {
        std::env::set_var(GEOCODE_API_KEY_ENV, "  ");
        let pool = test_pool().await;
        crate::db::settings::set_geocode_api_key(&pool, "".to_string())
            .await
            .unwrap();

        let mut config = TomlConfig::default();
        config.geocode.api_key = some("from-toml");

        let key = resolve_geocode_api_key(&pool, &config).await.unwrap();
        assert_eq!(key, some("from-toml"));

        std::env::remove_var(GEOCODE_API_KEY_ENV);
    }
}
