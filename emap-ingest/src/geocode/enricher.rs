//! Address → coordinates enrichment
//!
//! Only the first geocode result is used; later ones are ignored even if
//! they are malformed.

use super::GeocodeClient;
use crate::models::Coordinates;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Why enrichment produced no coordinates
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeocodeMiss {
    /// Client failed or returned nothing
    #[error("empty geocode response")]
    EmptyResponse,

    #[error("unparseable geocode response: {0}")]
    Unparseable(String),

    #[error("geocode response has no results")]
    NoResults,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

/// Resolves addresses through a [`GeocodeClient`]
#[derive(Clone)]
pub struct GeocodeEnricher {
    client: Arc<dyn GeocodeClient>,
}

impl GeocodeEnricher {
    pub fn new(client: Arc<dyn GeocodeClient>) -> Self {
        Self { client }
    }

    /// Geocode `address`
    ///
    /// Never fails the caller's record: a miss is returned as a value.
    pub async fn enrich(&self, address: &str) -> Result<Coordinates, GeocodeMiss> {
        let body = self.client.resolve(address).await;
        let result = extract_first_location(&body);

        match &result {
            Ok(coords) => tracing::debug!(
                address = %address,
                lat = coords.latitude,
                lng = coords.longitude,
                "Address geocoded"
            ),
            Err(miss) => tracing::warn!(address = %address, reason = %miss, "Address not geocoded"),
        }

        result
    }
}

/// Pull `results[0].geometry.location` out of a provider response
pub fn extract_first_location(body: &str) -> Result<Coordinates, GeocodeMiss> {
    if body.trim().is_empty() {
        return Err(GeocodeMiss::EmptyResponse);
    }

    let response: GeocodeResponse =
        serde_json::from_str(body).map_err(|e| GeocodeMiss::Unparseable(e.to_string()))?;

    let first = response.results.into_iter().next().ok_or(GeocodeMiss::NoResults)?;

    let result: GeocodeResult =
        serde_json::from_value(first).map_err(|e| GeocodeMiss::Unparseable(e.to_string()))?;

    let Location { lat, lng } = result.geometry.location;
    if !lat.is_finite() || !lng.is_finite() {
        return Err(GeocodeMiss::Unparseable("non-finite coordinates".to_string()));
    }

    Ok(Coordinates {
        latitude: lat,
        longitude: lng,
    })
}
