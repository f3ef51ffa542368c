//! Geocoding collaborator and enrichment

mod client;
mod enricher;

pub use client::{GeocodeHttpError, HttpGeocodeClient};
pub use enricher::{extract_first_location, GeocodeEnricher, GeocodeMiss};

use async_trait::async_trait;

/// Resolves a free-text address to a provider response body
///
/// Implementations must return an empty string on any transport or
/// provider failure rather than an error.
#[async_trait]
pub trait GeocodeClient: Send + Sync {
    async fn resolve(&self, address: &str) -> String;
}
