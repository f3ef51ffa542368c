//! Feed document parsing
//!
//! The document is validated at the top level eagerly; individual records
//! are decoded lazily each time [`ParsedFeed::candidates`] is iterated.

use crate::error::{ReconcileError, RecordError};
use crate::models::IncidentCandidate;
use chrono::{NaiveDateTime, Timelike};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Accepted record timestamp formats
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Batch-level fields that accompany the `result` array
///
/// Informational only; never used for matching or transitions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedHeader {
    /// Date the feed snapshot covers
    #[serde(default)]
    pub fecha: Option<String>,
    /// Upstream feed type code
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default, rename = "totalCount")]
    pub total_count: Option<u64>,
}

/// Wire shape of a single feed record
#[derive(Debug, Deserialize)]
struct FeedRecord {
    fecha: String,
    #[serde(rename = "tipoSiniestro")]
    tipo_siniestro: String,
    direccion: String,
    #[serde(default)]
    duracion: Option<String>,
    recursos: Vec<String>,
}

/// Feed document whose top-level structure has been validated
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    header: FeedHeader,
    records: Vec<Value>,
}

impl ParsedFeed {
    pub fn header(&self) -> &FeedHeader {
        &self.header
    }

    /// Number of raw records, well-formed or not
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Candidates in feed order
    ///
    /// Lazy and restartable: each call decodes the records afresh.
    pub fn candidates(&self) -> impl Iterator<Item = Result<IncidentCandidate, RecordError>> + '_ {
        self.records
            .iter()
            .enumerate()
            .map(|(index, raw)| parse_record(index, raw))
    }
}

/// Stateless feed parser
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    /// Validate the document structure
    ///
    /// Fails with `MalformedFeed` on invalid JSON, a non-object document, or
    /// a missing/non-array `result`.
    pub fn parse(&self, raw: &[u8]) -> Result<ParsedFeed, ReconcileError> {
        let document: Value = serde_json::from_slice(raw)
            .map_err(|e| ReconcileError::MalformedFeed(format!("invalid JSON: {}", e)))?;

        let Value::Object(mut object) = document else {
            return Err(ReconcileError::MalformedFeed(
                "top-level value is not an object".to_string(),
            ));
        };

        let records = match object.remove("result") {
            Some(Value::Array(records)) => records,
            Some(_) => {
                return Err(ReconcileError::MalformedFeed(
                    "'result' is not an array".to_string(),
                ))
            }
            None => {
                return Err(ReconcileError::MalformedFeed(
                    "missing 'result' array".to_string(),
                ))
            }
        };

        let header = serde_json::from_value::<FeedHeader>(Value::Object(object)).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring unreadable feed header fields");
            FeedHeader::default()
        });

        if let Some(total) = header.total_count {
            if total != records.len() as u64 {
                warn!(
                    total_count = total,
                    records = records.len(),
                    "Feed totalCount disagrees with record count"
                );
            }
        }

        debug!(
            fecha = ?header.fecha,
            tipo = ?header.tipo,
            records = records.len(),
            "Feed document parsed"
        );

        Ok(ParsedFeed { header, records })
    }
}

fn parse_record(index: usize, raw: &Value) -> Result<IncidentCandidate, RecordError> {
    let record = FeedRecord::deserialize(raw).map_err(|e| malformed(index, e.to_string()))?;

    let timestamp = parse_timestamp(&record.fecha)
        .ok_or_else(|| malformed(index, format!("unparseable timestamp '{}'", record.fecha)))?;

    // Matching is at whole-second granularity
    let time = timestamp.time();
    let time = time.with_nanosecond(0).unwrap_or(time);

    Ok(IncidentCandidate {
        index,
        date: timestamp.date(),
        time,
        incident_type: record.tipo_siniestro,
        address: record.direccion,
        duration: record.duracion.unwrap_or_default(),
        resources: record.recursos,
    })
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value.trim(), format).ok())
}

fn malformed(index: usize, reason: String) -> RecordError {
    warn!(index, reason = %reason, "Skipping malformed feed record");
    RecordError::MalformedRecord { index, reason }
}
