//! Payload encoding
//!
//! This module wraps a computed window of day summaries into the JSON payload
//! handed to the dashboard, with producer and provenance metadata.

use crate::error::MetricsError;
use crate::types::{DataSource, DaySummary};
use crate::{HEALTHFOLD_VERSION, PRODUCER_NAME};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current payload schema version
pub const PAYLOAD_VERSION: &str = "1.0.0";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Where the data came from and when it was computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadProvenance {
    pub source: DataSource,
    pub computed_at_utc: String,
}

/// Bounds of the encoded window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub days: usize,
}

/// Encoded metrics for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsPayload {
    pub payload_version: String,
    pub producer: PayloadProducer,
    pub provenance: PayloadProvenance,
    pub window: PayloadWindow,
    pub days: Vec<DaySummary>,
}

/// Encoder for producing metrics payloads
pub struct MetricsEncoder {
    instance_id: String,
}

impl Default for MetricsEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Wrap `days` (oldest first) into a payload
    pub fn encode(&self, source: DataSource, days: &[DaySummary]) -> MetricsPayload {
        let window = PayloadWindow {
            start: days.first().map(|d| d.date),
            end: days.last().map(|d| d.date),
            days: days.len(),
        };

        MetricsPayload {
            payload_version: PAYLOAD_VERSION.to_string(),
            producer: PayloadProducer {
                name: PRODUCER_NAME.to_string(),
                version: HEALTHFOLD_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            provenance: PayloadProvenance {
                source,
                computed_at_utc: Utc::now().to_rfc3339(),
            },
            window,
            days: days.to_vec(),
        }
    }

    /// Encode to a compact JSON string
    pub fn encode_to_json(
        &self,
        source: DataSource,
        days: &[DaySummary],
    ) -> Result<String, MetricsError> {
        let payload = self.encode(source, days);
        serde_json::to_string(&payload).map_err(|e| MetricsError::EncodingError(e.to_string()))
    }
}
