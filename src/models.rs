//! Data models for the measurement pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// Device id used when an ingest payload does not name one. Matches the
/// firmware default of the PZEM-based meters.
pub const DEFAULT_DEVICE_ID: &str = "esp32_pzem";

/// Raw measurement sample pushed by a metering device
#[derive(Debug, Deserialize)]
pub struct MeasurementPayload {
    // ---
    pub device_id: Option<String>,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub energy: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A registered metering device as served by the API
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Device {
    // ---
    pub id: i32,
    pub device_id: String,
    pub name: Option<String>,
}

/// A persisted measurement as served by the API and pushed to live
/// subscribers. `device_id` carries the external device identifier, not
/// the internal row id.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MeasurementRecord {
    // ---
    pub id: i32,
    pub device_id: String,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub energy: f64,
    pub timestamp: DateTime<Utc>,
}

/// Per-device summary for the dashboard: last known readings plus today's
/// energy total. `daily_cost` is a stub until a tariff engine exists.
#[derive(Debug, Serialize)]
pub struct Summary {
    // ---
    pub device_id: String,
    pub latest_power: f64,
    pub latest_energy: f64,
    pub daily_energy: f64,
    pub daily_cost: f64,
}

/// Event pushed over the realtime channel. Serializes as
/// `{"type": "measurement", "data": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum LiveEvent {
    Measurement(MeasurementRecord),
}

/// Defaulting helpers applied before the sample enters the pipeline
impl MeasurementPayload {
    // ---
    pub fn resolved_device_id(&self) -> &str {
        // ---
        self.device_id.as_deref().unwrap_or(DEFAULT_DEVICE_ID)
    }

    pub fn resolved_timestamp(&self) -> DateTime<Utc> {
        // ---
        self.timestamp.unwrap_or_else(Utc::now)
    }
}
