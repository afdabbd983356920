// src/routes/devices.rs
//! Device listing and per-device summary endpoints for the wattflow backend.
//!
//! - `GET /api/devices` — every known device (devices appear implicitly on
//!   first measurement, so this is the registry's read side).
//! - `GET /api/devices/{device_id}/summary` — latest readings plus today's
//!   UTC energy total for one device. An unknown device is a 404; a known
//!   device with no measurements yet reports zero-valued fields.
//!
//! Sibling module under `routes` per EMBP; only the subrouter is exported.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use tracing::{debug, info};

use super::AppState;
use crate::error::ApiError;
use crate::models::{Device, Summary};
use crate::{aggregate, store};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/devices", get(list_handler))
        .route("/api/devices/{device_id}/summary", get(summary_handler))
}

async fn list_handler(State(state): State<AppState>) -> Result<Json<Vec<Device>>, ApiError> {
    // ---
    let devices = store::list_devices(&state.pool).await?;
    debug!("GET /api/devices - Returning {} devices", devices.len());
    Ok(Json(devices))
}

async fn summary_handler(
    Path(device_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Summary>, ApiError> {
    // ---
    info!("GET /api/devices/{}/summary", device_id);

    // Unknown device is an error; a device with no data is not
    let device = store::find_device(&state.pool, &device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Device '{}' not found", device_id)))?;

    let latest = store::latest_measurement(&state.pool, device.id).await?;
    let (latest_power, latest_energy) = match &latest {
        Some(m) => (m.power, m.energy),
        None => (0.0, 0.0),
    };

    let today = Utc::now().date_naive();
    let daily_energy = aggregate::daily_total(&state.pool, device.id, today).await?;

    Ok(Json(Summary {
        device_id: device.device_id,
        latest_power,
        latest_energy,
        daily_energy,
        // Tariff engine not implemented; cost is a stub
        daily_cost: 0.0,
    }))
}
