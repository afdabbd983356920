// src/routes/ingest.rs
//! Measurement ingestion endpoint for the wattflow backend.
//!
//! `POST /api/measurements` is the write path of the whole system: it takes
//! one sample from a metering device and runs the acceptance pipeline
//! (device resolve-or-create → durable append → live broadcast). It is a
//! sibling module in the `routes` directory following the Explicit Module
//! Boundary Pattern (EMBP): the gateway (`mod.rs`) merges the subrouter
//! exported here and nothing else.
//!
//! Pipeline guarantees:
//! - a storage failure at any step aborts the request with no partial state
//!   change and nothing broadcast;
//! - the 201 response does not wait on subscriber delivery — the accepted
//!   record is handed to the hub on a spawned task (fire-and-forget), and
//!   per-subscriber delivery failures stay inside the hub.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use serde::Serialize;
use tracing::{debug, info};

use super::AppState;
use crate::error::ApiError;
use crate::models::{LiveEvent, MeasurementPayload};
use crate::store;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/measurements", post(handler))
}

/// Acceptance acknowledgment returned to the device.
#[derive(Serialize)]
struct IngestResponse {
    status: &'static str,
    measurement_id: i32,
}

async fn handler(
    State(state): State<AppState>,
    Json(payload): Json<MeasurementPayload>,
) -> Result<impl IntoResponse, ApiError> {
    // ---
    info!("POST /api/measurements - Starting pipeline");

    // Absent fields get their documented defaults before the pipeline runs
    let external_id = payload.resolved_device_id().to_string();
    let timestamp = payload.resolved_timestamp();

    // Step 1: Resolve or create the device
    debug!("POST /api/measurements - Step 1 (device '{}')", external_id);

    let device = store::resolve_or_create(&state.pool, &external_id, None).await?;

    // Step 2: Persist the measurement
    debug!("POST /api/measurements - Step 2");

    let record = store::append_measurement(
        &state.pool,
        &device,
        payload.voltage,
        payload.current,
        payload.power,
        payload.energy,
        timestamp,
    )
    .await?;

    // Step 3: Hand the accepted record to the hub. The response must not
    // wait on subscriber delivery, so this runs on its own task.
    debug!("POST /api/measurements - Step 3");

    let hub = state.hub.clone();
    let event = LiveEvent::Measurement(record.clone());
    tokio::spawn(async move {
        hub.broadcast(&event).await;
    });

    info!(
        "Pipeline complete, accepted measurement {} for device '{}'",
        record.id, record.device_id
    );
    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            status: "ok",
            measurement_id: record.id,
        }),
    ))
}
