// src/routes/measurements.rs
//! Measurement history endpoint for the wattflow backend.
//!
//! `GET /api/measurements` serves the read side of the measurement log:
//! optional device/time-window filters, newest-first ordering, and
//! skip/limit pagination with a server-enforced page-size cap. Sibling
//! module under `routes` per EMBP; only the subrouter is exported.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use super::AppState;
use crate::error::ApiError;
use crate::models::MeasurementRecord;
use crate::store::{self, MeasurementFilter};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/measurements", get(handler))
}

/// Query parameters for the measurement history endpoint.
///
/// `start`/`end` are inclusive ISO-8601 bounds; `limit` falls back to the
/// configured default page size and is capped at the configured maximum.
#[derive(Debug, Deserialize)]
pub struct MeasurementsQuery {
    // ---
    device_id: Option<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    skip: Option<i64>,
    limit: Option<i64>,
}

async fn handler(
    Query(params): Query<MeasurementsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<MeasurementRecord>>, ApiError> {
    // ---
    debug!("GET /api/measurements - {:?}", params);

    if let (Some(start), Some(end)) = (params.start, params.end) {
        if start > end {
            return Err(ApiError::Validation(format!(
                "start {} is after end {}",
                start, end
            )));
        }
    }

    let skip = params.skip.unwrap_or(0).max(0);
    let limit = params
        .limit
        .unwrap_or(state.config.page_size_default as i64)
        .clamp(1, state.config.page_size_max as i64);

    let filter = MeasurementFilter {
        device_external_id: params.device_id,
        start: params.start,
        end: params.end,
    };

    let rows = store::query_measurements(&state.pool, &filter, skip, limit).await?;

    info!("GET /api/measurements - Returning {} records", rows.len());
    Ok(Json(rows))
}
