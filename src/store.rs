//! Device registry and measurement store for `codemetal-wattflow`.
//!
//! All durable state lives behind this module: the lazily-populated device
//! registry and the append-only measurement log. Handlers never write SQL
//! themselves (EMBP: routes talk to this gateway, not to `sqlx` directly).
//!
//! Errors are raw [`sqlx::Error`]; callers at the request boundary convert
//! them into `ApiError::Storage` via `?`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use crate::models::{Device, MeasurementRecord};

// ---

/// Optional filters for the measurement history query. Bounds are inclusive.
#[derive(Debug, Default)]
pub struct MeasurementFilter {
    // ---
    pub device_external_id: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

// ---

/// Look up a device by its external identifier.
pub async fn find_device(pool: &PgPool, external_id: &str) -> Result<Option<Device>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Device>(
        r#"
        SELECT id, external_id AS device_id, name
        FROM devices
        WHERE external_id = $1
        "#,
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await
}

/// Resolve an external device identifier to its registry row, creating the
/// row on first sight.
///
/// Safe under concurrent first-sight of the same identifier: the insert is
/// conflict-tolerant against the UNIQUE constraint on `external_id`, so
/// exactly one row ever results. A caller that loses the race reads the
/// winner's row.
pub async fn resolve_or_create(
    pool: &PgPool,
    external_id: &str,
    name: Option<&str>,
) -> Result<Device, sqlx::Error> {
    // ---
    if let Some(device) = find_device(pool, external_id).await? {
        return Ok(device);
    }

    let inserted = sqlx::query_as::<_, Device>(
        r#"
        INSERT INTO devices (external_id, name)
        VALUES ($1, $2)
        ON CONFLICT (external_id) DO NOTHING
        RETURNING id, external_id AS device_id, name
        "#,
    )
    .bind(external_id)
    .bind(name)
    .fetch_optional(pool)
    .await?;

    match inserted {
        Some(device) => {
            debug!("Registered new device '{}' as id {}", external_id, device.id);
            Ok(device)
        }
        // Lost the creation race; the row exists now
        None => {
            sqlx::query_as::<_, Device>(
                r#"
                SELECT id, external_id AS device_id, name
                FROM devices
                WHERE external_id = $1
                "#,
            )
            .bind(external_id)
            .fetch_one(pool)
            .await
        }
    }
}

/// List all registered devices, oldest first.
pub async fn list_devices(pool: &PgPool) -> Result<Vec<Device>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Device>(
        r#"
        SELECT id, external_id AS device_id, name
        FROM devices
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

// ---

/// Persist one measurement for a resolved device.
///
/// Rows are immutable after this insert; only a device cascade ever removes
/// them. Fails only on a storage-layer error.
pub async fn append_measurement(
    pool: &PgPool,
    device: &Device,
    voltage: f64,
    current: f64,
    power: f64,
    energy: f64,
    timestamp: DateTime<Utc>,
) -> Result<MeasurementRecord, sqlx::Error> {
    // ---
    let (id,): (i32,) = sqlx::query_as(
        r#"
        INSERT INTO measurements (device_id, voltage, current, power, energy, timestamp)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(device.id)
    .bind(voltage)
    .bind(current)
    .bind(power)
    .bind(energy)
    .bind(timestamp)
    .fetch_one(pool)
    .await?;

    Ok(MeasurementRecord {
        id,
        device_id: device.device_id.clone(),
        voltage,
        current,
        power,
        energy,
        timestamp,
    })
}

/// Query measurement history, newest first, with pagination.
///
/// A single static statement handles every filter combination via nullable
/// binds; `skip`/`limit` are assumed already clamped by the route layer.
pub async fn query_measurements(
    pool: &PgPool,
    filter: &MeasurementFilter,
    skip: i64,
    limit: i64,
) -> Result<Vec<MeasurementRecord>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, MeasurementRecord>(
        r#"
        SELECT m.id, d.external_id AS device_id,
               m.voltage, m.current, m.power, m.energy, m.timestamp
        FROM measurements m
        JOIN devices d ON d.id = m.device_id
        WHERE ($1::text IS NULL OR d.external_id = $1)
          AND ($2::timestamptz IS NULL OR m.timestamp >= $2)
          AND ($3::timestamptz IS NULL OR m.timestamp <= $3)
        ORDER BY m.timestamp DESC
        OFFSET $4 LIMIT $5
        "#,
    )
    .bind(&filter.device_external_id)
    .bind(filter.start)
    .bind(filter.end)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Most recent measurement for a device, if any.
pub async fn latest_measurement(
    pool: &PgPool,
    device_pk: i32,
) -> Result<Option<MeasurementRecord>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, MeasurementRecord>(
        r#"
        SELECT m.id, d.external_id AS device_id,
               m.voltage, m.current, m.power, m.energy, m.timestamp
        FROM measurements m
        JOIN devices d ON d.id = m.device_id
        WHERE m.device_id = $1
        ORDER BY m.timestamp DESC
        LIMIT 1
        "#,
    )
    .bind(device_pk)
    .fetch_optional(pool)
    .await
}

/// Sum of `energy` over a device's measurements inside the inclusive
/// `[start, end]` window; 0 when no rows match.
///
/// Ground truth for the daily aggregate — `aggregate::daily_total` is
/// defined as exactly this sum over the day's bounds.
pub async fn sum_energy(
    pool: &PgPool,
    device_pk: i32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<f64, sqlx::Error> {
    // ---
    let (total,): (f64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(energy), 0.0)
        FROM measurements
        WHERE device_id = $1
          AND timestamp >= $2
          AND timestamp <= $3
        "#,
    )
    .bind(device_pk)
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;

    Ok(total)
}
