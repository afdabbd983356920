//! Database schema management for `codemetal-wattflow`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `devices` registry table and the `measurements` log table.
/// Safe to call on every startup; no-op if objects already exist.
///
/// The UNIQUE constraint on `devices.external_id` is load-bearing: it is
/// what makes concurrent first-sight device creation resolve to a single
/// row (see `store::resolve_or_create`). Deleting a device cascades to its
/// measurements.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Device registry; rows are created lazily on first measurement
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS devices (
            id          SERIAL PRIMARY KEY,
            external_id TEXT        NOT NULL UNIQUE,
            name        TEXT,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Immutable measurement log served by `/api/measurements`
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS measurements (
            id        SERIAL PRIMARY KEY,
            device_id INTEGER          NOT NULL REFERENCES devices(id) ON DELETE CASCADE,
            voltage   DOUBLE PRECISION NOT NULL,
            current   DOUBLE PRECISION NOT NULL,
            power     DOUBLE PRECISION NOT NULL,
            energy    DOUBLE PRECISION NOT NULL,
            timestamp TIMESTAMPTZ      NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Covers per-device history queries and the daily energy sum
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_measurements_device_ts
            ON measurements (device_id, timestamp DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Covers the unfiltered newest-first listing
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_measurements_ts
            ON measurements (timestamp DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
