use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;

use crate::hub::Hub;
use crate::Config;

mod devices;
mod health;
mod ingest;
mod measurements;
mod realtime;

// ---

/// Shared application state handed to every route by the gateway.
#[derive(Clone)]
pub struct AppState {
    // ---
    pub pool: PgPool,
    pub config: Config,
    pub hub: Arc<Hub>,
}

pub fn router(pool: PgPool, config: Config) -> Router {
    // ---
    let state = AppState {
        pool,
        config,
        hub: Arc::new(Hub::new()),
    };

    Router::new()
        .merge(ingest::router())
        .merge(measurements::router())
        .merge(devices::router())
        .merge(realtime::router())
        .merge(health::router())
        .with_state(state)
}
