//! rdsmon-api - HTTP surface of the exporter.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | Index page linking to the telemetry path |
//! | GET | `<telemetry_path>` | Scrape: `?ResourceId=<id>&labels[]=<name>...` |
//!
//! The scrape handler identifies callers by remote IP, so the router must be
//! served with `into_make_service_with_connect_info::<SocketAddr>()`.

pub mod handlers;
pub mod query;

use axum::Router;
use axum::routing::get;
use rdsmon_collector::IncrementalCollector;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub collector: IncrementalCollector,
    pub telemetry_path: String,
    /// Region resolved at startup.
    pub region: String,
}

/// Build the router: index page plus the scrape endpoint.
pub fn build_router(collector: IncrementalCollector, telemetry_path: &str, region: &str) -> Router {
    let telemetry_path = if telemetry_path.starts_with('/') {
        telemetry_path.to_string()
    } else {
        format!("/{telemetry_path}")
    };

    let state = ApiState {
        collector,
        telemetry_path: telemetry_path.clone(),
        region: region.to_string(),
    };

    Router::new()
        .route("/", get(handlers::index))
        .route(&telemetry_path, get(handlers::scrape))
        .with_state(state)
}
