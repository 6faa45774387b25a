//! Scrape and index handlers.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Query, Request, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use tracing::{debug, error};

use rdsmon_collector::{LabelRequest, ScrapeRequest};
use rdsmon_exposition::render;

use crate::ApiState;
use crate::query::ScrapeQuery;

const TEXT_PLAIN: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Caller identity used when the connection address is unavailable.
pub const UNKNOWN_CALLER: &str = "unknown";

/// GET /
pub async fn index(State(state): State<ApiState>) -> impl IntoResponse {
    Html(format!(
        "<html>\n\
         <head><title>RDS Enhanced Monitoring Exporter</title></head>\n\
         <body>\n\
         <h1>RDS Enhanced Monitoring Exporter</h1>\n\
         <p>Region: {region}</p>\n\
         <p><a href=\"{path}\">Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        region = state.region,
        path = state.telemetry_path,
    ))
}

/// GET <telemetry_path>?ResourceId=<id>&labels[]=<name>...
pub async fn scrape(
    State(state): State<ApiState>,
    Query(pairs): Query<Vec<(String, String)>>,
    request: Request,
) -> impl IntoResponse {
    let caller = caller_of(&request);
    let query = ScrapeQuery::from_pairs(pairs);
    let scrape = ScrapeRequest {
        caller,
        resource_id: query.resource_id,
        labels: LabelRequest::parse(&query.labels),
    };

    match state.collector.collect(&scrape).await {
        Ok(series) => {
            debug!(caller = %scrape.caller, series = series.len(), "scrape served");
            (StatusCode::OK, [("content-type", TEXT_PLAIN)], render(&series)).into_response()
        }
        Err(e) => {
            error!(caller = %scrape.caller, error = %e, "scrape failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", TEXT_PLAIN)],
                format!("error: {e}"),
            )
                .into_response()
        }
    }
}

/// Remote IP of the connection, without the port.
fn caller_of(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CALLER.to_string())
}
