//! Status endpoint.
//!
//! `GET /` answers `200 OK` with `{"status":"ok"}` or `{"status":"error"}`,
//! reflecting the current [`StatusRegistry`] value. There are no other
//! routes.

use crate::status::{Status, StatusRegistry};
use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Per-request processing limit.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Body of the status response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: Status,
}

/// Build the monitoring router.
#[must_use]
pub fn monitoring_router(status: StatusRegistry) -> Router {
    Router::new()
        .route("/", get(status_handler))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(status)
}

async fn status_handler(State(status): State<StatusRegistry>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: status.get(),
    })
}
