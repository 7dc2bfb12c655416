//! Relay introspection endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::RelayStatsResponse;
use crate::app_state::AppState;

/// `GET /relay/stats` — Peer registry snapshot.
#[utoipa::path(
    get,
    path = "/relay/stats",
    tag = "Relay",
    summary = "Relay statistics",
    description = "Returns the peer count, the last assigned connection id, the registered peer ids, the disconnect policy, and a summary of each peer.",
    responses(
        (status = 200, description = "Registry snapshot", body = RelayStatsResponse),
    )
)]
pub async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.relay.snapshot().await;
    let body = RelayStatsResponse::from_snapshot(snapshot, state.relay.policy());
    (StatusCode::OK, Json(body))
}

/// Relay routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/relay/stats", get(stats_handler))
}
