//! OpenAPI document for the REST endpoints.

use utoipa::OpenApi;

use super::dto::RelayStatsResponse;
use super::handlers::{relay, system};
use crate::domain::{DisconnectPolicy, PeerSummary};

/// Generated OpenAPI description, served at `/api-docs/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "tab-relay", description = "Same-origin broadcast relay"),
    paths(system::health_handler, relay::stats_handler),
    components(schemas(
        system::HealthResponse,
        RelayStatsResponse,
        PeerSummary,
        DisconnectPolicy
    )),
    tags(
        (name = "System", description = "Service health"),
        (name = "Relay", description = "Relay introspection"),
    )
)]
pub struct ApiDoc;
