//! Request and response bodies for the REST endpoints.

pub mod relay_dto;

pub use relay_dto::RelayStatsResponse;
