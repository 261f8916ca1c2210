//! HTTP surface modules (router, handlers, streaming delivery).

/// Shared constants and header names.
pub mod constants;
/// Artifact streaming with workspace release.
pub mod delivery;
/// `POST /download` handler.
pub mod download;
/// Problem response helpers.
pub mod errors;
/// `GET /downloads/{name}` passthrough.
pub mod files;
/// Health and metrics endpoints.
pub mod health;
/// Router construction and server host.
pub mod router;
/// Metrics middleware for HTTP requests.
pub mod telemetry;
