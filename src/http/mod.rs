//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with the relay, health and debug endpoints
//! - Request handlers
//! - TTL response cache used by the relay

pub mod cache;
pub mod handlers;
pub mod routes;

pub use routes::create_router;
