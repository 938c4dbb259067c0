//! HTTP API for stowage.
//!
//! Thin axum layer over [`crate::file`]: folder listing and creation plus
//! multipart uploads, with a health check, OpenAPI docs and an optional
//! static frontend.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
