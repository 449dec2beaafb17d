//! Cropix HTTP server

pub mod api;
pub mod config;

pub use api::{create_router, serve, ApiError, AppState};
pub use config::ServerConfig;
