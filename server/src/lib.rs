//! HTTP surface and process wiring for the HR backend.

pub mod config;
mod extract;
mod handlers;
pub mod http;

pub use config::AppConfig;
pub use http::{AppState, ServeConfig, build_router, serve};
