//! HTTP server and its configuration.
//!
//! - `config`: TOML configuration and secrets loading
//! - `http`: the axum router exposing the generation endpoints

pub mod config;
pub mod http;

pub use config::{Config, Secrets};
pub use http::{ErrorBody, GenerateRequest, create_router};
