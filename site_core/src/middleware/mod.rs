//! Middleware components for the HTTP server

pub mod cors;
pub mod logging;
pub mod rate_limit;

pub use cors::cors_layer_from_config;
pub use logging::logging_layer;
pub use rate_limit::{rate_limit_middleware, RateLimiter};
