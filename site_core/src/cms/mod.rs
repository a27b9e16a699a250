//! Headless CMS access

pub mod cached;
pub mod client;
pub mod routes;

pub use cached::CachedContentService;
pub use client::{CmsError, ContentService, PrismicClient};
pub use routes::{Route, RouteResolver};
