//! Content cache and invalidation primitives

pub mod memory;

pub use memory::{CacheInvalidator, CacheScope, ContentCache, PathScope, CMS_TAG};
