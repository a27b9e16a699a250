//! HTTP route handlers

pub mod contact;
pub mod health;
pub mod revalidate;
pub mod routes;
pub mod seo;
