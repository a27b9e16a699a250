//! Request extractors

pub mod client_ip;
pub mod lenient_json;

pub use client_ip::{client_ip_from_headers, ClientIp};
pub use lenient_json::LenientJson;
