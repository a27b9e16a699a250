//! sitemap.xml and robots.txt endpoints

use axum::{extract::State, http::header, response::IntoResponse};

use crate::AppState;

pub async fn handle_sitemap(State(state): State<AppState>) -> impl IntoResponse {
    let xml = state.seo.sitemap_xml().await;
    ([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], xml)
}

pub async fn handle_robots(State(state): State<AppState>) -> impl IntoResponse {
    let text = state.seo.robots_txt();
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text)
}
