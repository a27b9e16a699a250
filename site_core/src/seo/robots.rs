//! robots.txt generation

const DISALLOWED: [&str; 2] = ["/api/", "/slice-simulator"];

pub fn render(site_url: &str) -> String {
    let site_url = site_url.trim_end_matches('/');

    let mut text = String::from("User-Agent: *\nAllow: /\n");
    for path in DISALLOWED {
        text.push_str(&format!("Disallow: {}\n", path));
    }
    text.push_str(&format!("\nHost: {}\nSitemap: {}{}\n", site_url, site_url, super::SITEMAP_PATH));
    text
}
