//! API endpoint URL builders

fn api(base_url: &str) -> String {
    format!("{}/api/v1", base_url.trim_end_matches('/'))
}

/// Build health check URL
pub fn health_url(base_url: &str) -> String {
    format!("{}/health", base_url.trim_end_matches('/'))
}

/// Build brand collection URL
pub fn brands_url(base_url: &str) -> String {
    format!("{}/brands", api(base_url))
}

/// Build single brand URL
pub fn brand_url(base_url: &str, id: i64) -> String {
    format!("{}/brands/{}", api(base_url), id)
}

/// Build streaming import URL
pub fn import_url(base_url: &str, brand_id: i64) -> String {
    format!("{}/brands/{}/imports?stream=true", api(base_url), brand_id)
}

/// Build image archive download URL
pub fn archive_url(base_url: &str, brand_id: i64) -> String {
    format!("{}/brands/{}/export/images.zip", api(base_url), brand_id)
}

/// Build link spreadsheet download URL
pub fn links_url(base_url: &str, brand_id: i64) -> String {
    format!("{}/brands/{}/export/links.xlsx", api(base_url), brand_id)
}
