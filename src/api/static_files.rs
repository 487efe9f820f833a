use std::path::Path;
use tower_http::services::ServeDir;

/// Serve the static site from `static_dir`, `index.html` for directory paths
pub fn static_site(static_dir: &str) -> ServeDir {
    if !Path::new(static_dir).is_dir() {
        tracing::warn!(static_dir, "static site directory not found, non-API paths will 404");
    }

    ServeDir::new(static_dir).append_index_html_on_directories(true)
}
