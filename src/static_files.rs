use std::path::Path;
use tower_http::services::ServeDir;

/// Serves stored profile images by file name at the root path
pub fn uploads_service(upload_dir: impl AsRef<Path>) -> ServeDir {
    ServeDir::new(upload_dir).append_index_html_on_directories(false)
}
