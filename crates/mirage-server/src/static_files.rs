//! Static asset serving for `.js`, `.css`, `.jpg` and `.png` requests.

use crate::response::{text_response, MockResponse, ResponseBuilder};
use hyper::header::CONTENT_TYPE;
use hyper::StatusCode;
use std::path::{Path, PathBuf};
use tracing::debug;

const NOT_FOUND_TEXT: &str = "404 page not found\n";

/// Content type by file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

/// Files under a root directory.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File for a decoded URL path, or `None` if it would leave the root.
    pub fn file_path(&self, url_path: &str) -> Option<PathBuf> {
        let relative = url_path.trim_start_matches('/');
        if relative.split(['/', '\\']).any(|segment| segment == "..") {
            return None;
        }
        Some(self.root.join(relative))
    }

    pub async fn serve(&self, url_path: &str) -> MockResponse {
        let Some(file) = self.file_path(url_path) else {
            debug!("refusing static path outside root: {url_path}");
            return not_found();
        };

        match tokio::fs::read(&file).await {
            Ok(contents) => ResponseBuilder::new(StatusCode::OK)
                .set_header(CONTENT_TYPE, content_type_for(&file))
                .body(contents)
                .build(),
            Err(e) => {
                debug!("static file {} unavailable: {e}", file.display());
                not_found()
            }
        }
    }
}

fn not_found() -> MockResponse {
    text_response(StatusCode::NOT_FOUND, NOT_FOUND_TEXT)
}
