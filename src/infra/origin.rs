//! Documentation origin: serves generated site files from disk.

use std::io::ErrorKind;
use std::path::{Component, Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use mime_guess::Mime;
use tracing::warn;

use crate::application::error::ErrorReport;

const SOURCE: &str = "infra::origin::serve_docs";
const INDEX_FILE: &str = "index.html";

/// Directory the documentation site is served from.
#[derive(Debug, Clone)]
pub struct DocsOrigin {
    root: Arc<PathBuf>,
}

impl DocsOrigin {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    pub fn root(&self) -> &FsPath {
        &self.root
    }

    /// Map a request path onto a file below the root.
    ///
    /// Empty paths and paths ending in `/` resolve to `index.html`. Anything
    /// that would leave the root is rejected.
    fn resolve(&self, path: &str) -> Result<PathBuf, StatusCode> {
        let mut relative = path.trim_start_matches('/').to_string();
        if relative.is_empty() || relative.ends_with('/') {
            relative.push_str(INDEX_FILE);
        }

        let candidate = FsPath::new(&relative);
        let escapes = candidate
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));
        if escapes {
            return Err(StatusCode::BAD_REQUEST);
        }

        Ok(self.root.join(candidate))
    }
}

/// Serve one file of the documentation site.
pub async fn serve_docs(State(origin): State<DocsOrigin>, Path(path): Path<String>) -> Response {
    serve_file(&origin, &path).await
}

/// Serve the site's root `index.html`.
pub async fn serve_docs_index(State(origin): State<DocsOrigin>) -> Response {
    serve_file(&origin, "").await
}

async fn serve_file(origin: &DocsOrigin, path: &str) -> Response {
    let file = match origin.resolve(path) {
        Ok(file) => file,
        Err(status) => return rejected_response(status),
    };

    match tokio::fs::read(&file).await {
        Ok(contents) => {
            let mime = mime_guess::from_path(&file).first_or_octet_stream();
            build_response(Bytes::from(contents), mime)
        }
        Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
            not_found_response()
        }
        Err(err) => {
            warn!(path = %file.display(), error = %err, "failed to read documentation file");
            let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
            ErrorReport::from_error(SOURCE, StatusCode::INTERNAL_SERVER_ERROR, &err)
                .attach(&mut response);
            response
        }
    }
}

fn not_found_response() -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    ErrorReport::from_message(SOURCE, StatusCode::NOT_FOUND, "Documentation page not found")
        .attach(&mut response);
    response
}

fn rejected_response(status: StatusCode) -> Response {
    let mut response = status.into_response();
    ErrorReport::from_message(SOURCE, status, "Documentation path rejected").attach(&mut response);
    response
}

fn build_response(bytes: Bytes, mime: Mime) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_resolves_to_index() {
        let origin = DocsOrigin::new("/srv/docs");
        assert_eq!(
            origin.resolve("guide/").unwrap(),
            PathBuf::from("/srv/docs/guide/index.html")
        );
        assert_eq!(
            origin.resolve("").unwrap(),
            PathBuf::from("/srv/docs/index.html")
        );
    }

    #[test]
    fn traversal_is_rejected() {
        let origin = DocsOrigin::new("/srv/docs");
        assert_eq!(
            origin.resolve("../etc/passwd"),
            Err(StatusCode::BAD_REQUEST)
        );
        assert_eq!(origin.resolve("a/./b"), Ok(PathBuf::from("/srv/docs/a/b")));
        assert_eq!(origin.resolve("a/../../b"), Err(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn serves_file_with_guessed_content_type() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("style.css"), "body{}").expect("write fixture");
        let origin = DocsOrigin::new(dir.path());

        let response = serve_docs(State(origin), Path("style.css".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/css"
        );
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "6");
    }

    #[tokio::test]
    async fn missing_file_is_not_found_with_report() {
        let dir = tempfile::tempdir().expect("tempdir");
        let origin = DocsOrigin::new(dir.path());

        let response = serve_docs(State(origin), Path("nope.html".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ErrorReport>().is_some());
    }
}
