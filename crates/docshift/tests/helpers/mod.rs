//! Shared fixtures: fake conversion engines and a router over a temp storage root.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use tower::ServiceExt;

use docshift::{
    DocshiftError, Result, ServiceConfig,
    api::{ApiState, create_router},
    convert::{Collaborators, DocumentConverter, FetchRequest, PageRasterizer, Table, TableExtractor, VideoFetcher},
};

pub const BOUNDARY: &str = "X-BOUNDARY";
pub const FAKE_PDF: &[u8] = b"%PDF-1.4\n% fake document\n%%EOF\n";

/// Video engine that writes a small file named after the request template.
pub struct FakeVideo {
    pub extension: &'static str,
    pub fail_with: Option<&'static str>,
    pub seen: Arc<std::sync::Mutex<Vec<FetchRequest>>>,
}

impl FakeVideo {
    pub fn ok() -> Self {
        Self {
            extension: "mp4",
            fail_with: None,
            seen: Arc::default(),
        }
    }

    pub fn failing(message: &'static str) -> Self {
        Self {
            fail_with: Some(message),
            ..Self::ok()
        }
    }
}

impl VideoFetcher for FakeVideo {
    fn fetch(&self, request: &FetchRequest) -> Result<PathBuf> {
        self.seen.lock().unwrap().push(request.clone());
        if let Some(message) = self.fail_with {
            std::fs::write(request.output_dir.join("partial.part"), b"half")?;
            return Err(DocshiftError::collaborator(message));
        }
        let path = request.output_dir.join(format!("abc123_Some Title.{}", self.extension));
        std::fs::write(&path, b"\x00\x00\x00\x18ftypmp42 fake video")?;
        Ok(path)
    }
}

/// Table engine returning a fixed set of tables.
pub struct FakeTables(pub Vec<Table>);

impl TableExtractor for FakeTables {
    fn extract_tables(&self, pdf: &Path) -> Result<Vec<Table>> {
        assert!(pdf.is_file(), "upload should be on disk during conversion");
        Ok(self.0.clone())
    }
}

/// Document engine that writes fixed bytes, or fails.
pub struct FakeDocuments {
    pub fail_with: Option<&'static str>,
}

impl DocumentConverter for FakeDocuments {
    fn convert_to_docx(&self, _pdf: &Path, output: &Path) -> Result<()> {
        if let Some(message) = self.fail_with {
            std::fs::write(output, b"partial")?;
            return Err(DocshiftError::collaborator(message));
        }
        std::fs::write(output, b"PK fake docx")?;
        Ok(())
    }
}

/// Page engine that writes `pages` tiny PNG placeholders.
pub struct FakePages {
    pub pages: usize,
    pub calls: AtomicUsize,
}

impl FakePages {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            calls: AtomicUsize::new(0),
        }
    }
}

impl PageRasterizer for FakePages {
    fn render_pages(&self, _pdf: &Path, out_dir: &Path, base_name: &str) -> Result<Vec<PathBuf>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (1..=self.pages)
            .map(|n| {
                let path = out_dir.join(format!("{}_page_{}.png", base_name, n));
                std::fs::write(&path, format!("png {}", n))?;
                Ok(path)
            })
            .collect()
    }
}

pub fn sample_tables() -> Vec<Table> {
    vec![vec![
        vec!["Name".to_string(), "Qty".to_string()],
        vec!["apple".to_string(), "3".to_string()],
        vec!["pear".to_string(), "5".to_string()],
    ]]
}

pub fn fake_collaborators() -> Collaborators {
    Collaborators {
        video: Arc::new(FakeVideo::ok()),
        tables: Arc::new(FakeTables(sample_tables())),
        documents: Arc::new(FakeDocuments { fail_with: None }),
        pages: Arc::new(FakePages::new(2)),
    }
}

pub fn test_config(base_dir: &Path) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.storage.base_dir = base_dir.to_path_buf();
    config.storage.sweep_on_startup = false;
    config
}

pub fn test_state(config: ServiceConfig, collaborators: Collaborators) -> (ApiState, Router) {
    let state = ApiState::new(config, collaborators).unwrap();
    let router = create_router(state.clone());
    (state, router)
}

/// A multipart body with a single `file` field.
pub fn multipart_body(filename: &str, content: &[u8]) -> Vec<u8> {
    multipart_field("file", filename, content)
}

pub fn multipart_field(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_upload(router: Router, uri: &str, body: Vec<u8>) -> Response<Body> {
    router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn get(router: Router, uri: &str) -> Response<Body> {
    router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn error_message(response: Response<Body>) -> String {
    let body = body_bytes(response).await;
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    value["error"].as_str().unwrap().to_string()
}

pub fn disposition(response: &Response<Body>) -> String {
    response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

/// Names of the entries directly under `dir`, sorted.
pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
