//! Integration tests for the API module.

#![cfg(feature = "api")]

mod helpers;

use std::io::{Cursor, Read};
use std::sync::Arc;

use axum::http::StatusCode;
use calamine::{Data, Reader, Xlsx};

use docshift::{
    api::{ENDPOINTS, HealthResponse, InfoResponse, NOT_A_PDF_MESSAGE},
    convert::Collaborators,
    storage::Category,
};
use helpers::*;

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let (_state, router) = test_state(test_config(dir.path()), fake_collaborators());

    let response = get(router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let health: HealthResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert!(!health.version.is_empty());
}

#[tokio::test]
async fn test_info_lists_conversion_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let (_state, router) = test_state(test_config(dir.path()), fake_collaborators());

    let response = get(router, "/info").await;
    assert_eq!(response.status(), StatusCode::OK);

    let info: InfoResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(info.endpoints.len(), ENDPOINTS.len());
    assert!(info.endpoints.contains(&"POST /pdf/to-excel".to_string()));
}

#[tokio::test]
async fn test_pdf_to_excel_streams_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let (state, router) = test_state(test_config(dir.path()), fake_collaborators());

    let response = post_upload(router, "/pdf/to-excel", multipart_body("report.pdf", FAKE_PDF)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let disposition = disposition(&response);
    assert!(disposition.starts_with("attachment; filename=\"report_"), "{}", disposition);
    assert!(disposition.ends_with(".xlsx\""), "{}", disposition);
    assert_eq!(
        response.headers()["content-type"],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );

    let bytes = body_bytes(response).await;
    let mut workbook = Xlsx::new(Cursor::new(bytes)).unwrap();
    let range = workbook.worksheet_range("Sheet1").unwrap();
    assert_eq!(range.get_value((0, 0)), Some(&Data::String("Name".to_string())));
    assert_eq!(range.get_value((2, 1)), Some(&Data::String("5".to_string())));

    // Input and output stay on disk until their deletions fire.
    assert_eq!(entries(state.layout.root(Category::Upload)).len(), 1);
    assert_eq!(entries(state.layout.root(Category::Spreadsheet)).len(), 1);
    assert_eq!(state.scheduler.pending(), 2);
}

#[tokio::test]
async fn test_pdf_to_excel_without_tables() {
    let dir = tempfile::tempdir().unwrap();
    let collaborators = Collaborators {
        tables: Arc::new(FakeTables(Vec::new())),
        ..fake_collaborators()
    };
    let (state, router) = test_state(test_config(dir.path()), collaborators);

    let response = post_upload(router, "/pdf/to-excel", multipart_body("empty.pdf", FAKE_PDF)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_message(response).await, "No tables found in PDF.");

    assert!(entries(state.layout.root(Category::Spreadsheet)).is_empty());
    assert_eq!(state.scheduler.pending(), 1, "only the upload is scheduled");
}

#[tokio::test]
async fn test_non_pdf_upload_is_rejected_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let (state, router) = test_state(test_config(dir.path()), fake_collaborators());

    let response = post_upload(router, "/pdf/to-word", multipart_body("notes.txt", b"hello")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, NOT_A_PDF_MESSAGE);

    assert!(entries(state.layout.root(Category::Upload)).is_empty());
    assert_eq!(state.scheduler.pending(), 0);
}

#[tokio::test]
async fn test_uppercase_pdf_extension_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let (state, router) = test_state(test_config(dir.path()), fake_collaborators());

    let response = post_upload(router, "/pdf/to-word", multipart_body("SCAN.PDF", FAKE_PDF)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let uploads = entries(state.layout.root(Category::Upload));
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].ends_with(".pdf"), "{:?}", uploads);
}

#[tokio::test]
async fn test_missing_file_field_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (_state, router) = test_state(test_config(dir.path()), fake_collaborators());

    let response = post_upload(router, "/pdf/to-excel", multipart_field("document", "a.pdf", FAKE_PDF)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, NOT_A_PDF_MESSAGE);
}

#[tokio::test]
async fn test_pdf_to_word_streams_document() {
    let dir = tempfile::tempdir().unwrap();
    let (_state, router) = test_state(test_config(dir.path()), fake_collaborators());

    let response = post_upload(router, "/pdf/to-word", multipart_body("Quarterly Report.pdf", FAKE_PDF)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(disposition(&response).contains("Quarterly_Report_"));
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .contains("wordprocessingml")
    );
    assert_eq!(body_bytes(response).await, b"PK fake docx");
}

#[tokio::test]
async fn test_pdf_to_word_engine_failure_removes_output() {
    let dir = tempfile::tempdir().unwrap();
    let collaborators = Collaborators {
        documents: Arc::new(FakeDocuments {
            fail_with: Some("soffice exited with status 1"),
        }),
        ..fake_collaborators()
    };
    let (state, router) = test_state(test_config(dir.path()), collaborators);

    let response = post_upload(router, "/pdf/to-word", multipart_body("report.pdf", FAKE_PDF)).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        error_message(response).await,
        "Failed to convert PDF: soffice exited with status 1"
    );
    assert!(entries(state.layout.root(Category::Document)).is_empty());
}

#[tokio::test]
async fn test_pdf_to_image_returns_zip_of_pages() {
    let dir = tempfile::tempdir().unwrap();
    let (state, router) = test_state(test_config(dir.path()), fake_collaborators());

    let response = post_upload(router, "/pdf/to-image", multipart_body("report.pdf", FAKE_PDF)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/zip");

    let bytes = body_bytes(response).await;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["report_page_1.png", "report_page_2.png"]);

    let mut first = String::new();
    archive
        .by_name("report_page_1.png")
        .unwrap()
        .read_to_string(&mut first)
        .unwrap();
    assert_eq!(first, "png 1");

    // The session directory is gone; only the archive remains.
    let outputs = entries(state.layout.root(Category::ImageArchive));
    assert_eq!(outputs.len(), 1, "{:?}", outputs);
    assert!(outputs[0].starts_with("report_") && outputs[0].ends_with(".zip"));
}

#[tokio::test]
async fn test_pdf_to_image_without_pages() {
    let dir = tempfile::tempdir().unwrap();
    let collaborators = Collaborators {
        pages: Arc::new(FakePages::new(0)),
        ..fake_collaborators()
    };
    let (state, router) = test_state(test_config(dir.path()), collaborators);

    let response = post_upload(router, "/pdf/to-image", multipart_body("blank.pdf", FAKE_PDF)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_message(response).await, "No pages found in PDF.");
    assert!(entries(state.layout.root(Category::ImageArchive)).is_empty());
}

#[tokio::test]
async fn test_youtube_requires_url() {
    let dir = tempfile::tempdir().unwrap();
    let (state, router) = test_state(test_config(dir.path()), fake_collaborators());

    let response = get(router, "/youtube/download").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Missing 'url' query parameter.");
    assert!(entries(state.layout.root(Category::Video)).is_empty());
}

#[tokio::test]
async fn test_youtube_rejects_non_http_url() {
    let dir = tempfile::tempdir().unwrap();
    let (_state, router) = test_state(test_config(dir.path()), fake_collaborators());

    let response = get(router, "/youtube/download?url=file:///etc/passwd").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_youtube_streams_video() {
    let dir = tempfile::tempdir().unwrap();
    let video = Arc::new(FakeVideo::ok());
    let collaborators = Collaborators {
        video: video.clone(),
        ..fake_collaborators()
    };
    let (state, router) = test_state(test_config(dir.path()), collaborators);

    let response = get(router, "/youtube/download?url=https://www.youtube.com/watch%3Fv%3Dabc123").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(disposition(&response), "attachment; filename=\"abc123_Some_Title.mp4\"");
    assert_eq!(response.headers()["content-type"], "video/mp4");
    assert!(!body_bytes(response).await.is_empty());

    let seen = video.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].url, "https://www.youtube.com/watch?v=abc123");
    assert_eq!(seen[0].output_template, "%(id)s_%(title)s.%(ext)s");
    assert!(seen[0].output_dir.starts_with(state.layout.root(Category::Video)));
}

#[tokio::test]
async fn test_tiktok_failure_is_prefixed_and_cleaned_up() {
    let dir = tempfile::tempdir().unwrap();
    let collaborators = Collaborators {
        video: Arc::new(FakeVideo::failing("ERROR: Unsupported URL")),
        ..fake_collaborators()
    };
    let (state, router) = test_state(test_config(dir.path()), collaborators);

    let response = get(router, "/tiktok/download?url=https://www.tiktok.com/@user/video/1").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        error_message(response).await,
        "Failed to download TikTok video: ERROR: Unsupported URL"
    );
    assert!(entries(state.layout.root(Category::Video)).is_empty());
    assert_eq!(state.scheduler.pending(), 0);
}

#[tokio::test]
async fn test_tiktok_request_uses_retry_options() {
    let dir = tempfile::tempdir().unwrap();
    let video = Arc::new(FakeVideo::ok());
    let collaborators = Collaborators {
        video: video.clone(),
        ..fake_collaborators()
    };
    let (_state, router) = test_state(test_config(dir.path()), collaborators);

    let response = get(router, "/tiktok/download?url=https://www.tiktok.com/@user/video/1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let seen = video.seen.lock().unwrap();
    assert_eq!(seen[0].options.retries, Some(5));
    assert!(seen[0].options.skip_unavailable_fragments);
    assert!(seen[0].output_template.starts_with("tiktok_"));
}

#[tokio::test]
async fn test_legacy_mode_sends_errors_with_200() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.server.legacy_error_status = true;
    let (_state, router) = test_state(config, fake_collaborators());

    let response = post_upload(router, "/pdf/to-excel", multipart_body("notes.docx", b"PK")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(error_message(response).await, NOT_A_PDF_MESSAGE);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.server.max_request_body_bytes = 64;
    let (state, router) = test_state(config, fake_collaborators());

    let response = post_upload(router, "/pdf/to-excel", multipart_body("big.pdf", &[b'x'; 4096])).await;
    assert!(response.status().is_client_error() || response.status().is_server_error());
    assert_ne!(response.status(), StatusCode::OK);
    assert!(entries(state.layout.root(Category::Upload)).is_empty());
}
