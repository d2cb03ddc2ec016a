//! Upload Pipeline Integration Tests
//!
//! Drives `Uploader::upload` end to end against a wiremock server.
//!
//! ## Test Coverage
//!
//! - Fallback for disabled, unconfigured, oversized and non-image files
//! - Request shape for multipart, json and binary bodies
//! - Static header handling
//! - Failure for non-2xx, timeout, oversized responses and bad rules
//! - URL extraction via json and regex rules

mod tests {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use image_uploadr::config::UploadConfig;
    use image_uploadr::upload::encoder::MULTIPART_BOUNDARY;
    use image_uploadr::upload::{upload_blocking, UploadOutcome, Uploader};
    use serde_json::json;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::{Builder, NamedTempFile};
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Minimal PNG signature followed by an IHDR chunk header
    const PNG_BYTES: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00,
    ];

    fn png_file() -> NamedTempFile {
        file_with(".png", PNG_BYTES)
    }

    fn file_with(suffix: &str, data: &[u8]) -> NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();
        file
    }

    fn config_for(server: &MockServer) -> UploadConfig {
        UploadConfig {
            enabled: true,
            url: Some(format!("{}/upload", server.uri())),
            field: "image".into(),
            response_path: "json:$.data.link".into(),
            timeout_secs: 10,
            ..Default::default()
        }
    }

    fn link_response() -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_json(json!({"data": {"link": "https://i.example.com/a.png"}}))
    }

    // ========================================================================
    // TEST: Fallback paths
    // ========================================================================

    #[tokio::test]
    async fn test_disabled_falls_back_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(link_response())
            .expect(0)
            .mount(&server)
            .await;

        let config = UploadConfig {
            enabled: false,
            ..config_for(&server)
        };
        let uploader = Uploader::new(config).unwrap();

        let file = png_file();
        assert_eq!(uploader.upload(file.path()).await, UploadOutcome::Fallback);
        assert_eq!(
            uploader.upload("/no/such/file.png").await,
            UploadOutcome::Fallback
        );
    }

    #[tokio::test]
    async fn test_missing_url_falls_back() {
        let config = UploadConfig {
            enabled: true,
            url: None,
            ..Default::default()
        };
        let uploader = Uploader::new(config).unwrap();
        let file = png_file();
        assert_eq!(uploader.upload(file.path()).await, UploadOutcome::Fallback);
    }

    #[tokio::test]
    async fn test_oversized_file_falls_back_never_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let mut data = PNG_BYTES.to_vec();
        data.resize(1024 * 1024 + 1, 0);
        let file = file_with(".png", &data);

        let config = UploadConfig {
            max_size_mib: 1,
            ..config_for(&server)
        };
        let uploader = Uploader::new(config).unwrap();
        assert_eq!(uploader.upload(file.path()).await, UploadOutcome::Fallback);
    }

    #[tokio::test]
    async fn test_non_image_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(link_response())
            .expect(0)
            .mount(&server)
            .await;

        let file = file_with(".txt", b"plain text, not an image");
        let uploader = Uploader::new(config_for(&server)).unwrap();
        assert_eq!(uploader.upload(file.path()).await, UploadOutcome::Fallback);
    }

    // ========================================================================
    // TEST: Wire formats
    // ========================================================================

    #[tokio::test]
    async fn test_multipart_upload_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header(
                "content-type",
                format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY).as_str(),
            ))
            .respond_with(link_response())
            .expect(1)
            .mount(&server)
            .await;

        let file = png_file();
        let uploader = Uploader::new(config_for(&server)).unwrap();
        let outcome = uploader.upload(file.path()).await;

        assert_eq!(
            outcome,
            UploadOutcome::Success("https://i.example.com/a.png".into())
        );

        // Exactly one part, carrying the file name and the exact bytes
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body = &requests[0].body;
        let delimiter = format!("--{}", MULTIPART_BOUNDARY);
        let text = String::from_utf8_lossy(body);
        assert_eq!(text.matches(&delimiter).count(), 2);

        let file_name = file.path().file_name().unwrap().to_string_lossy();
        let disposition = format!(
            "Content-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\n",
            file_name
        );
        assert!(text.contains(&disposition));

        let head_end = find(body, b"\r\n\r\n").unwrap() + 4;
        let tail = format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY);
        assert!(body.ends_with(tail.as_bytes()));
        assert_eq!(&body[head_end..body.len() - tail.len()], PNG_BYTES);
    }

    #[tokio::test]
    async fn test_json_upload_sends_base64() {
        let server = MockServer::start().await;

        let expected = format!("{{\"image\":\"{}\"}}", STANDARD.encode(PNG_BYTES));
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header("content-type", "application/json"))
            .and(body_bytes(expected.into_bytes()))
            .respond_with(link_response())
            .expect(1)
            .mount(&server)
            .await;

        let config = UploadConfig {
            format: "json".into(),
            ..config_for(&server)
        };
        let uploader = Uploader::new(config).unwrap();
        let file = png_file();
        assert!(uploader.upload(file.path()).await.is_success());
    }

    #[tokio::test]
    async fn test_binary_upload_sends_raw_bytes() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header("content-type", "application/octet-stream"))
            .and(header("content-length", PNG_BYTES.len().to_string().as_str()))
            .and(body_bytes(PNG_BYTES.to_vec()))
            .respond_with(ResponseTemplate::new(200).set_body_string("https://e.com/raw.png\n"))
            .expect(1)
            .mount(&server)
            .await;

        let config = UploadConfig {
            format: "binary".into(),
            response_path: "regex:https://.*".into(),
            ..config_for(&server)
        };
        let uploader = Uploader::new(config).unwrap();
        let file = png_file();
        assert_eq!(
            uploader.upload(file.path()).await,
            UploadOutcome::Success("https://e.com/raw.png".into())
        );
    }

    #[tokio::test]
    async fn test_unsupported_format_fails_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(link_response())
            .expect(0)
            .mount(&server)
            .await;

        let config = UploadConfig {
            format: "xml".into(),
            ..config_for(&server)
        };
        let uploader = Uploader::new(config).unwrap();
        let file = png_file();
        match uploader.upload(file.path()).await {
            UploadOutcome::Failure(message) => assert!(message.contains("xml")),
            other => panic!("Expected failure, got {:?}", other),
        }
    }

    // ========================================================================
    // TEST: Headers
    // ========================================================================

    #[tokio::test]
    async fn test_static_headers_are_sent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("authorization", "Bearer token-123"))
            .and(header("x-api-key", "abc:def"))
            .respond_with(link_response())
            .expect(1)
            .mount(&server)
            .await;

        let config = UploadConfig {
            headers: vec![
                "Authorization:   Bearer token-123  ".into(),
                "X-Api-Key: abc:def".into(),
                "not a header".into(),
                "X-Empty:".into(),
                ": no-name".into(),
            ],
            ..config_for(&server)
        };
        let uploader = Uploader::new(config).unwrap();
        let file = png_file();
        assert!(uploader.upload(file.path()).await.is_success());
    }

    // ========================================================================
    // TEST: Failure paths
    // ========================================================================

    #[tokio::test]
    async fn test_non_2xx_is_failure() {
        for status in [400u16, 401, 404, 500, 503] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(
                    ResponseTemplate::new(status)
                        .set_body_json(json!({"data": {"link": "https://i.example.com/a.png"}})),
                )
                .mount(&server)
                .await;

            let uploader = Uploader::new(config_for(&server)).unwrap();
            let file = png_file();
            match uploader.upload(file.path()).await {
                UploadOutcome::Failure(message) => {
                    assert!(message.contains(&status.to_string()), "{}", message)
                }
                other => panic!("Expected failure for {}, got {:?}", status, other),
            }
        }
    }

    #[tokio::test]
    async fn test_created_status_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"data": {"link": "https://i.example.com/c.png"}})),
            )
            .mount(&server)
            .await;

        let uploader = Uploader::new(config_for(&server)).unwrap();
        let file = png_file();
        assert_eq!(
            uploader.upload(file.path()).await.url(),
            Some("https://i.example.com/c.png")
        );
    }

    #[tokio::test]
    async fn test_slow_response_is_timeout_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(link_response().set_delay(Duration::from_millis(1500)))
            .mount(&server)
            .await;

        let config = UploadConfig {
            timeout_secs: 1,
            ..config_for(&server)
        };
        let uploader = Uploader::new(config).unwrap();
        let file = png_file();
        match uploader.upload(file.path()).await {
            UploadOutcome::Failure(message) => assert!(message.contains("timed out"), "{}", message),
            other => panic!("Expected timeout failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_huge_timeout_means_no_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(link_response())
            .expect(1)
            .mount(&server)
            .await;

        let config = UploadConfig {
            timeout_secs: u64::MAX,
            ..config_for(&server)
        };
        let uploader = Uploader::new(config).unwrap();
        let file = png_file();
        assert_eq!(
            uploader.upload(file.path()).await,
            UploadOutcome::Success("https://i.example.com/a.png".into())
        );
    }

    #[tokio::test]
    async fn test_oversized_response_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'a'; 1024 * 1024 + 1]))
            .mount(&server)
            .await;

        let uploader = Uploader::new(config_for(&server)).unwrap();
        let file = png_file();
        assert!(uploader.upload(file.path()).await.is_failure());
    }

    #[tokio::test]
    async fn test_extraction_errors_are_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
            .mount(&server)
            .await;

        let file = png_file();
        for rule in ["json:$.data.link", "json:$.id", "regex:\\S+", "xpath:/a", "regex:https://.*"] {
            let config = UploadConfig {
                response_path: rule.into(),
                ..config_for(&server)
            };
            let uploader = Uploader::new(config).unwrap();
            let outcome = uploader.upload(file.path()).await;
            assert!(outcome.is_failure(), "rule {} gave {:?}", rule, outcome);
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_failure() {
        let config = UploadConfig {
            enabled: true,
            url: Some("http://127.0.0.1:9/upload".into()),
            ..Default::default()
        };
        let uploader = Uploader::new(config).unwrap();
        let file = png_file();
        assert!(uploader.upload(file.path()).await.is_failure());
    }

    #[tokio::test]
    async fn test_malformed_url_is_failure() {
        let config = UploadConfig {
            enabled: true,
            url: Some("::not-a-url::".into()),
            ..Default::default()
        };
        let uploader = Uploader::new(config).unwrap();
        let file = png_file();
        assert!(uploader.upload(file.path()).await.is_failure());
    }

    // ========================================================================
    // TEST: Blocking entry point
    // ========================================================================

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upload_blocking_from_plain_thread() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(link_response())
            .expect(1)
            .mount(&server)
            .await;

        let config = config_for(&server);
        let file = png_file();
        let path = file.path().to_path_buf();

        let outcome = std::thread::spawn(move || upload_blocking(&config, &path))
            .join()
            .unwrap();
        assert_eq!(
            outcome,
            UploadOutcome::Success("https://i.example.com/a.png".into())
        );
    }

    // ========================================================================
    // TEST: Span fields
    // ========================================================================

    #[derive(Clone, Default)]
    struct SharedBuf(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_upload_span_records_size() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(link_response())
            .mount(&server)
            .await;

        let logs = SharedBuf::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let uploader = Uploader::new(config_for(&server)).unwrap();
        let file = png_file();
        assert!(uploader.upload(file.path()).await.is_success());

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(
            output.contains(&format!("upload.size={}", PNG_BYTES.len())),
            "{}",
            output
        );
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack
            .windows(needle.len())
            .position(|window| window == needle)
    }
}
