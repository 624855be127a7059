mod support;

use std::fs;
use std::time::Duration;

use healthguard::diagnosis::client::{IMAGE_FIELD, IMAGE_FILENAME, IMAGE_MIME};
use healthguard::{
    ClientConfig, DiagnosisConnector, ImageReference, SubmissionClient, SubmitError, TaskId,
};
use support::{closed_port_url, write_jpeg, StubResponse, StubServer};

fn client_for(url: &str) -> SubmissionClient {
    SubmissionClient::new(ClientConfig::new(url).unwrap()).unwrap()
}

fn diabetes() -> TaskId {
    TaskId::new("diabetes").unwrap()
}

#[test]
fn posts_multipart_image_and_parses_result() {
    let server = StubServer::start(vec![StubResponse::json(
        200,
        r#"{"task":"diabetes","score":0.875,"diagnosis":"positive","confidence":87.5}"#,
    )]);
    let dir = tempfile::tempdir().unwrap();
    let image = write_jpeg(dir.path(), "eye.jpg");
    let bytes = fs::read(&image).unwrap();

    let result = client_for(&server.url)
        .submit(&diabetes(), ImageReference::new(&image))
        .unwrap();

    assert_eq!(result.diagnosis, "positive");
    assert_eq!(result.confidence, 87.5);
    assert_eq!(result.score, Some(0.875));
    assert_eq!(result.display_text(), "Diagnostic : positive (87.5%)");

    let request = server.next_request();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/predict/diabetes");
    assert!(request
        .header("content-type")
        .unwrap()
        .starts_with("multipart/form-data; boundary="));

    let parts = request.multipart_parts();
    assert_eq!(parts.len(), 1);
    let disposition = parts[0].header("content-disposition").unwrap();
    assert!(disposition.contains(&format!("name=\"{IMAGE_FIELD}\"")));
    assert!(disposition.contains(&format!("filename=\"{IMAGE_FILENAME}\"")));
    assert_eq!(parts[0].header("content-type"), Some(IMAGE_MIME));
    assert_eq!(parts[0].data, bytes);
}

#[test]
fn part_metadata_does_not_depend_on_the_source_file() {
    // Arbitrary bytes under an unrelated name still go out as image.jpg.
    let server = StubServer::start(vec![StubResponse::json(
        200,
        r#"{"diagnosis":"negative","confidence":4.2}"#,
    )]);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("IMG_0042.bin");
    let bytes: Vec<u8> = (0..=255u8).cycle().take(3000).collect();
    fs::write(&path, &bytes).unwrap();

    client_for(&server.url)
        .submit(&diabetes(), ImageReference::new(&path))
        .unwrap();

    let parts = server.next_request().multipart_parts();
    assert_eq!(parts.len(), 1);
    let disposition = parts[0].header("content-disposition").unwrap();
    assert!(disposition.contains("name=\"image\""));
    assert!(disposition.contains("filename=\"image.jpg\""));
    assert!(!disposition.contains("IMG_0042"));
    assert_eq!(parts[0].header("content-type"), Some("image/jpeg"));
    assert_eq!(parts[0].data, bytes);
}

#[test]
fn http_500_is_a_server_error() {
    let server = StubServer::start(vec![StubResponse::json(500, r#"{"error":"Modèle inconnu"}"#)]);
    let dir = tempfile::tempdir().unwrap();
    let image = write_jpeg(dir.path(), "eye.jpg");

    let err = client_for(&server.url)
        .submit(&TaskId::new("retinopathy").unwrap(), ImageReference::new(image))
        .unwrap_err();

    match err {
        SubmitError::Server { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message.as_deref(), Some("Modèle inconnu"));
        }
        other => panic!("expected server error, got {other:?}"),
    }
    assert_eq!(server.next_request().path, "/predict/retinopathy");
}

#[test]
fn http_400_without_json_body_keeps_status() {
    let server = StubServer::start(vec![StubResponse::text(400, "")]);
    let dir = tempfile::tempdir().unwrap();
    let image = write_jpeg(dir.path(), "eye.jpg");

    let err = client_for(&server.url)
        .submit(&diabetes(), ImageReference::new(image))
        .unwrap_err();
    assert_eq!(err.status_code(), Some(400));
}

#[test]
fn non_json_200_is_a_decode_error() {
    let server = StubServer::start(vec![StubResponse::text(200, "<html>It works!</html>")]);
    let dir = tempfile::tempdir().unwrap();
    let image = write_jpeg(dir.path(), "eye.jpg");

    let err = client_for(&server.url)
        .submit(&diabetes(), ImageReference::new(image))
        .unwrap_err();
    assert!(matches!(err, SubmitError::Decode(_)), "got {err:?}");
}

#[test]
fn json_without_diagnosis_is_a_decode_error() {
    let server = StubServer::start(vec![StubResponse::json(200, r#"{"status":"ok"}"#)]);
    let dir = tempfile::tempdir().unwrap();
    let image = write_jpeg(dir.path(), "eye.jpg");

    let err = client_for(&server.url)
        .submit(&diabetes(), ImageReference::new(image))
        .unwrap_err();
    assert!(matches!(err, SubmitError::Decode(_)), "got {err:?}");
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_jpeg(dir.path(), "eye.jpg");

    let err = client_for(&closed_port_url())
        .submit(&diabetes(), ImageReference::new(image))
        .unwrap_err();
    assert!(matches!(err, SubmitError::Transport(_)), "got {err:?}");
}

#[test]
fn silent_server_times_out() {
    let server = StubServer::start(vec![StubResponse::Hang(Duration::from_secs(3))]);
    let dir = tempfile::tempdir().unwrap();
    let image = write_jpeg(dir.path(), "eye.jpg");

    let config = ClientConfig::new(&server.url)
        .unwrap()
        .with_timeout(Duration::from_millis(500));
    let err = SubmissionClient::new(config)
        .unwrap()
        .submit(&diabetes(), ImageReference::new(image))
        .unwrap_err();
    match err {
        SubmitError::Transport(e) => assert!(e.is_timeout(), "expected timeout, got {e}"),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[test]
fn every_submit_is_a_fresh_request() {
    let body = r#"{"diagnosis":"negative","confidence":10}"#;
    let server = StubServer::start(vec![
        StubResponse::json(200, body),
        StubResponse::json(200, body),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let client = client_for(&server.url);

    for name in ["a.jpg", "b.jpg"] {
        let image = write_jpeg(dir.path(), name);
        client.submit(&diabetes(), ImageReference::new(image)).unwrap();
    }
    server.next_request();
    server.next_request();
}

#[test]
fn health_check() {
    let server = StubServer::start(vec![StubResponse::json(200, r#"{"status":"ok"}"#)]);
    let health = client_for(&server.url).health().unwrap();
    assert!(health.is_ok());

    let request = server.next_request();
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/health");
}

#[test]
fn health_check_on_unreachable_server() {
    let err = client_for(&closed_port_url()).health().unwrap_err();
    assert!(matches!(err, SubmitError::Transport(_)));
}
