//! Tests for the HTTP conversion and e-signature clients against mock
//! servers. The clients are blocking, so the mock server is started on its
//! own runtime and the client is called from the test thread.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use subsign::conversion::{ConversionClientError, Converter, HttpConverter};
use subsign::esign::{
    Correlation, HttpSignatureService, SignatureRequestSpec, SignatureService,
    SignatureServiceError,
};
use subsign::model::{PositionSlot, SignerRole};

fn spec() -> SignatureRequestSpec {
    SignatureRequestSpec {
        document_url: "https://files.portal.test/objects/subs/1/pack.pdf?token=abc".to_string(),
        signer_name: "Member Two".to_string(),
        signer_email: "two@acme.test".to_string(),
        role: SignerRole::Investor,
        position_slot: PositionSlot::Investor(2),
        correlation: Correlation {
            document_id: "doc-1".to_string(),
            subscription_id: "sub-1".to_string(),
            signer_ref: "m2".to_string(),
        },
    }
}

/// Starts a mock server with `mocks` mounted. The runtime must outlive the
/// server.
fn start_server(mocks: Vec<Mock>) -> (tokio::runtime::Runtime, MockServer) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt.block_on(async {
        let server = MockServer::start().await;
        for mock in mocks {
            mock.mount(&server).await;
        }
        server
    });
    (rt, server)
}

fn esign_client(base_url: String) -> HttpSignatureService {
    HttpSignatureService::new(
        base_url,
        SecretString::from("test-api-key".to_string()),
        Duration::from_secs(5),
    )
    .unwrap()
}

// ── E-signature client ──

#[test]
fn test_create_request_posts_spec_with_bearer_auth() {
    let (_rt, server) = start_server(vec![Mock::given(method("POST"))
        .and(path("/v1/signature-requests"))
        .and(header("authorization", "Bearer test-api-key"))
        .and(body_partial_json(json!({
            "signer_email": "two@acme.test",
            "role": "investor",
            "position_slot": "party_a_2",
            "correlation": { "document_id": "doc-1", "signer_ref": "m2" }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "sr_123",
            "signing_token": "tok_abc",
            "status": "pending"
        })))
        .expect(1)]);

    let client = esign_client(server.uri());
    let created = client.create_request(&spec()).unwrap();

    assert_eq!(created.request_id, "sr_123");
    assert_eq!(created.token, "tok_abc");
}

#[test]
fn test_create_request_surfaces_status_and_body() {
    let (_rt, server) = start_server(vec![Mock::given(method("POST"))
        .and(path("/v1/signature-requests"))
        .respond_with(ResponseTemplate::new(422).set_body_string("recipient email bounced"))]);

    let client = esign_client(format!("{}/", server.uri()));
    let err = client.create_request(&spec()).unwrap_err();

    match err {
        SignatureServiceError::Status { status, body } => {
            assert_eq!(status, 422);
            assert!(body.contains("bounced"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[test]
fn test_create_request_rejects_empty_token() {
    let (_rt, server) = start_server(vec![Mock::given(method("POST"))
        .and(path("/v1/signature-requests"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "sr_1", "signing_token": "" })),
        )]);

    let client = esign_client(server.uri());
    let err = client.create_request(&spec()).unwrap_err();

    assert!(matches!(err, SignatureServiceError::InvalidResponse(_)));
}

#[test]
fn test_create_request_rejects_malformed_json() {
    let (_rt, server) = start_server(vec![Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))]);

    let client = esign_client(server.uri());
    let err = client.create_request(&spec()).unwrap_err();

    assert!(matches!(err, SignatureServiceError::InvalidResponse(_)));
}

// ── Conversion client ──

#[test]
fn test_convert_uploads_file_and_returns_pdf() {
    let (_rt, server) = start_server(vec![Mock::given(method("POST"))
        .and(path("/forms/libreoffice/convert"))
        .and(body_string_contains("filename=\"pack.docx\""))
        .and(body_string_contains("name=\"files\""))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.7 converted".to_vec()),
        )
        .expect(1)]);

    let converter = HttpConverter::new(server.uri(), Duration::from_secs(5)).unwrap();
    let pdf = converter.convert(b"docx bytes", "pack.docx").unwrap();

    assert!(pdf.starts_with(b"%PDF-"));
}

#[test]
fn test_convert_rejects_non_pdf_output() {
    let (_rt, server) = start_server(vec![Mock::given(method("POST"))
        .and(path("/forms/libreoffice/convert"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not a pdf"))]);

    let converter = HttpConverter::new(server.uri(), Duration::from_secs(5)).unwrap();
    let err = converter.convert(b"docx", "pack.docx").unwrap_err();

    assert!(matches!(err, ConversionClientError::NotPdf { len: 9 }));
}

#[test]
fn test_convert_surfaces_service_error() {
    let (_rt, server) = start_server(vec![Mock::given(method("POST"))
        .and(path("/forms/libreoffice/convert"))
        .respond_with(ResponseTemplate::new(503).set_body_string("renderer busy"))]);

    let converter = HttpConverter::new(server.uri(), Duration::from_secs(5)).unwrap();
    let err = converter.convert(b"docx", "pack.doc").unwrap_err();

    match err {
        ConversionClientError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "renderer busy");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}
