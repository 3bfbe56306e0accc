//! Retry and error mapping against a mock server

#![allow(clippy::unwrap_used, clippy::panic)]

use opsdesk_api::{AdminCommand, AdminService, CommandOutcome, ServiceError};
use opsdesk_client::{ClientError, OpsdeskClient, RetryPolicy};
use opsdesk_core::config::ClientConfig;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FAST: RetryPolicy = RetryPolicy {
    max_retries: 3,
    initial_backoff_ms: 1,
    max_backoff_ms: 5,
};

fn client(server: &MockServer) -> OpsdeskClient {
    OpsdeskClient::new(&server.uri())
        .unwrap()
        .with_retry_policy(FAST)
}

fn draft_body() -> serde_json::Value {
    json!({
        "templateId": "tpl-welcome",
        "subject": "Welcome to Opsdesk, {{name}}",
        "body": "Hi {{name}}",
        "placeholders": ["name"]
    })
}

#[tokio::test]
async fn test_retries_server_errors_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/email-templates/tpl-welcome/draft"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/email-templates/tpl-welcome/draft"))
        .respond_with(ResponseTemplate::new(200).set_body_json(draft_body()))
        .expect(1)
        .mount(&server)
        .await;

    let draft = client(&server).template_draft("tpl-welcome").await.unwrap();

    assert_eq!(draft.template_id, "tpl-welcome");
    assert_eq!(draft.placeholders, vec!["name".to_string()]);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/email-templates/missing/draft"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "email template not found: missing",
            "code": "NOT_FOUND"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).template_draft("missing").await.unwrap_err();

    match err {
        ClientError::Status {
            status,
            code,
            message,
            ..
        } => {
            assert_eq!(status, 404);
            assert_eq!(code.as_deref(), Some("NOT_FOUND"));
            assert_eq!(message, "email template not found: missing");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_gives_up_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&server)
        .await;

    let policy = RetryPolicy {
        max_retries: 2,
        ..FAST
    };
    let err = client(&server)
        .with_retry_policy(policy)
        .health()
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_too_many_requests_honors_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/email-templates/tpl-welcome/draft"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/email-templates/tpl-welcome/draft"))
        .respond_with(ResponseTemplate::new(200).set_body_json(draft_body()))
        .expect(1)
        .mount(&server)
        .await;

    let draft = client(&server).template_draft("tpl-welcome").await.unwrap();
    assert_eq!(draft.subject, "Welcome to Opsdesk, {{name}}");
}

#[tokio::test]
async fn test_malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/email-templates/tpl-welcome/draft"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).template_draft("tpl-welcome").await.unwrap_err();
    assert!(matches!(err, ClientError::Decode { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_admin_service_posts_commands() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/commands"))
        .and(body_partial_json(json!({"type": "deleteEvent", "id": "ev-2"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"outcome": "eventDeleted", "id": "ev-2"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let service: &dyn AdminService = &client(&server);
    let outcome = service
        .execute(AdminCommand::DeleteEvent {
            id: "ev-2".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CommandOutcome::EventDeleted {
            id: "ev-2".to_string()
        }
    );
}

#[tokio::test]
async fn test_admin_service_maps_rejections() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/commands"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "user not found: u-404",
            "code": "NOT_FOUND"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .execute(AdminCommand::DeleteUser {
            id: "u-404".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(err, ServiceError::not_found("user", "u-404"));
}

#[tokio::test]
async fn test_unreachable_server_is_unavailable() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let client = OpsdeskClient::new(&uri).unwrap().with_retry_policy(RetryPolicy {
        max_retries: 1,
        ..FAST
    });
    let err = client
        .execute(AdminCommand::DeleteEvent {
            id: "ev-1".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Unavailable { .. }));
}

#[tokio::test]
async fn test_commands_are_not_retried_after_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/commands"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .execute(AdminCommand::DeleteEmail {
            id: "em-1".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Unavailable { .. }));
}

#[tokio::test]
async fn test_timed_out_command_is_sent_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/commands"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"outcome": "emailDeleted", "id": "em-1", "permanent": false}))
                .set_delay(Duration::from_millis(1500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = OpsdeskClient::from_config(&ClientConfig {
        base_url: server.uri(),
        timeout_secs: 1,
        max_retries: 2,
        ..ClientConfig::default()
    })
    .unwrap()
    .with_retry_policy(FAST);

    let err = client
        .command(&AdminCommand::DeleteEmail {
            id: "em-1".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(&err, ClientError::Transport(inner) if inner.is_timeout()));
}

#[tokio::test]
async fn test_timed_out_read_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(1500)))
        .expect(2)
        .mount(&server)
        .await;

    let client = OpsdeskClient::from_config(&ClientConfig {
        base_url: server.uri(),
        timeout_secs: 1,
        ..ClientConfig::default()
    })
    .unwrap()
    .with_retry_policy(RetryPolicy {
        max_retries: 1,
        ..FAST
    });

    let err = client.health().await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_dropped_connection_is_not_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        loop {
            let (mut socket, _) = listener.accept().await.unwrap();
            counter.fetch_add(1, Ordering::SeqCst);
            let mut buf = [0_u8; 1024];
            let _ = socket.read(&mut buf).await;
            drop(socket);
        }
    });

    let err = OpsdeskClient::new(&format!("http://{addr}"))
        .unwrap()
        .with_retry_policy(FAST)
        .health()
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Transport(_)));
    assert!(!err.is_retryable());
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}
