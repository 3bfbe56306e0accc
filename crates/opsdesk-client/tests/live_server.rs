//! Client against the real API router on a local socket

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]

use opsdesk_api::billing::CheckoutRequest;
use opsdesk_api::{AdminCommand, AdminService, AppState, CommandOutcome, ServiceError, build_router_with_state};
use opsdesk_client::{OpsdeskClient, RetryPolicy};
use opsdesk_core::Config;
use opsdesk_core::types::{BillingCycle, EmailFolder, LogStatus, PlanTier};
use opsdesk_protocol::activity::Selection;
use opsdesk_protocol::{ActivityFilter, ExportFormat};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::net::TcpListener;

async fn spawn_server() -> (OpsdeskClient, Arc<AppState>) {
    let state = Arc::new(AppState::new(Config::default()).unwrap());
    let app = build_router_with_state(Arc::clone(&state));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = OpsdeskClient::new(&format!("http://{addr}"))
        .unwrap()
        .with_retry_policy(RetryPolicy::none());
    (client, state)
}

#[tokio::test]
async fn test_health_reports_seeded_stores() {
    let (client, state) = spawn_server().await;

    let health = client.health().await.unwrap();

    assert_eq!(health.status, "healthy");
    assert_eq!(health.stores, state.stores.counts());
}

#[tokio::test]
async fn test_filtered_activity_logs() {
    let (client, _state) = spawn_server().await;
    let filter = ActivityFilter {
        status: Selection::Only(LogStatus::Failed),
        ..ActivityFilter::default()
    };

    let response = client.activity_logs(&filter).await.unwrap();

    assert_eq!(response.logs.len(), 3);
    assert!(response.logs.iter().all(|log| log.status == LogStatus::Failed));
    assert_eq!(response.summary.failed, 3);

    let one = client.activity_log(&response.logs[0].id).await.unwrap();
    assert_eq!(one, response.logs[0]);
}

#[tokio::test]
async fn test_export_download() {
    let (client, _state) = spawn_server().await;

    let download = client
        .export_activity_logs(&ActivityFilter::default(), ExportFormat::Csv)
        .await
        .unwrap();

    let filename = download.filename.unwrap();
    assert!(filename.starts_with("activity-logs-"));
    assert!(filename.ends_with(".csv"));
    assert!(download.content_type.unwrap().starts_with("text/csv"));
    assert_eq!(download.content.lines().count(), 13);
}

#[tokio::test]
async fn test_read_only_views() {
    let (client, _state) = spawn_server().await;

    let analytics = client.kpis().await.unwrap();
    assert_eq!(analytics.days, 30);

    let month = client.calendar_month(2024, 2).await.unwrap();
    assert_eq!(month.days.len(), 42);

    let err = client.calendar_month(2024, 13).await.unwrap_err();
    assert_eq!(err.status(), Some(400));

    let inbox = client.emails(EmailFolder::Inbox, "").await.unwrap();
    assert_eq!(inbox.emails.len(), 2);
    let found = client.emails(EmailFolder::Inbox, "quarterly").await.unwrap();
    assert_eq!(found.emails.len(), 1);

    let summary = client.billing_summary().await.unwrap();
    assert_eq!(summary.mrr["USD"], Decimal::new(53_550, 2));
}

#[tokio::test]
async fn test_checkout_rejects_free_plan() {
    let (client, _state) = spawn_server().await;
    let mut request = CheckoutRequest {
        plan: PlanTier::Pro,
        billing_cycle: BillingCycle::Monthly,
        customer_email: "ada@example.com".to_string(),
    };

    let redirect = client.checkout_session(&request).await.unwrap();
    assert!(redirect.url.contains("plan=pro"));

    request.plan = PlanTier::Free;
    let err = client.checkout_session(&request).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn test_commands_change_server_state() {
    let (client, state) = spawn_server().await;

    let outcome = client
        .execute(AdminCommand::SetFeatureFlag {
            key: "email.templates".to_string(),
            enabled: true,
        })
        .await
        .unwrap();

    match outcome {
        CommandOutcome::FeatureFlagSet { flag } => assert!(flag.enabled),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(state.stores.flags.get("email.templates").unwrap().enabled);

    let err = client
        .execute(AdminCommand::DeleteUser {
            id: "u-404".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::not_found("user", "u-404"));
}

#[tokio::test]
async fn test_delete_email_command_moves_to_trash_once() {
    let (client, state) = spawn_server().await;
    let client = client.with_retry_policy(RetryPolicy::default());

    let outcome = client
        .execute(AdminCommand::DeleteEmail {
            id: "em-1".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CommandOutcome::EmailDeleted {
            id: "em-1".to_string(),
            permanent: false,
        }
    );
    assert_eq!(state.stores.emails.get("em-1").unwrap().folder, EmailFolder::Trash);
}
