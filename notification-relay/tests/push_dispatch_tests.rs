//! Push Dispatcher Tests

mod common;

use common::{bad_token_error, socket_error, FakeGateway, TOPIC};
use notification_relay::error::RelayError;
use notification_relay::notification::NotificationKind;
use notification_relay::push::{BatchReport, PushDispatcher};
use notification_relay::schemas::{PushPayload, PushRequest};
use std::sync::Arc;
use std::time::Duration;

fn request(tokens: &[&str], kind: &str) -> PushRequest {
    PushRequest {
        tokens: Some(tokens.iter().map(|t| t.to_string()).collect()),
        payload: None,
        kind: Some(kind.to_string()),
    }
}

#[tokio::test]
async fn test_silent_batch_sends_background_pushes() {
    let gateway = Arc::new(FakeGateway::accepting());
    let dispatcher = PushDispatcher::new(gateway.clone(), TOPIC, 8);

    let report = dispatcher
        .dispatch(&request(&["tokA", "tokB"], "silent"))
        .await
        .unwrap();

    assert_eq!(
        report,
        BatchReport {
            delivered: 2,
            retried: 0,
            failed: 0,
        }
    );

    let mut tokens: Vec<String> = gateway.sent().into_iter().map(|n| n.device_token).collect();
    tokens.sort();
    assert_eq!(tokens, vec!["tokA".to_string(), "tokB".to_string()]);
    assert!(gateway.sent().iter().all(|n| n.kind == NotificationKind::Silent));
    assert!(gateway.sent().iter().all(|n| n.topic == TOPIC));
}

#[tokio::test]
async fn test_alert_title_with_default_body() {
    let gateway = Arc::new(FakeGateway::accepting());
    let dispatcher = PushDispatcher::new(gateway.clone(), TOPIC, 8);

    let mut req = request(&["tokA"], "alert");
    req.payload = Some(PushPayload {
        title: Some("Hi".to_string()),
        body: None,
    });

    dispatcher.dispatch(&req).await.unwrap();

    let sent = gateway.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].kind,
        NotificationKind::Alert {
            title: "Hi".to_string(),
            body: "Event changed".to_string(),
            sound: "default".to_string(),
        }
    );
}

#[tokio::test]
async fn test_empty_tokens_sends_nothing() {
    let gateway = Arc::new(FakeGateway::accepting());
    let dispatcher = PushDispatcher::new(gateway.clone(), TOPIC, 8);

    let result = dispatcher.dispatch(&request(&[], "silent")).await;

    assert!(matches!(result, Err(RelayError::MissingTokens)));
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn test_all_failures_still_settle_the_batch() {
    let gateway = Arc::new(FakeGateway::failing(bad_token_error()));
    let dispatcher = PushDispatcher::new(gateway.clone(), TOPIC, 8);

    let report = dispatcher
        .dispatch(&request(&["a", "b", "c"], "alert"))
        .await
        .unwrap();

    assert_eq!(report.failed, 3);
    assert_eq!(report.total(), 3);
    assert_eq!(gateway.calls(), 3);
}

#[tokio::test]
async fn test_transient_failures_retried_per_token() {
    let gateway = Arc::new(FakeGateway::failing(socket_error()));
    let dispatcher = PushDispatcher::new(gateway.clone(), TOPIC, 8);

    let report = dispatcher
        .dispatch(&request(&["a", "b"], "silent"))
        .await
        .unwrap();

    assert_eq!(report.failed, 2);
    // 1 original + 1 retry for each token
    assert_eq!(gateway.calls(), 4);
}

#[tokio::test]
async fn test_mixed_outcomes_counted() {
    let gateway = Arc::new(FakeGateway::scripted(
        vec![Err(socket_error()), Ok(()), Err(bad_token_error())],
        Ok(()),
    ));
    // Sequential so the script is consumed in token order
    let dispatcher = PushDispatcher::new(gateway.clone(), TOPIC, 1);

    let report = dispatcher
        .dispatch(&request(&["a", "b", "c"], "alert"))
        .await
        .unwrap();

    assert_eq!(
        report,
        BatchReport {
            delivered: 1,
            retried: 1,
            failed: 1,
        }
    );
    assert_eq!(gateway.calls(), 4);
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let gateway = Arc::new(FakeGateway::accepting().with_delay(Duration::from_millis(20)));
    let dispatcher = PushDispatcher::new(gateway.clone(), TOPIC, 3);

    let tokens: Vec<String> = (0..12).map(|i| format!("tok{}", i)).collect();
    let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();

    let report = dispatcher.dispatch(&request(&tokens, "silent")).await.unwrap();

    assert_eq!(report.delivered, 12);
    assert!(gateway.max_in_flight() <= 3);
    assert!(gateway.max_in_flight() > 1);
}
