use herald::integration::panic;
use herald::{Context, DeliveryResult, Notifier, NotifierConfig, RawFault};
use pretty_assertions::assert_eq;
use std::thread;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn reconcile() {
    panic!("ledger out of balance");
}

fn give_up() {
    panic!("runtime thread gave up");
}

async fn expect_report(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(body_partial_json(body))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn panics_are_reported_before_the_previous_hook_runs() {
    // Given
    let server = MockServer::start().await;
    expect_report(&server, serde_json::json!({"kind": "Warmup"})).await;
    expect_report(
        &server,
        serde_json::json!({
            "kind": "panic",
            "message": "runtime thread gave up",
            "tag": "panic",
        }),
    )
    .await;
    expect_report(
        &server,
        serde_json::json!({
            "kind": "panic",
            "message": "ledger out of balance",
            "tag": "panic",
            "context": {"panic.thread": "reconciler"},
        }),
    )
    .await;
    let config = NotifierConfig::new(format!("{}/reports", server.uri()), "test-key")
        .with_environment("test")
        .with_max_retries(0);
    let notifier = Notifier::builder(config).build().unwrap();
    let warmup = notifier
        .notify_sync(&RawFault::new("Warmup", "open a connection"), Context::new())
        .await;
    panic::install(notifier.clone(), Duration::from_secs(2));

    // When
    let on_runtime_thread = std::panic::catch_unwind(give_up);
    let on_other_thread = thread::Builder::new()
        .name("reconciler".to_string())
        .spawn(reconcile)
        .unwrap()
        .join();

    // Then
    assert_eq!(warmup, Ok(DeliveryResult::Delivered { attempts: 1 }));
    assert!(on_runtime_thread.is_err());
    assert!(on_other_thread.is_err());
    assert_eq!(notifier.stats().delivered, 3);
}
