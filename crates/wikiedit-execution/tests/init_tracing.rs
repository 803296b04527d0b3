use wikiedit_core::TRACK_TARGET;
use wikiedit_execution::{LogFormat, TracingOptions, init_tracing};

#[tokio::test]
async fn test_global_subscriber_captures_tracking() {
    let mut receiver = init_tracing(TracingOptions {
        format: LogFormat::Json,
        filter: Some("warn".to_string()),
        capture_tracking: true,
        stderr: true,
    })
    .expect("Should install subscriber")
    .expect("Should return tracking receiver");

    // Below the log filter, but tracking still sees it.
    tracing::info!(target: TRACK_TARGET, event = %"mwedit.ready", "track");

    let event = receiver.recv().await.expect("Should receive tracked event");
    assert_eq!(event.name, "mwedit.ready");

    assert!(
        init_tracing(TracingOptions::default()).is_err(),
        "Second install should be rejected"
    );
}
