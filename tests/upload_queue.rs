//! End-to-end behaviour through the public API only.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::ChunkedTransport;
use upload_queue::{
    Config, Event, FilePayload, RequestOverrides, UploadHooks, UploadQueue, UploadStatus,
};

const TIMEOUT: Duration = Duration::from_secs(10);

async fn wait_idle(queue: &UploadQueue) {
    tokio::time::timeout(TIMEOUT, queue.wait_until_idle())
        .await
        .expect("queue did not become idle");
}

#[tokio::test]
async fn uploads_files_from_disk_with_hook_resolved_urls() {
    let dir = tempfile::tempdir().unwrap();
    let mut payloads = Vec::new();
    for (name, size) in [("one.bin", 40usize), ("two.bin", 25)] {
        let path = dir.path().join(name);
        tokio::fs::write(&path, vec![7u8; size]).await.unwrap();
        payloads.push(FilePayload::from_path(&path).await.unwrap());
    }

    let transport = ChunkedTransport::new(10, Duration::from_millis(1));
    let fractions = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&fractions);
    let hooks = UploadHooks::new()
        .before_upload(|record, _| {
            RequestOverrides::url(format!("https://files.example.com/{}", record.name()))
        })
        .upload_progress(move |record, _, fraction| {
            log.lock().unwrap().push((record.name().to_string(), fraction));
        });
    let queue = UploadQueue::new(Config::default(), transport.clone(), hooks).unwrap();

    queue.add_files(payloads);
    wait_idle(&queue).await;

    assert_eq!(
        transport.urls(),
        [
            "https://files.example.com/one.bin",
            "https://files.example.com/two.bin"
        ]
    );

    let fractions = fractions.lock().unwrap().clone();
    let one: Vec<f64> = fractions
        .iter()
        .filter(|(name, _)| name == "one.bin")
        .map(|(_, f)| *f)
        .collect();
    assert_eq!(one, vec![0.25, 0.5, 0.75, 1.0]);
    assert_eq!(fractions.last().map(|(_, f)| *f), Some(1.0));

    let snapshot = queue.snapshot();
    assert_eq!(snapshot.completed_count(), 2);
    for record in &snapshot.records {
        match &record.status {
            UploadStatus::Completed(outcome) => {
                assert_eq!(outcome.status, Some(201));
                assert!(outcome.is_success());
            }
            UploadStatus::Pending => panic!("{} still pending", record.name()),
        }
    }
}

#[tokio::test]
async fn cancel_mid_transfer_then_start_over() {
    let transport = ChunkedTransport::new(1, Duration::from_millis(5));
    let queue = UploadQueue::new(Config::default(), transport.clone(), UploadHooks::new()).unwrap();
    let mut events = queue.subscribe();

    queue.add_files([
        FilePayload::new("big.iso", vec![0u8; 1000]),
        FilePayload::new("next.iso", vec![0u8; 1000]),
    ]);

    // Wait until the first file is visibly moving
    loop {
        match tokio::time::timeout(TIMEOUT, events.recv()).await {
            Ok(Ok(Event::Progress { .. })) => break,
            Ok(Ok(_)) => continue,
            other => panic!("expected progress, got {other:?}"),
        }
    }

    queue.cancel_upload();
    let snapshot = queue.snapshot();
    assert!(snapshot.records.is_empty());
    assert!(snapshot.active.is_none());
    wait_idle(&queue).await;

    queue.add_file(FilePayload::new("small.txt", "hello"));
    wait_idle(&queue).await;

    let records = queue.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name(), "small.txt");
    assert_eq!(records[0].outcome().and_then(|o| o.status), Some(201));
    assert_eq!(transport.requests.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_config_is_rejected_at_construction() {
    let mut config = Config::default();
    config.request.method = "NOT A METHOD".to_string();
    let transport = ChunkedTransport::new(1, Duration::ZERO);

    let err = UploadQueue::new(config, transport, UploadHooks::new()).unwrap_err();

    assert_eq!(err.config_key(), Some("request.method"));
}

#[test]
fn construction_outside_runtime_fails() {
    let transport = ChunkedTransport::new(1, Duration::ZERO);

    let result = UploadQueue::new(Config::default(), transport, UploadHooks::new());

    assert!(matches!(result, Err(upload_queue::Error::NoRuntime(_))));
}
