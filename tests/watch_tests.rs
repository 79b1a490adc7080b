//! Watch pipeline tests against real OS notifications.
//!
//! These use the host notifier, so they rely on real time: generous
//! timeouts, short debounce windows, and per-path filtering of the observed
//! events to stay robust against incidental directory noise.

use driftsync::{
    EndpointOptions, EventInfo, EventType, FsEndpoint, NodeWriter, PathSource, WatchObject,
    SYNC_TMP_PREFIX,
};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

const DEBOUNCE_MS: u64 = 300;
const SETTLE: Duration = Duration::from_millis(250);

/// RUST_LOG=debug makes a failing watch test narrate its pipeline.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn endpoint_at(temp: &TempDir) -> FsEndpoint {
    init_tracing();
    let options = EndpointOptions {
        debounce_window_ms: DEBOUNCE_MS,
        ..Default::default()
    };
    FsEndpoint::new(temp.path().to_str().unwrap(), options).unwrap()
}

/// Drain events for `window`, keeping everything that arrives.
async fn collect_events(watch: &mut WatchObject, window: Duration) -> Vec<EventInfo> {
    let mut collected = Vec::new();
    let deadline = tokio::time::Instant::now() + window;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        match timeout(remaining, watch.events.recv()).await {
            Ok(Some(event)) => collected.push(event),
            Ok(None) => break,
            Err(_) => break,
        }
    }
    collected
}

#[tokio::test]
async fn test_write_burst_collapses_to_single_event() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("a")).unwrap();
    let endpoint = endpoint_at(&temp);

    let mut watch = endpoint.watch("/").await.unwrap();
    tokio::time::sleep(SETTLE).await;

    // Five rapid touches within the debounce window.
    for i in 0..5 {
        fs::write(temp.path().join("a/hello.txt"), format!("rev {}", i)).unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
    }

    let events = collect_events(&mut watch, Duration::from_secs(2)).await;
    let for_file: Vec<&EventInfo> = events.iter().filter(|e| e.path == "a/hello.txt").collect();
    assert_eq!(
        for_file.len(),
        1,
        "burst should coalesce into one event, got {:?}",
        events
    );
    assert!(!for_file[0].folder);
}

#[tokio::test]
async fn test_separate_bursts_emit_separately() {
    let temp = TempDir::new().unwrap();
    let endpoint = endpoint_at(&temp);

    let mut watch = endpoint.watch("/").await.unwrap();
    tokio::time::sleep(SETTLE).await;

    fs::write(temp.path().join("f.txt"), b"first").unwrap();
    tokio::time::sleep(Duration::from_millis(DEBOUNCE_MS * 3)).await;
    fs::write(temp.path().join("f.txt"), b"second").unwrap();

    let events = collect_events(&mut watch, Duration::from_secs(2)).await;
    let for_file: Vec<&EventInfo> = events.iter().filter(|e| e.path == "f.txt").collect();
    assert_eq!(for_file.len(), 2, "got {:?}", events);
}

#[tokio::test]
async fn test_staged_temp_files_are_invisible() {
    let temp = TempDir::new().unwrap();
    let endpoint = endpoint_at(&temp);

    let mut watch = endpoint.watch("/").await.unwrap();
    tokio::time::sleep(SETTLE).await;

    // An atomic write: the staging sibling must never surface, only the
    // committed target.
    let mut writer = driftsync::DataTarget::get_writer_on(&endpoint, "doc.txt", 7)
        .await
        .unwrap();
    std::io::Write::write_all(&mut writer, b"payload").unwrap();
    writer.close().await.unwrap();

    let events = collect_events(&mut watch, Duration::from_secs(2)).await;
    assert!(
        events
            .iter()
            .all(|e| !e.path.split('/').any(|part| part.starts_with(SYNC_TMP_PREFIX))),
        "temp path leaked into events: {:?}",
        events
    );
    assert!(
        events.iter().any(|e| e.path == "doc.txt"),
        "committed write produced no event: {:?}",
        events
    );
}

#[tokio::test]
async fn test_ignored_basenames_never_surface() {
    let temp = TempDir::new().unwrap();
    let endpoint = endpoint_at(&temp);

    let mut watch = endpoint.watch("/").await.unwrap();
    tokio::time::sleep(SETTLE).await;

    fs::write(temp.path().join(".DS_Store"), b"junk").unwrap();
    fs::write(temp.path().join("real.txt"), b"content").unwrap();

    let events = collect_events(&mut watch, Duration::from_secs(2)).await;
    assert!(events.iter().all(|e| e.path != ".DS_Store"), "{:?}", events);
    assert!(events.iter().any(|e| e.path == "real.txt"), "{:?}", events);
}

#[tokio::test]
async fn test_deletion_is_reported() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("doomed.txt"), b"x").unwrap();
    let endpoint = endpoint_at(&temp);

    let mut watch = endpoint.watch("/").await.unwrap();
    tokio::time::sleep(SETTLE).await;

    fs::remove_file(temp.path().join("doomed.txt")).unwrap();

    let events = collect_events(&mut watch, Duration::from_secs(2)).await;
    assert!(
        events
            .iter()
            .any(|e| e.path == "doomed.txt" && e.event_type == EventType::Deleted),
        "{:?}",
        events
    );
}

#[tokio::test]
async fn test_stop_closes_both_channels() {
    let temp = TempDir::new().unwrap();
    let endpoint = endpoint_at(&temp);

    let mut watch = endpoint.watch("/").await.unwrap();
    tokio::time::sleep(SETTLE).await;

    watch.stop();

    let closed = timeout(Duration::from_secs(5), async {
        while watch.events.recv().await.is_some() {}
        while watch.errors.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "channels did not close after stop");
}

#[tokio::test]
async fn test_in_memory_endpoint_returns_inert_watch() {
    let endpoint = FsEndpoint::in_memory(EndpointOptions::default()).unwrap();
    let mut watch = endpoint.watch("/").await.unwrap();
    assert!(matches!(
        watch.events.try_recv(),
        Err(tokio::sync::mpsc::error::TryRecvError::Empty)
    ));
    watch.stop();
}
