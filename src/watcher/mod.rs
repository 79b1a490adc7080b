//! Watching a tree for changes.
//!
//! A long-lived pipeline turns raw OS notifications into normalized engine
//! events: ingest → pipe → filter/classify → route. Folder events flow
//! straight to the event channel; file events pass through a per-path
//! debouncer so write storms collapse into a single emission.

mod classify;
mod debounce;
pub mod pipe;

use crate::endpoint::FsEndpoint;
use crate::path_form;
use classify::Classifier;
use debounce::FsEventDebouncer;
use driftsync_types::{EndpointError, EndpointResult, EventInfo, WatchObject};
use notify::{RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Capacity of each pipeline stage; bursts beyond this are dropped at ingest.
pub const PIPE_CAPACITY: usize = 1000;

type DebouncerMap = Arc<Mutex<HashMap<String, FsEventDebouncer>>>;

/// Subscribe to change events below `recursive_path`.
///
/// Returns an inert handle when the endpoint is backed by the in-memory
/// adapter: no OS notifier exists there, so no event will ever fire.
pub(crate) async fn watch(
    endpoint: &FsEndpoint,
    recursive_path: &str,
) -> EndpointResult<WatchObject> {
    if endpoint.fs().is_in_memory() {
        return Ok(WatchObject::inert());
    }

    let native = path_form::denormalize(recursive_path);
    let watch_root = endpoint
        .root_abs()
        .join(native.trim_start_matches(['/', '\\']));

    let (event_tx, event_rx) = mpsc::channel(PIPE_CAPACITY);
    let (error_tx, error_rx) = mpsc::channel(PIPE_CAPACITY);
    let (done_tx, done_rx) = oneshot::channel::<()>();
    let (pipe_tx, mut pipe_rx) = pipe::pipe::<notify::Event>(PIPE_CAPACITY);

    let notifier_errors = error_tx.clone();
    let mut os_watcher =
        notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if !pipe_tx.send(event) {
                    debug!("watch pipe full, dropping notification");
                }
            }
            Err(e) => {
                let _ = notifier_errors.try_send(EndpointError::watch(e.to_string()));
            }
        })
        .map_err(|e| EndpointError::watch(e.to_string()))?;

    os_watcher
        .watch(&watch_root, RecursiveMode::Recursive)
        .map_err(|e| EndpointError::watch(e.to_string()))?;

    info!(root = %watch_root.display(), "watching recursively");

    let classifier = Classifier::new(
        endpoint.root_abs().to_path_buf(),
        endpoint.options().clone(),
    );
    let window = Duration::from_millis(endpoint.options().debounce_window_ms);

    // Classify and route until the pipe closes.
    tokio::spawn(async move {
        let debouncers: DebouncerMap = Arc::new(Mutex::new(HashMap::new()));
        while let Some(raw) = pipe_rx.recv().await {
            for outcome in classifier.classify(&raw) {
                match outcome {
                    Err(e) => {
                        if error_tx.send(e).await.is_err() {
                            return;
                        }
                    }
                    Ok(info) if info.path.is_empty() => {}
                    Ok(info) if info.folder => {
                        if event_tx.send(info).await.is_err() {
                            return;
                        }
                    }
                    Ok(info) => {
                        dispatch_debounced(&debouncers, &event_tx, window, info).await;
                    }
                }
            }
        }
    });

    // Shutdown: the done signal (or a dropped handle) stops the OS notifier;
    // the pipe input closes with it and every downstream channel drains shut
    // within one debounce window.
    tokio::spawn(async move {
        let _ = done_rx.await;
        drop(os_watcher);
        debug!(root = %watch_root.display(), "watch shut down");
    });

    Ok(WatchObject::new(event_rx, error_rx, done_tx))
}

/// Route one file event into its per-path debouncer, creating it on first
/// use. Lookup and insertion happen under the map lock; the channel send
/// happens after the lock is released.
async fn dispatch_debounced(
    debouncers: &DebouncerMap,
    events: &mpsc::Sender<EventInfo>,
    window: Duration,
    info: EventInfo,
) {
    let key = info.path.clone();
    loop {
        let input = {
            let mut map = debouncers.lock();
            match map.get(&key) {
                Some(existing) => existing.input(),
                None => {
                    let map_for_release = Arc::clone(debouncers);
                    let release_key = key.clone();
                    let debouncer =
                        FsEventDebouncer::new(events.clone(), window, move || {
                            map_for_release.lock().remove(&release_key);
                        });
                    let input = debouncer.input();
                    map.insert(key.clone(), debouncer);
                    input
                }
            }
        };
        if input.send(info.clone()).await.is_ok() {
            return;
        }
        // The window elapsed while this event was in flight; retire the dead
        // debouncer and retry with a fresh one.
        debouncers.lock().remove(&key);
    }
}
