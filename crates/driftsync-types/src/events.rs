//! Event types for the filesystem watch pipeline.
//!
//! These types are how an endpoint communicates filesystem changes to the
//! sync engine: normalized [`EventInfo`] records delivered through the
//! channels of a [`WatchObject`].

use crate::error::EndpointError;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Kind of change reported by the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Created,
    Modified,
    Deleted,
    Moved,
}

/// Normalized change event emitted by the watch pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    /// Engine-form path of the affected entry
    pub path: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// True when the entry is a directory
    pub folder: bool,
    /// Previous engine-form path, present for moves only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
}

impl EventInfo {
    pub fn new(path: impl Into<String>, event_type: EventType, folder: bool) -> Self {
        Self {
            path: path.into(),
            event_type,
            folder,
            source_path: None,
        }
    }

    pub fn moved(path: impl Into<String>, source_path: impl Into<String>, folder: bool) -> Self {
        Self {
            path: path.into(),
            event_type: EventType::Moved,
            folder,
            source_path: Some(source_path.into()),
        }
    }
}

/// Handle to a running watch pipeline.
///
/// Events and errors arrive on the two receivers; both end when the watch
/// shuts down. Shutdown is requested exactly once, either by calling
/// [`WatchObject::stop`] or by dropping the handle.
pub struct WatchObject {
    pub events: mpsc::Receiver<EventInfo>,
    pub errors: mpsc::Receiver<EndpointError>,
    done: Option<oneshot::Sender<()>>,
    // Held only by inert handles so their channels stay open forever.
    _keepalive: Option<(mpsc::Sender<EventInfo>, mpsc::Sender<EndpointError>)>,
}

impl WatchObject {
    /// Wrap the channels of a live watch pipeline.
    pub fn new(
        events: mpsc::Receiver<EventInfo>,
        errors: mpsc::Receiver<EndpointError>,
        done: oneshot::Sender<()>,
    ) -> Self {
        Self {
            events,
            errors,
            done: Some(done),
            _keepalive: None,
        }
    }

    /// A handle with no pipeline behind it. No event will ever fire and the
    /// channels never close; used when the backing filesystem has no OS
    /// notifier (the in-memory adapter).
    pub fn inert() -> Self {
        let (event_tx, events) = mpsc::channel(1);
        let (error_tx, errors) = mpsc::channel(1);
        Self {
            events,
            errors,
            done: None,
            _keepalive: Some((event_tx, error_tx)),
        }
    }

    /// Signal the pipeline to shut down. Safe to call more than once; only
    /// the first call has an effect.
    pub fn stop(&mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
    }
}

impl Drop for WatchObject {
    fn drop(&mut self) {
        self.stop();
    }
}
