//! Per-path coalescing of file write bursts.

use driftsync_types::EventInfo;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Input capacity for one path's burst buffer
const DEBOUNCER_BUFFER: usize = 64;

/// Coalesces a burst of events for one file path into a single emission once
/// the stream has been idle for the quiescent window.
///
/// Events arriving for the same path are serialized through the same
/// debouncer, so per-path ordering is preserved end-to-end.
pub(crate) struct FsEventDebouncer {
    input: mpsc::Sender<EventInfo>,
}

impl FsEventDebouncer {
    /// Spawn a debouncer. `release` runs when the window elapses, right
    /// before the coalesced event is emitted, and must remove this debouncer
    /// from its parent map.
    pub fn new(
        events: mpsc::Sender<EventInfo>,
        window: Duration,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        let (input, mut rx) = mpsc::channel(DEBOUNCER_BUFFER);
        tokio::spawn(async move {
            let mut latest: Option<EventInfo> = None;
            loop {
                // Recomputed per iteration, so every received event resets
                // the quiescent timer.
                let deadline = Instant::now() + window;
                tokio::select! {
                    received = rx.recv() => {
                        match received {
                            Some(event) => latest = Some(event),
                            None => break,
                        }
                    }
                    _ = sleep_until(deadline), if latest.is_some() => break,
                }
            }
            // Close the input before releasing: a straggler routed to this
            // debouncer must see a failed send and retry on a fresh one, not
            // land in a buffer nothing drains.
            drop(rx);
            release();
            if let Some(event) = latest {
                debug!(path = %event.path, "debounce window elapsed");
                let _ = events.send(event).await;
            }
        });
        Self { input }
    }

    /// Clone of the input channel, safe to send on after the parent map's
    /// lock is released.
    pub fn input(&self) -> mpsc::Sender<EventInfo> {
        self.input.clone()
    }
}
