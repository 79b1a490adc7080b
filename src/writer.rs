//! Atomic write streams.
//!
//! Leaf content is staged to a temporary sibling (`.tmp.write.<name>`) and
//! renamed over the target when the stream closes cleanly. A failed stream
//! removes its staging file and surfaces the original error. Content is
//! never visible at the target path before the rename.

use crate::endpoint::FsEndpoint;
use crate::path_form;
use async_trait::async_trait;
use driftsync_types::{EndpointResult, NodeWriter, FOLDER_ID_FILENAME, SYNC_TMP_PREFIX};
use std::io::{self, Write};
use std::path::Path;
use tracing::{info, warn};

/// Sink for sidecar writes arriving through the data channel. Everything is
/// accepted and discarded; close is a no-op.
pub struct Discarder;

impl Write for Discarder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl NodeWriter for Discarder {
    async fn close(self: Box<Self>) -> EndpointResult<()> {
        Ok(())
    }
}

/// Write stream staging into a temp sibling, committed by rename on close.
pub struct AtomicWriter {
    endpoint: FsEndpoint,
    inner: Option<Box<dyn Write + Send>>,
    tmp_path: String,
    target_path: String,
    /// Engine-form path, kept to reload the node for the snapshot mirror.
    snapshot_path: String,
    write_error: Option<io::Error>,
}

/// Open a write stream for an engine-form path.
///
/// Sidecar paths get a [`Discarder`] so folder identities cannot be
/// overwritten through the data channel; the root-level sidecar is the one
/// exception.
pub(crate) fn writer_for(
    endpoint: &FsEndpoint,
    path: &str,
    _target_size: u64,
) -> EndpointResult<Box<dyn NodeWriter>> {
    let basename = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if basename == FOLDER_ID_FILENAME && path.trim_matches('/') != FOLDER_ID_FILENAME {
        return Ok(Box::new(Discarder));
    }

    let snapshot_path = path.to_string();
    let native = path_form::denormalize(path);
    let native_ref = Path::new(&native);
    let dir = native_ref
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let native_name = native_ref
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path_form::join_native(&dir, &format!("{}{}", SYNC_TMP_PREFIX, native_name));

    let file = endpoint.fs().open_write_create(&tmp_path, 0o666)?;
    Ok(Box::new(AtomicWriter {
        endpoint: endpoint.clone(),
        inner: Some(file),
        tmp_path,
        target_path: native,
        snapshot_path,
        write_error: None,
    }))
}

impl AtomicWriter {
    fn record(&mut self, e: &io::Error) {
        if self.write_error.is_none() {
            self.write_error = Some(io::Error::new(e.kind(), e.to_string()));
        }
    }
}

impl Write for AtomicWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = self
            .inner
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "writer already closed"))?;
        match inner.write(buf) {
            Ok(n) => Ok(n),
            Err(e) => {
                self.record(&e);
                Err(e)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let inner = self
            .inner
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "writer already closed"))?;
        match inner.flush() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.record(&e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl NodeWriter for AtomicWriter {
    async fn close(mut self: Box<Self>) -> EndpointResult<()> {
        if let Some(mut inner) = self.inner.take() {
            if let Err(e) = inner.flush() {
                self.record(&e);
            }
            // Drop the handle before renaming; some hosts refuse to rename
            // an open file.
        }

        if let Some(e) = self.write_error.take() {
            let _ = self.endpoint.fs().remove(&self.tmp_path);
            return Err(e.into());
        }

        self.endpoint
            .fs()
            .rename(&self.tmp_path, &self.target_path)?;

        if let Some(target) = self.endpoint.update_snapshot() {
            match self
                .endpoint
                .load_node_with_stat(&self.snapshot_path, None)
                .await
            {
                Ok(node) => {
                    info!(path = %node.path, "updating snapshot after write");
                    if let Err(e) = target.create_node(&node, true).await {
                        warn!(path = %self.snapshot_path, error = %e, "snapshot update failed");
                    }
                }
                Err(e) => {
                    warn!(path = %self.snapshot_path, error = %e, "could not reload node for snapshot");
                }
            }
        }
        Ok(())
    }
}
