//! Local filesystem endpoint for the driftsync engine.
//!
//! This crate adapts a directory tree on a host filesystem into an
//! addressable, observable node store: every file and directory under a root
//! becomes a stably-identified [`Node`](driftsync_types::Node), mutations
//! round-trip through the endpoint's own observation pipeline, and OS-level
//! notifications are debounced into a normalized event stream.

pub mod endpoint;
pub mod folder_id;
pub mod hasher;
pub mod path_form;
pub mod retry;
pub mod snapshot;
pub mod vfs;
pub mod walker;
pub mod watcher;
pub mod writer;

pub use driftsync_types as types;

pub use endpoint::FsEndpoint;
pub use retry::{retry, retry_with_ctx, RetryTiming};
pub use vfs::{FileStat, MemFs, OsFs, RootFs};

pub use driftsync_types::{
    DataSource, DataTarget, Endpoint, EndpointError, EndpointInfo, EndpointOptions,
    EndpointResult, EventInfo, EventType, Node, NodeType, NodeWriter, Patch, PatchOperation,
    PathSource, PathTarget, WalkVisitor, WatchObject, FOLDER_ID_FILENAME, SYNC_TMP_PREFIX,
};
