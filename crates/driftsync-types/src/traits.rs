//! Capability traits implemented by sync endpoints.
//!
//! An endpoint is polymorphic over four capability sets: the engine consumes
//! whichever it needs for a given sync direction. A local filesystem endpoint
//! implements all four; a browse-only remote may implement only the sources.

use crate::error::EndpointResult;
use crate::events::WatchObject;
use crate::node::Node;
use async_trait::async_trait;

/// Static description of an endpoint, used by the engine to pick strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    /// Display URI, scheme plus the path given at construction
    pub uri: String,
    /// Whether folder mtimes are unreliable and require rescans
    pub requires_folders_rescan: bool,
    /// Whether paths from this endpoint need Unicode normalization
    pub requires_normalization: bool,
}

/// Visitor invoked per walked entry. Receives the engine-form path and node
/// on success; traversal errors are delivered as `Err` and never abort the
/// walk.
pub type WalkVisitor<'a> = &'a mut (dyn FnMut(EndpointResult<(String, Node)>) + Send);

/// Common surface every endpoint exposes.
pub trait Endpoint: Send + Sync {
    fn endpoint_info(&self) -> EndpointInfo;
}

/// An endpoint the engine can read tree structure from.
#[async_trait]
pub trait PathSource: Endpoint {
    /// Load the node at an engine-form path. Absence surfaces as
    /// [`EndpointError::NotFound`](crate::EndpointError::NotFound), distinct
    /// from filesystem failure.
    async fn load_node(&self, path: &str) -> EndpointResult<Node>;

    /// Traverse the tree under `root`, invoking the visitor per entry.
    async fn walk(
        &self,
        visitor: WalkVisitor<'_>,
        root: &str,
        recursive: bool,
    ) -> EndpointResult<()>;

    /// Subscribe to change events below `recursive_path`.
    async fn watch(&self, recursive_path: &str) -> EndpointResult<WatchObject>;
}

/// An endpoint the engine can apply tree mutations to.
#[async_trait]
pub trait PathTarget: Endpoint {
    /// Create a collection. Leaf content goes through [`DataTarget`] instead.
    async fn create_node(&self, node: &Node, update_if_exists: bool) -> EndpointResult<()>;

    async fn update_node(&self, node: &Node) -> EndpointResult<()>;

    /// Remove a subtree. A missing path is success.
    async fn delete_node(&self, path: &str) -> EndpointResult<()>;

    /// Rename a file or folder. A missing source is success; the destination
    /// is never created out of thin air.
    async fn move_node(&self, old_path: &str, new_path: &str) -> EndpointResult<()>;
}

/// An endpoint the engine can read leaf content from.
#[async_trait]
pub trait DataSource: Endpoint {
    async fn get_reader(&self, path: &str) -> EndpointResult<Box<dyn std::io::Read + Send>>;
}

/// A write stream staged by a [`DataTarget`]. Content is not visible at the
/// target path until `close` commits it.
#[async_trait]
pub trait NodeWriter: std::io::Write + Send {
    /// Finalize the write, committing the staged content or cleaning up
    /// after a failure.
    async fn close(self: Box<Self>) -> EndpointResult<()>;
}

/// An endpoint the engine can write leaf content to.
#[async_trait]
pub trait DataTarget: Endpoint {
    async fn get_writer_on(
        &self,
        path: &str,
        target_size: u64,
    ) -> EndpointResult<Box<dyn NodeWriter>>;
}
