//! The local filesystem endpoint.
//!
//! [`FsEndpoint`] binds a canonicalized root directory and implements all
//! four capability sets ([`PathSource`], [`PathTarget`], [`DataSource`],
//! [`DataTarget`]). Underlying I/O goes through the [`RootFs`] adapter so
//! tests can swap in the in-memory filesystem.

use crate::folder_id;
use crate::hasher;
use crate::path_form;
use crate::snapshot;
use crate::vfs::{FileStat, MemFs, OsFs, RootFs};
use crate::watcher;
use crate::writer;
use async_trait::async_trait;
use driftsync_types::{
    DataSource, DataTarget, Endpoint, EndpointError, EndpointInfo, EndpointOptions,
    EndpointResult, Node, NodeWriter, Patch, PathSource, PathTarget, WatchObject,
};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub(crate) struct EndpointShared {
    root: PathBuf,
    fs: Arc<dyn RootFs>,
    uri_path: String,
    options: EndpointOptions,
    update_snapshot: RwLock<Option<Arc<dyn PathTarget>>>,
    ref_hash_store: RwLock<Option<Arc<dyn PathSource>>>,
}

/// Endpoint over a local directory tree.
///
/// Cheap to clone; all state lives behind one shared handle bound to the
/// root for the lifetime of the sync session.
#[derive(Clone)]
pub struct FsEndpoint {
    shared: Arc<EndpointShared>,
}

impl std::fmt::Debug for FsEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsEndpoint")
            .field("uri_path", &self.shared.uri_path)
            .field("root", &self.shared.root)
            .finish()
    }
}

impl FsEndpoint {
    /// Bind an endpoint to a root directory on the host filesystem.
    ///
    /// The given path is kept verbatim for display; the root actually used
    /// is its denormalized, canonicalized form. Fails with
    /// [`EndpointError::RootUnavailable`] when the root cannot be stat-ed.
    pub fn new(root_path: &str, options: EndpointOptions) -> EndpointResult<Self> {
        let uri_path = root_path.to_string();
        let denormalized = path_form::denormalize(root_path);
        let trimmed = denormalized.trim_end_matches(['/', '\\']);
        let mut canonical = path_form::canonical_path(trimmed)?;
        if options.browse_only && canonical.is_empty() {
            canonical = "/".to_string();
        }
        let fs: Arc<dyn RootFs> = Arc::new(OsFs::new(&canonical));
        Self::with_fs(fs, PathBuf::from(canonical), uri_path, options)
    }

    /// Bind an endpoint to an in-memory filesystem. Used by tests; the watch
    /// pipeline is inert for this variant.
    pub fn in_memory(options: EndpointOptions) -> EndpointResult<Self> {
        Self::with_fs(
            Arc::new(MemFs::new()),
            PathBuf::from("/"),
            "/".to_string(),
            options,
        )
    }

    /// Bind an endpoint to an explicit [`RootFs`] adapter.
    pub fn with_fs(
        fs: Arc<dyn RootFs>,
        root: PathBuf,
        uri_path: String,
        options: EndpointOptions,
    ) -> EndpointResult<Self> {
        if fs.stat("/").is_err() {
            return Err(EndpointError::RootUnavailable(
                root.to_string_lossy().into_owned(),
            ));
        }
        Ok(Self {
            shared: Arc::new(EndpointShared {
                root,
                fs,
                uri_path,
                options,
                update_snapshot: RwLock::new(None),
                ref_hash_store: RwLock::new(None),
            }),
        })
    }

    pub(crate) fn fs(&self) -> &dyn RootFs {
        self.shared.fs.as_ref()
    }

    pub(crate) fn options(&self) -> &EndpointOptions {
        &self.shared.options
    }

    pub(crate) fn root_abs(&self) -> &Path {
        &self.shared.root
    }

    pub(crate) fn update_snapshot(&self) -> Option<Arc<dyn PathTarget>> {
        self.shared.update_snapshot.read().clone()
    }

    /// Attach a target that must be kept in lockstep with every mutation.
    /// The handle is non-owning; the engine manages both lifetimes.
    pub fn set_update_snapshot(&self, target: Arc<dyn PathTarget>) {
        *self.shared.update_snapshot.write() = Some(target);
    }

    /// Attach a read-only peer whose etags are adopted when size and mtime
    /// match, skipping local re-hashing.
    pub fn set_ref_hash_store(&self, source: Arc<dyn PathSource>) {
        *self.shared.ref_hash_store.write() = Some(source);
    }

    fn ref_hash_store(&self) -> Option<Arc<dyn PathSource>> {
        self.shared.ref_hash_store.read().clone()
    }

    /// Re-apply an engine patch to the attached snapshot, silently.
    ///
    /// A no-op when no snapshot is attached or when the value is not a
    /// recognized patch shape.
    pub async fn patch_update_snapshot(&self, patch: &dyn Any) {
        let Some(target) = self.update_snapshot() else {
            return;
        };
        let Some(patch) = patch.downcast_ref::<Patch>() else {
            return;
        };
        snapshot::reapply(self, target, patch).await;
    }

    /// Load the node at `path`, reusing `stat` when the caller already has
    /// one from a directory listing.
    pub(crate) async fn load_node_with_stat(
        &self,
        path: &str,
        stat: Option<FileStat>,
    ) -> EndpointResult<Node> {
        let native = path_form::denormalize(path);
        let stat = match stat {
            Some(stat) => stat,
            None => match self.fs().stat(&native) {
                Ok(stat) => stat,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(EndpointError::NotFound(path.to_string()));
                }
                Err(e) => return Err(e.into()),
            },
        };

        let mut node = if stat.is_dir {
            let uuid =
                folder_id::read_or_create_folder_id(self.fs(), &native, self.options().browse_only)?;
            Node::collection(path, uuid)
        } else {
            let mut etag = String::new();
            if let Some(reference) = self.ref_hash_store() {
                if let Ok(ref_node) = reference.load_node(path).await {
                    if ref_node.size == stat.size
                        && ref_node.mtime == stat.mtime
                        && !ref_node.etag.is_empty()
                    {
                        etag = ref_node.etag;
                    }
                }
            }
            if etag.is_empty() {
                let mut reader = self.fs().open_read(&native)?;
                etag = hasher::md5_hex(reader.as_mut())?;
            }
            Node::leaf(path, etag)
        };

        node.mtime = stat.mtime;
        node.size = stat.size;
        node.mode = stat.mode;
        Ok(node)
    }

    /// Report folder identities claimed by more than one directory: each
    /// duplicated UUID maps to every directory node carrying it.
    pub async fn existing_folders(&self) -> EndpointResult<HashMap<String, Vec<Node>>> {
        let mut by_uuid: HashMap<String, Vec<Node>> = HashMap::new();
        let mut visitor = |entry: EndpointResult<(String, Node)>| {
            if let Ok((_, node)) = entry {
                if !node.is_leaf() {
                    by_uuid.entry(node.uuid.clone()).or_default().push(node);
                }
            }
        };
        self.walk_tree(&mut visitor, "/", true).await?;
        Ok(by_uuid
            .into_iter()
            .filter(|(_, nodes)| nodes.len() > 1)
            .collect())
    }

    /// Replace a directory's persisted identity with the UUID carried by
    /// `node`.
    pub fn update_folder_uuid(&self, node: &Node) -> EndpointResult<Node> {
        let native = path_form::denormalize(&node.path);
        folder_id::update_folder_uuid(self.fs(), &native, node)?;
        Ok(node.clone())
    }

    /// Etags are computed by `load_node`; there is no separate checksum
    /// entry point on this endpoint.
    pub fn compute_checksum(&self, _node: &Node) -> EndpointResult<()> {
        Err(EndpointError::unsupported(
            "checksums are computed by load_node",
        ))
    }

    /// Rename every descendant deepest-first, then the directory itself.
    /// Needed on filesystems whose rename moves only the named entry.
    fn move_recursively(&self, old_native: &str, new_native: &str) -> EndpointResult<()> {
        let mut descendants = Vec::new();
        self.collect_descendants(old_native, &mut descendants)?;
        descendants
            .sort_by_key(|path| std::cmp::Reverse(path.matches(['/', '\\']).count()));

        for path in descendants {
            let Some(suffix) = path.strip_prefix(old_native) else {
                continue;
            };
            let target = format!("{}{}", new_native, suffix);
            debug!(from = %path, to = %target, "moving descendant");
            self.fs().rename(&path, &target)?;
        }
        self.fs().rename(old_native, new_native)?;
        Ok(())
    }

    fn collect_descendants(&self, dir: &str, out: &mut Vec<String>) -> io::Result<()> {
        let mut pending = vec![dir.to_string()];
        while let Some(current) = pending.pop() {
            for entry in self.fs().read_dir(&current)? {
                let child = path_form::join_native(&current, &entry.name);
                if entry.stat.is_dir {
                    pending.push(child.clone());
                }
                out.push(child);
            }
        }
        Ok(())
    }
}

impl Endpoint for FsEndpoint {
    fn endpoint_info(&self) -> EndpointInfo {
        EndpointInfo {
            uri: format!("fs://{}", self.shared.uri_path),
            requires_folders_rescan: true,
            requires_normalization: cfg!(target_os = "macos"),
        }
    }
}

#[async_trait]
impl PathSource for FsEndpoint {
    async fn load_node(&self, path: &str) -> EndpointResult<Node> {
        self.load_node_with_stat(path, None).await
    }

    async fn walk(
        &self,
        visitor: driftsync_types::WalkVisitor<'_>,
        root: &str,
        recursive: bool,
    ) -> EndpointResult<()> {
        self.walk_tree(visitor, root, recursive).await
    }

    async fn watch(&self, recursive_path: &str) -> EndpointResult<WatchObject> {
        watcher::watch(self, recursive_path).await
    }
}

#[async_trait]
impl PathTarget for FsEndpoint {
    async fn create_node(&self, node: &Node, update_if_exists: bool) -> EndpointResult<()> {
        if node.is_leaf() {
            return Err(EndpointError::WrongKind);
        }
        let native = path_form::denormalize(&node.path);
        match self.fs().stat(&native) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.fs().mkdir_all(&native, 0o777)?;
                if !node.uuid.is_empty() && !self.options().browse_only {
                    self.fs().write_file(
                        &folder_id::sidecar_path(&native),
                        node.uuid.as_bytes(),
                        0o666,
                    )?;
                }
                if let Some(target) = self.update_snapshot() {
                    info!(path = %node.path, "updating snapshot: create");
                    if let Err(e) = target.create_node(node, update_if_exists).await {
                        warn!(path = %node.path, error = %e, "snapshot create failed");
                    }
                }
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_node(&self, node: &Node) -> EndpointResult<()> {
        self.create_node(node, true).await
    }

    async fn delete_node(&self, path: &str) -> EndpointResult<()> {
        let native = path_form::denormalize(path);
        match self.fs().stat(&native) {
            Ok(_) => self.fs().remove_all(&native)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        if let Some(target) = self.update_snapshot() {
            info!(path, "updating snapshot: delete");
            if let Err(e) = target.delete_node(path).await {
                warn!(path, error = %e, "snapshot delete failed");
            }
        }
        Ok(())
    }

    async fn move_node(&self, old_path: &str, new_path: &str) -> EndpointResult<()> {
        let old_native = path_form::denormalize(old_path);
        let new_native = path_form::denormalize(new_path);

        match self.fs().stat(&old_native) {
            // A missing source is success: nothing moves, but the mirror
            // below is still kept in lockstep.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
            Ok(stat) => {
                if stat.is_dir && self.fs().is_in_memory() {
                    self.move_recursively(&old_native, &new_native)?;
                } else {
                    self.fs().rename(&old_native, &new_native)?;
                }
            }
        }
        if let Some(target) = self.update_snapshot() {
            debug!(from = old_path, to = new_path, "updating snapshot: move");
            if let Err(e) = target.move_node(old_path, new_path).await {
                warn!(from = old_path, to = new_path, error = %e, "snapshot move failed");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DataSource for FsEndpoint {
    async fn get_reader(&self, path: &str) -> EndpointResult<Box<dyn io::Read + Send>> {
        let native = path_form::denormalize(path);
        Ok(self.fs().open_read(&native)?)
    }
}

#[async_trait]
impl DataTarget for FsEndpoint {
    async fn get_writer_on(
        &self,
        path: &str,
        target_size: u64,
    ) -> EndpointResult<Box<dyn NodeWriter>> {
        writer::writer_for(self, path, target_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftsync_types::NodeType;

    #[tokio::test]
    async fn test_create_node_rejects_leaves() {
        let endpoint = FsEndpoint::in_memory(EndpointOptions::default()).unwrap();
        let leaf = Node::leaf("a.txt", "d41d8cd9");
        let err = endpoint.create_node(&leaf, false).await.unwrap_err();
        assert!(matches!(err, EndpointError::WrongKind));
    }

    #[tokio::test]
    async fn test_load_node_not_found_carries_engine_path() {
        let endpoint = FsEndpoint::in_memory(EndpointOptions::default()).unwrap();
        let err = endpoint.load_node("missing/file.txt").await.unwrap_err();
        match err {
            EndpointError::NotFound(path) => assert_eq!(path, "missing/file.txt"),
            other => panic!("expected NotFound, got {}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let endpoint = FsEndpoint::in_memory(EndpointOptions::default()).unwrap();
        assert!(endpoint.delete_node("never/created").await.is_ok());
    }

    #[tokio::test]
    async fn test_move_missing_source_is_noop() {
        let endpoint = FsEndpoint::in_memory(EndpointOptions::default()).unwrap();
        endpoint.move_node("ghost", "elsewhere").await.unwrap();
        let err = endpoint.load_node("elsewhere").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_endpoint_info_uri_preserves_original_path() {
        let endpoint = FsEndpoint::in_memory(EndpointOptions::default()).unwrap();
        let info = endpoint.endpoint_info();
        assert_eq!(info.uri, "fs:///");
        assert!(info.requires_folders_rescan);
    }

    #[tokio::test]
    async fn test_create_then_load_round_trips_uuid() {
        let endpoint = FsEndpoint::in_memory(EndpointOptions::default()).unwrap();
        let coll = Node::collection("a", "u1");
        endpoint.create_node(&coll, false).await.unwrap();

        let loaded = endpoint.load_node("a").await.unwrap();
        assert_eq!(loaded.node_type, NodeType::Collection);
        assert_eq!(loaded.uuid, "u1");
    }

    #[tokio::test]
    async fn test_move_directory_in_memory_carries_children() {
        let endpoint = FsEndpoint::in_memory(EndpointOptions::default()).unwrap();
        endpoint
            .create_node(&Node::collection("dir", "u1"), false)
            .await
            .unwrap();
        endpoint
            .fs()
            .write_file("/dir/sub/leaf.txt", b"payload", 0o666)
            .unwrap();

        endpoint.move_node("dir", "moved").await.unwrap();

        assert!(endpoint.load_node("dir").await.unwrap_err().is_not_found());
        let moved = endpoint.load_node("moved").await.unwrap();
        assert_eq!(moved.uuid, "u1");
        assert_eq!(
            endpoint.fs().read_file("/moved/sub/leaf.txt").unwrap(),
            b"payload"
        );
    }

    #[tokio::test]
    async fn test_compute_checksum_is_unsupported() {
        let endpoint = FsEndpoint::in_memory(EndpointOptions::default()).unwrap();
        let err = endpoint
            .compute_checksum(&Node::leaf("a.txt", ""))
            .unwrap_err();
        assert!(matches!(err, EndpointError::Unsupported(_)));
    }
}
