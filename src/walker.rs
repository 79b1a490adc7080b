//! Lazy traversal of the tree under a root.
//!
//! The walker visits entries pre-order, loading each into a [`Node`].
//! Traversal errors are handed to the visitor and never abort the walk;
//! staged temp files, sidecars and ignored basenames are invisible.

use crate::endpoint::FsEndpoint;
use crate::path_form;
use crate::vfs::DirEntryInfo;
use driftsync_types::{EndpointResult, WalkVisitor, FOLDER_ID_FILENAME, SYNC_TMP_PREFIX};

/// One directory being listed: its native path and the remaining entries.
type Frame = (String, std::vec::IntoIter<DirEntryInfo>);

impl FsEndpoint {
    /// Traverse the tree under `root` (engine form), invoking the visitor
    /// once per entry. Non-recursive mode reads a single directory level.
    pub(crate) async fn walk_tree(
        &self,
        visitor: WalkVisitor<'_>,
        root: &str,
        recursive: bool,
    ) -> EndpointResult<()> {
        let root_native = path_form::denormalize(root);
        let root_engine = root.trim_start_matches('/').to_string();

        if !recursive {
            for entry in self.fs().read_dir(&root_native)? {
                self.visit_entry(&root_native, &root_engine, entry, visitor)
                    .await;
            }
            return Ok(());
        }

        // Pre-order depth-first, one frame per directory being listed.
        let mut stack: Vec<Frame> = Vec::new();
        match self.fs().read_dir(&root_native) {
            Ok(entries) => stack.push((root_native, entries.into_iter())),
            Err(e) => {
                visitor(Err(e.into()));
                return Ok(());
            }
        }

        loop {
            let (dir, next) = match stack.last_mut() {
                Some(frame) => (frame.0.clone(), frame.1.next()),
                None => break,
            };
            let Some(entry) = next else {
                stack.pop();
                continue;
            };
            let is_dir = entry.stat.is_dir;
            let Some(child_native) = self.visit_entry(&dir, &root_engine, entry, visitor).await
            else {
                continue;
            };
            if is_dir {
                match self.fs().read_dir(&child_native) {
                    Ok(entries) => stack.push((child_native, entries.into_iter())),
                    Err(e) => visitor(Err(e.into())),
                }
            }
        }
        Ok(())
    }

    /// Visit a single directory entry. Returns the child's native path when
    /// it was visited, `None` when it was skipped.
    async fn visit_entry(
        &self,
        dir_native: &str,
        root_engine: &str,
        entry: DirEntryInfo,
        visitor: WalkVisitor<'_>,
    ) -> Option<String> {
        if self.walk_skip(&entry.name) {
            return None;
        }
        let child_native = path_form::join_native(dir_native, &entry.name);
        let engine = path_form::normalize(&child_native);
        if engine.is_empty() || engine == root_engine {
            return None;
        }
        match self.load_node_with_stat(&engine, Some(entry.stat)).await {
            Ok(node) => visitor(Ok((engine, node))),
            Err(e) => visitor(Err(e)),
        }
        Some(child_native)
    }

    fn walk_skip(&self, name: &str) -> bool {
        name.starts_with(SYNC_TMP_PREFIX)
            || name == FOLDER_ID_FILENAME
            || self.options().is_ignored(name)
    }
}
