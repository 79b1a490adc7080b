//! Silent re-application of engine patches to a snapshot mirror.
//!
//! A patch the engine already applied to the primary tree is replayed
//! against the attached snapshot so the mirror stays in lockstep. The
//! replay is silent: no events, no logs, individual operation failures are
//! swallowed.

use crate::endpoint::FsEndpoint;
use crate::path_form;
use driftsync_types::{Patch, PatchOperation, PathTarget};
use std::sync::Arc;

/// Rebase `patch` against the current primary tree, then apply the surviving
/// operations to the snapshot in order.
pub(crate) async fn reapply(primary: &FsEndpoint, target: Arc<dyn PathTarget>, patch: &Patch) {
    for operation in rebase(primary, patch) {
        match operation {
            PatchOperation::CreateFolder {
                node,
                update_if_exists,
            } => {
                let _ = target.create_node(&node, update_if_exists).await;
            }
            PatchOperation::Delete { path } => {
                let _ = target.delete_node(&path).await;
            }
            PatchOperation::Move { from, to } => {
                let _ = target.move_node(&from, &to).await;
            }
        }
    }
}

/// Keep only operations the primary tree still vouches for: stale entries
/// (created folders since removed, deletes that never landed, moves whose
/// destination is gone) are filtered out.
fn rebase(primary: &FsEndpoint, patch: &Patch) -> Vec<PatchOperation> {
    let exists = |engine_path: &str| {
        primary
            .fs()
            .stat(&path_form::denormalize(engine_path))
            .is_ok()
    };

    patch
        .operations
        .iter()
        .filter(|operation| match operation {
            PatchOperation::CreateFolder { node, .. } => exists(&node.path),
            PatchOperation::Delete { path } => !exists(path),
            PatchOperation::Move { to, .. } => exists(to),
        })
        .cloned()
        .collect()
}
