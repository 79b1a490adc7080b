//! Stable directory identity via hidden sidecar files.
//!
//! Each directory under a sync root carries a UUID in a sidecar file named
//! [`FOLDER_ID_FILENAME`]. The sidecar content is authoritative and
//! round-trips byte-for-byte; identity survives renames exactly as long as
//! the sidecar moves with the directory.

use crate::vfs::RootFs;
use driftsync_types::{EndpointResult, Node, FOLDER_ID_FILENAME};
use std::io;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Native-form path of a directory's sidecar file.
pub(crate) fn sidecar_path(dir_native: &str) -> String {
    Path::new(dir_native)
        .join(FOLDER_ID_FILENAME)
        .to_string_lossy()
        .into_owned()
}

/// Read a directory's UUID from its sidecar, creating the sidecar with a
/// fresh v4 UUID when it does not exist yet.
///
/// Browse-only endpoints never persist identity: a fresh UUID is returned
/// without touching disk.
pub(crate) fn read_or_create_folder_id(
    fs: &dyn RootFs,
    dir_native: &str,
    browse_only: bool,
) -> EndpointResult<String> {
    if browse_only {
        return Ok(Uuid::new_v4().to_string());
    }

    let sidecar = sidecar_path(dir_native);
    match fs.read_file(&sidecar) {
        Ok(content) => Ok(String::from_utf8_lossy(&content).into_owned()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let id = Uuid::new_v4().to_string();
            fs.write_file(&sidecar, id.as_bytes(), 0o666)?;
            Ok(id)
        }
        Err(e) => Err(e.into()),
    }
}

/// Replace a directory's persisted UUID with the one carried by `node`.
///
/// The stale sidecar is removed first; if that fails, no write is attempted.
pub(crate) fn update_folder_uuid(fs: &dyn RootFs, dir_native: &str, node: &Node) -> EndpointResult<()> {
    let sidecar = sidecar_path(dir_native);
    fs.remove(&sidecar)?;
    info!(path = %node.path, "refreshing folder uuid");
    fs.write_file(&sidecar, node.uuid.as_bytes(), 0o666)?;
    Ok(())
}
