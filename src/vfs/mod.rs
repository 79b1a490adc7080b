//! Root-confined filesystem access.
//!
//! Every endpoint operation goes through the [`RootFs`] capability set, which
//! prefixes paths with a pre-resolved root and refuses traversal above it.
//! Two implementations exist: [`OsFs`] over the host filesystem and [`MemFs`]
//! for deterministic tests.

mod mem;
mod os;

pub use mem::MemFs;
pub use os::OsFs;

use std::io::{self, Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

/// Metadata snapshot for a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub is_dir: bool,
    pub size: u64,
    /// Seconds since the Unix epoch
    pub mtime: i64,
    /// Raw mode bits
    pub mode: u32,
}

/// One entry of a directory listing, with its metadata.
#[derive(Debug, Clone)]
pub struct DirEntryInfo {
    pub name: String,
    pub stat: FileStat,
}

/// Capability set over a filesystem confined to a pre-resolved root.
///
/// Paths are native-form and interpreted relative to the root; a leading
/// separator is tolerated and stripped. No operation can reach above the
/// root.
pub trait RootFs: Send + Sync {
    fn stat(&self, path: &str) -> io::Result<FileStat>;
    fn open_read(&self, path: &str) -> io::Result<Box<dyn Read + Send>>;
    fn open_write_create(&self, path: &str, mode: u32) -> io::Result<Box<dyn Write + Send>>;
    fn mkdir_all(&self, path: &str, mode: u32) -> io::Result<()>;
    fn rename(&self, from: &str, to: &str) -> io::Result<()>;
    fn remove(&self, path: &str) -> io::Result<()>;
    fn remove_all(&self, path: &str) -> io::Result<()>;
    fn read_file(&self, path: &str) -> io::Result<Vec<u8>>;
    fn write_file(&self, path: &str, data: &[u8], mode: u32) -> io::Result<()>;
    /// List one directory level, sorted by name.
    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntryInfo>>;
    /// True for the in-memory test adapter. The endpoint's move path switches
    /// to the recursive-rename strategy when set, because [`MemFs::rename`]
    /// moves only the named entry.
    fn is_in_memory(&self) -> bool {
        false
    }
}

pub(crate) fn now_unix_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub(crate) fn escape_error() -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        "path escapes the sync root",
    )
}
