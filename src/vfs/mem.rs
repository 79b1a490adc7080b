//! In-memory filesystem adapter for deterministic tests.

use super::{now_unix_secs, DirEntryInfo, FileStat, RootFs};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum MemEntry {
    Dir { mode: u32, mtime: i64 },
    File { data: Vec<u8>, mode: u32, mtime: i64 },
}

impl MemEntry {
    fn stat(&self) -> FileStat {
        match self {
            MemEntry::Dir { mode, mtime } => FileStat {
                is_dir: true,
                size: 0,
                mtime: *mtime,
                mode: *mode,
            },
            MemEntry::File { data, mode, mtime } => FileStat {
                is_dir: false,
                size: data.len() as u64,
                mtime: *mtime,
                mode: *mode,
            },
        }
    }
}

type EntryMap = BTreeMap<String, MemEntry>;

/// [`RootFs`] backed by a map of paths to entries. Used by endpoint tests in
/// place of a real directory tree.
///
/// Mirrors the quirk real in-memory filesystems have: [`RootFs::rename`]
/// moves only the named entry, leaving children keyed under the old prefix,
/// so directory moves must be applied deepest-first by the caller.
#[derive(Debug, Clone, Default)]
pub struct MemFs {
    entries: Arc<RwLock<EntryMap>>,
}

/// Canonical internal key: no leading/trailing separators, root is "".
fn key_of(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn parent_of(key: &str) -> &str {
    match key.rfind('/') {
        Some(idx) => &key[..idx],
        None => "",
    }
}

fn not_found(key: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such entry: /{}", key))
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_parents(entries: &mut EntryMap, key: &str) {
        let mut current = parent_of(key).to_string();
        while !current.is_empty() {
            entries.entry(current.clone()).or_insert(MemEntry::Dir {
                mode: 0o777,
                mtime: now_unix_secs(),
            });
            current = parent_of(&current).to_string();
        }
    }

    fn commit_file(entries: &Arc<RwLock<EntryMap>>, key: &str, data: Vec<u8>, mode: u32) {
        let mut guard = entries.write();
        Self::insert_parents(&mut guard, key);
        guard.insert(
            key.to_string(),
            MemEntry::File {
                data,
                mode,
                mtime: now_unix_secs(),
            },
        );
    }
}

/// Write handle mirroring OS create semantics: the (empty) entry appears as
/// soon as the handle is opened, and every write lands in the map.
struct MemFileWriter {
    entries: Arc<RwLock<EntryMap>>,
    key: String,
    mode: u32,
    buf: Vec<u8>,
}

impl Write for MemFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        MemFs::commit_file(&self.entries, &self.key, self.buf.clone(), self.mode);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl RootFs for MemFs {
    fn stat(&self, path: &str) -> io::Result<FileStat> {
        let key = key_of(path);
        if key.is_empty() {
            // The root always exists.
            return Ok(FileStat {
                is_dir: true,
                size: 0,
                mtime: 0,
                mode: 0o777,
            });
        }
        self.entries
            .read()
            .get(&key)
            .map(MemEntry::stat)
            .ok_or_else(|| not_found(&key))
    }

    fn open_read(&self, path: &str) -> io::Result<Box<dyn Read + Send>> {
        let key = key_of(path);
        match self.entries.read().get(&key) {
            Some(MemEntry::File { data, .. }) => Ok(Box::new(Cursor::new(data.clone()))),
            Some(MemEntry::Dir { .. }) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("is a directory: /{}", key),
            )),
            None => Err(not_found(&key)),
        }
    }

    fn open_write_create(&self, path: &str, mode: u32) -> io::Result<Box<dyn Write + Send>> {
        let key = key_of(path);
        Self::commit_file(&self.entries, &key, Vec::new(), mode);
        Ok(Box::new(MemFileWriter {
            entries: Arc::clone(&self.entries),
            key,
            mode,
            buf: Vec::new(),
        }))
    }

    fn mkdir_all(&self, path: &str, mode: u32) -> io::Result<()> {
        let key = key_of(path);
        let mut entries = self.entries.write();
        if !key.is_empty() {
            Self::insert_parents(&mut entries, &key);
            entries.entry(key).or_insert(MemEntry::Dir {
                mode,
                mtime: now_unix_secs(),
            });
        }
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let from_key = key_of(from);
        let to_key = key_of(to);
        let mut entries = self.entries.write();
        let entry = entries.remove(&from_key).ok_or_else(|| not_found(&from_key))?;
        Self::insert_parents(&mut entries, &to_key);
        entries.insert(to_key, entry);
        Ok(())
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        let key = key_of(path);
        let mut entries = self.entries.write();
        match entries.get(&key) {
            Some(MemEntry::Dir { .. }) => {
                let prefix = format!("{}/", key);
                if entries.keys().any(|k| k.starts_with(&prefix)) {
                    return Err(io::Error::new(
                        io::ErrorKind::Other,
                        format!("directory not empty: /{}", key),
                    ));
                }
            }
            Some(MemEntry::File { .. }) => {}
            None => return Err(not_found(&key)),
        }
        entries.remove(&key);
        Ok(())
    }

    fn remove_all(&self, path: &str) -> io::Result<()> {
        let key = key_of(path);
        let prefix = format!("{}/", key);
        let mut entries = self.entries.write();
        entries.retain(|k, _| k != &key && !k.starts_with(&prefix));
        Ok(())
    }

    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        let key = key_of(path);
        match self.entries.read().get(&key) {
            Some(MemEntry::File { data, .. }) => Ok(data.clone()),
            Some(MemEntry::Dir { .. }) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("is a directory: /{}", key),
            )),
            None => Err(not_found(&key)),
        }
    }

    fn write_file(&self, path: &str, data: &[u8], mode: u32) -> io::Result<()> {
        Self::commit_file(&self.entries, &key_of(path), data.to_vec(), mode);
        Ok(())
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntryInfo>> {
        let key = key_of(path);
        let entries = self.entries.read();
        if !key.is_empty() {
            match entries.get(&key) {
                Some(MemEntry::Dir { .. }) => {}
                Some(MemEntry::File { .. }) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("not a directory: /{}", key),
                    ))
                }
                None => return Err(not_found(&key)),
            }
        }
        let prefix = if key.is_empty() {
            String::new()
        } else {
            format!("{}/", key)
        };
        let mut listing = Vec::new();
        for (entry_key, entry) in entries.iter() {
            if let Some(rest) = entry_key.strip_prefix(&prefix) {
                if !rest.is_empty() && !rest.contains('/') {
                    listing.push(DirEntryInfo {
                        name: rest.to_string(),
                        stat: entry.stat(),
                    });
                }
            }
        }
        // BTreeMap iteration already sorts by key.
        Ok(listing)
    }

    fn is_in_memory(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_always_exists() {
        let fs = MemFs::new();
        assert!(fs.stat("/").unwrap().is_dir);
        assert!(fs.read_dir("/").unwrap().is_empty());
    }

    #[test]
    fn test_write_file_creates_parents() {
        let fs = MemFs::new();
        fs.write_file("/a/b/c.txt", b"hello", 0o666).unwrap();
        assert!(fs.stat("/a").unwrap().is_dir);
        assert!(fs.stat("/a/b").unwrap().is_dir);
        assert_eq!(fs.read_file("/a/b/c.txt").unwrap(), b"hello");
    }

    #[test]
    fn test_streamed_write_lands_in_map() {
        let fs = MemFs::new();
        let mut writer = fs.open_write_create("/f.bin", 0o666).unwrap();
        // The entry exists as soon as the handle is open.
        assert_eq!(fs.read_file("/f.bin").unwrap(), b"");
        writer.write_all(b"chunk one ").unwrap();
        writer.write_all(b"chunk two").unwrap();
        drop(writer);
        assert_eq!(fs.read_file("/f.bin").unwrap(), b"chunk one chunk two");
    }

    #[test]
    fn test_rename_moves_only_the_named_entry() {
        let fs = MemFs::new();
        fs.mkdir_all("/dir/sub", 0o777).unwrap();
        fs.write_file("/dir/sub/f.txt", b"x", 0o666).unwrap();

        fs.rename("/dir", "/moved").unwrap();

        // The directory entry moved but its children did not follow.
        assert!(fs.stat("/moved").unwrap().is_dir);
        assert!(fs.stat("/dir/sub/f.txt").is_ok());
        assert!(fs.stat("/moved/sub/f.txt").is_err());
    }

    #[test]
    fn test_remove_refuses_non_empty_dir() {
        let fs = MemFs::new();
        fs.write_file("/d/f.txt", b"x", 0o666).unwrap();
        assert!(fs.remove("/d").is_err());
        fs.remove("/d/f.txt").unwrap();
        fs.remove("/d").unwrap();
        assert!(fs.stat("/d").is_err());
    }

    #[test]
    fn test_remove_all_clears_subtree() {
        let fs = MemFs::new();
        fs.write_file("/d/a.txt", b"a", 0o666).unwrap();
        fs.write_file("/d/sub/b.txt", b"b", 0o666).unwrap();
        fs.remove_all("/d").unwrap();
        assert!(fs.stat("/d").is_err());
        assert!(fs.stat("/d/sub/b.txt").is_err());
    }
}
