//! Host filesystem adapter.

use super::{escape_error, DirEntryInfo, FileStat, RootFs};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

/// [`RootFs`] over the host filesystem, confined to `root`.
#[derive(Debug, Clone)]
pub struct OsFs {
    root: PathBuf,
}

impl OsFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Join a native-form path under the root, rejecting traversal above it.
    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let trimmed = path.trim_start_matches(['/', '\\']);
        let mut clean = PathBuf::new();
        for component in Path::new(trimmed).components() {
            match component {
                Component::Normal(part) => clean.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !clean.pop() {
                        return Err(escape_error());
                    }
                }
                Component::RootDir | Component::Prefix(_) => return Err(escape_error()),
            }
        }
        Ok(self.root.join(clean))
    }
}

fn stat_from_metadata(metadata: &fs::Metadata) -> FileStat {
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    #[cfg(unix)]
    let mode = {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode()
    };
    #[cfg(not(unix))]
    let mode = if metadata.permissions().readonly() {
        0o444
    } else {
        0o666
    };

    FileStat {
        is_dir: metadata.is_dir(),
        size: metadata.len(),
        mtime,
        mode,
    }
}

impl RootFs for OsFs {
    fn stat(&self, path: &str) -> io::Result<FileStat> {
        let metadata = fs::metadata(self.resolve(path)?)?;
        Ok(stat_from_metadata(&metadata))
    }

    fn open_read(&self, path: &str) -> io::Result<Box<dyn Read + Send>> {
        let file = fs::File::open(self.resolve(path)?)?;
        Ok(Box::new(file))
    }

    fn open_write_create(&self, path: &str, mode: u32) -> io::Result<Box<dyn Write + Send>> {
        let target = self.resolve(path)?;
        let mut options = fs::OpenOptions::new();
        options.create(true).write(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
        let file = options.open(target)?;
        Ok(Box::new(file))
    }

    fn mkdir_all(&self, path: &str, mode: u32) -> io::Result<()> {
        let target = self.resolve(path)?;
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
        builder.create(target)
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        fs::rename(self.resolve(from)?, self.resolve(to)?)
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        let target = self.resolve(path)?;
        if fs::metadata(&target)?.is_dir() {
            fs::remove_dir(target)
        } else {
            fs::remove_file(target)
        }
    }

    fn remove_all(&self, path: &str) -> io::Result<()> {
        let target = self.resolve(path)?;
        match fs::metadata(&target) {
            Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(target),
            Ok(_) => fs::remove_file(target),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path)?)
    }

    fn write_file(&self, path: &str, data: &[u8], mode: u32) -> io::Result<()> {
        let target = self.resolve(path)?;
        fs::write(&target, data)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode))?;
        }
        #[cfg(not(unix))]
        let _ = mode;
        Ok(())
    }

    fn read_dir(&self, path: &str) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(path)?)? {
            let entry = entry?;
            let metadata = match entry.metadata() {
                Ok(m) => m,
                // Entry vanished between listing and stat; skip it.
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                stat: stat_from_metadata(&metadata),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
