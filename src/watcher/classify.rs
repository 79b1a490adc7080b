//! Translation of raw notify events into engine events.

use crate::path_form;
use driftsync_types::{
    EndpointError, EndpointOptions, EventInfo, EventType, FOLDER_ID_FILENAME, SYNC_TMP_PREFIX,
};
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::Event;
use std::path::{Path, PathBuf};

/// Classifies raw notifications for one watch root: filters invisible paths,
/// maps native paths into engine form, and determines the folder flag.
pub(crate) struct Classifier {
    root: PathBuf,
    options: EndpointOptions,
}

impl Classifier {
    pub fn new(root: PathBuf, options: EndpointOptions) -> Self {
        Self { root, options }
    }

    /// True when a path must never surface as an event: staged temp files,
    /// sidecars, and the caller's ignored set.
    fn is_filtered(&self, path: &Path) -> bool {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy(),
            None => return true,
        };
        name.starts_with(SYNC_TMP_PREFIX)
            || name == FOLDER_ID_FILENAME
            || self.options.is_ignored(&name)
    }

    fn engine_path(&self, path: &Path) -> Result<String, EndpointError> {
        let relative = path.strip_prefix(&self.root).map_err(|_| {
            EndpointError::watch(format!(
                "event path {} outside watch root",
                path.display()
            ))
        })?;
        Ok(path_form::normalize(&relative.to_string_lossy()))
    }

    fn is_dir(&self, path: &Path) -> bool {
        std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
    }

    fn event_for(
        &self,
        path: &Path,
        event_type: EventType,
    ) -> Result<EventInfo, EndpointError> {
        let engine = self.engine_path(path)?;
        // Nothing to stat once the entry is gone.
        let folder = event_type != EventType::Deleted && self.is_dir(path);
        Ok(EventInfo::new(engine, event_type, folder))
    }

    /// Classify one raw notification into zero or more engine events.
    pub fn classify(&self, event: &Event) -> Vec<Result<EventInfo, EndpointError>> {
        let paths: Vec<&PathBuf> = event
            .paths
            .iter()
            .filter(|path| !self.is_filtered(path))
            .collect();
        if paths.is_empty() {
            return Vec::new();
        }

        match event.kind {
            EventKind::Create(_) => paths
                .iter()
                .map(|path| self.event_for(path, EventType::Created))
                .collect(),
            EventKind::Modify(ModifyKind::Name(mode)) => self.classify_rename(mode, &paths),
            EventKind::Modify(_) => paths
                .iter()
                .map(|path| self.event_for(path, EventType::Modified))
                .collect(),
            EventKind::Remove(_) => paths
                .iter()
                .map(|path| self.event_for(path, EventType::Deleted))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn classify_rename(
        &self,
        mode: RenameMode,
        paths: &[&PathBuf],
    ) -> Vec<Result<EventInfo, EndpointError>> {
        match mode {
            RenameMode::Both if paths.len() >= 2 => {
                let from = paths[0];
                let to = paths[1];
                let folder = self.is_dir(to);
                let outcome = self.engine_path(from).and_then(|source| {
                    self.engine_path(to)
                        .map(|dest| EventInfo::moved(dest, source, folder))
                });
                vec![outcome]
            }
            RenameMode::From => paths
                .iter()
                .map(|path| self.event_for(path, EventType::Deleted))
                .collect(),
            RenameMode::To => paths
                .iter()
                .map(|path| self.event_for(path, EventType::Created))
                .collect(),
            // Direction unknown (or one side filtered away): fall back to an
            // existence check per path.
            _ => paths
                .iter()
                .map(|path| {
                    if path.exists() {
                        self.event_for(path, EventType::Created)
                    } else {
                        self.event_for(path, EventType::Deleted)
                    }
                })
                .collect(),
        }
    }
}
