//! Per-endpoint behavior knobs.

use serde::{Deserialize, Serialize};

/// Default quiescent window for coalescing per-file event bursts (100ms)
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Options controlling an endpoint's behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointOptions {
    /// Read-only browsing: folder identities are generated on the fly and
    /// never persisted to sidecars.
    pub browse_only: bool,
    /// Basename patterns dropped from walking and watching (supports a
    /// single `*` wildcard per pattern).
    pub ignored_files: Vec<String>,
    /// Quiescent window in milliseconds after which a per-file event burst
    /// collapses into a single emission.
    pub debounce_window_ms: u64,
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self {
            browse_only: false,
            ignored_files: vec![".DS_Store".to_string(), "Thumbs.db".to_string()],
            debounce_window_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl EndpointOptions {
    /// Check if a basename matches the ignored-files set.
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored_files
            .iter()
            .any(|pattern| pattern_matches(pattern, name))
    }
}

/// Simple glob pattern matching (exact match or a single `*` wildcard).
fn pattern_matches(pattern: &str, name: &str) -> bool {
    if pattern == name {
        return true;
    }

    if pattern.contains('*') {
        let parts: Vec<&str> = pattern.split('*').collect();
        if parts.len() == 2 {
            let prefix = parts[0];
            let suffix = parts[1];
            return name.starts_with(prefix) && name.ends_with(suffix);
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ignores_finder_droppings() {
        let options = EndpointOptions::default();
        assert!(options.is_ignored(".DS_Store"));
        assert!(!options.is_ignored("notes.txt"));
    }

    #[test]
    fn test_wildcard_patterns() {
        let options = EndpointOptions {
            ignored_files: vec!["*.lock".to_string(), "~$*".to_string()],
            ..Default::default()
        };
        assert!(options.is_ignored("package.lock"));
        assert!(options.is_ignored("~$report.docx"));
        assert!(!options.is_ignored("lockfile"));
    }
}
