//! Translation between engine-form and native-form paths.
//!
//! Engine-form paths use forward slashes with no leading separator and are
//! Unicode-NFC when sourced from macOS. Native-form paths are whatever the
//! host filesystem expects. The platform branches are resolved at compile
//! time, not per call.

use driftsync_types::EndpointResult;

/// Translate a native-form path into engine form.
#[cfg(target_os = "macos")]
pub fn normalize(path: &str) -> String {
    use unicode_normalization::UnicodeNormalization;
    path.trim_start_matches('/').nfc().collect()
}

/// Translate an engine-form path into native form.
#[cfg(target_os = "macos")]
pub fn denormalize(path: &str) -> String {
    use unicode_normalization::UnicodeNormalization;
    // HFS+/APFS store names decomposed; make sure it starts with a /
    format!("/{}", path.trim_start_matches('/'))
        .nfd()
        .collect()
}

/// Translate a native-form path into engine form.
#[cfg(target_os = "windows")]
pub fn normalize(path: &str) -> String {
    path.trim_start_matches(['\\', '/']).replace('\\', "/")
}

/// Translate an engine-form path into native form.
#[cfg(target_os = "windows")]
pub fn denormalize(path: &str) -> String {
    path.replace('/', "\\")
}

/// Translate a native-form path into engine form.
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub fn normalize(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

/// Translate an engine-form path into native form.
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub fn denormalize(path: &str) -> String {
    path.to_string()
}

/// Resolve a root path into its canonical native form.
///
/// On Windows this trims leading separators, resolves symlinks (failing on
/// broken ones) and lowercases the drive letter so the same root always
/// compares equal. Elsewhere the path passes through untouched.
#[cfg(target_os = "windows")]
pub fn canonical_path(path: &str) -> EndpointResult<String> {
    let trimmed = path.trim_start_matches(['/', '\\']);
    let resolved = std::fs::canonicalize(trimmed)?;
    let mut canonical = resolved.to_string_lossy().into_owned();
    if let Some(stripped) = canonical.strip_prefix(r"\\?\") {
        canonical = stripped.to_string();
    }
    // C:\... compares case-insensitively but we key maps on it
    if canonical.len() >= 2 && canonical.as_bytes()[1] == b':' {
        let drive = canonical[..1].to_lowercase();
        canonical = format!("{}{}", drive, &canonical[1..]);
    }
    Ok(canonical)
}

/// Resolve a root path into its canonical native form.
#[cfg(not(target_os = "windows"))]
pub fn canonical_path(path: &str) -> EndpointResult<String> {
    Ok(path.to_string())
}

/// Join a native-form directory and entry name.
pub(crate) fn join_native(dir: &str, name: &str) -> String {
    std::path::Path::new(dir)
        .join(name)
        .to_string_lossy()
        .into_owned()
}
