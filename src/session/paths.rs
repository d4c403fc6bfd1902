// ABOUTME: Maps (base directory, session id, format) to the session's log file path.
// ABOUTME: Session ids are used verbatim; listing relies on the inverse mapping.

use std::path::{Path, PathBuf};

use super::format::Format;

/// Path of the log file backing `session_id` under `base_dir`.
#[must_use]
pub fn session_path(base_dir: &Path, session_id: &str, format: Format) -> PathBuf {
    base_dir.join(format!("{}.{}", session_id, format.extension()))
}

/// Recover the session id from a log file path, if the path carries the
/// format's extension.
///
/// Matches on the file name rather than `Path::extension`, which treats
/// `.jsonl` (the empty session id) as a dotfile with no extension.
pub fn session_id_from_path(path: &Path, format: Format) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    name.strip_suffix(format.extension())?
        .strip_suffix('.')
        .map(str::to_string)
}
