//! Executable resolution for direct (shell-less) invocation.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Resolve an executable name the way a typical shell would.
///
/// - Absolute path: returned if it exists.
/// - Relative path with separators (`bin/tool`, `./tool`): resolved against
///   `cwd` and returned if it exists.
/// - Bare name: the first existing match in `search_paths` (a `PATH` value).
/// - Empty name: `None`.
pub fn find_command_path(search_paths: &OsStr, cwd: &Path, name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    if name.is_empty() {
        return None;
    }
    if path.is_absolute() {
        return existing(path.to_path_buf());
    }
    if path.components().count() > 1 || name.starts_with("./") {
        return existing(cwd.join(path));
    }
    std::env::split_paths(search_paths).find_map(|dir| existing(dir.join(path)))
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}
