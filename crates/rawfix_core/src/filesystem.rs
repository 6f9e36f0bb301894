use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

pub const JSON_SUFFIX: &str = ".json";

/// Lazily walk `root` for regular files whose name ends in `.json`.
///
/// A missing root yields nothing. Each call starts a fresh walk, so the
/// sequence can be restarted by calling again. Symlinks are not followed.
pub fn walk_json_files(root: &Path) -> impl Iterator<Item = Result<PathBuf>> + use<> {
    let exists = root.is_dir();
    let base = root.to_path_buf();
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .take_while(move |_| exists)
        .filter_map(move |entry| {
            let entry = match entry.with_context(|| format!("failed to walk {}", base.display())) {
                Ok(entry) => entry,
                Err(error) => return Some(Err(error)),
            };
            if !entry.file_type().is_file() || !is_json_name(entry.path()) {
                return None;
            }
            Some(Ok(entry.into_path()))
        })
}

/// Collect [`walk_json_files`] into a sorted list.
pub fn find_json_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = walk_json_files(root).collect::<Result<Vec<_>>>()?;
    files.sort();
    Ok(files)
}

fn is_json_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(JSON_SUFFIX))
}

/// Forward-slash path of `path` relative to `base`, or the full path when it
/// is not under `base`.
pub fn relative_display(path: &Path, base: &Path) -> String {
    let shown = path.strip_prefix(base).unwrap_or(path);
    shown.to_string_lossy().replace('\\', "/")
}
