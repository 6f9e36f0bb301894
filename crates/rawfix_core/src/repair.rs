use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use similar::TextDiff;

use crate::rewrite::{UrlFix, UrlFixer};

#[derive(Debug, Clone, Copy, Default)]
pub struct RepairOptions {
    pub dry_run: bool,
    pub capture_diff: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Unchanged,
    Fixed {
        fixes: Vec<UrlFix>,
        written: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        diff: Option<String>,
    },
    Failed {
        error: String,
    },
}

impl FileOutcome {
    pub fn fix_count(&self) -> usize {
        match self {
            Self::Fixed { fixes, .. } => fixes.len(),
            _ => 0,
        }
    }
}

/// Read, rewrite and (unless dry-run) write back one file. I/O failures are
/// folded into [`FileOutcome::Failed`] so a bad file never stops the run.
pub fn repair_file(path: &Path, fixer: &UrlFixer, options: RepairOptions) -> FileOutcome {
    match try_repair_file(path, fixer, options) {
        Ok(outcome) => outcome,
        Err(error) => {
            tracing::warn!(path = %path.display(), "{error:#}");
            FileOutcome::Failed {
                error: format!("{error:#}"),
            }
        }
    }
}

fn try_repair_file(path: &Path, fixer: &UrlFixer, options: RepairOptions) -> Result<FileOutcome> {
    let original = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let result = fixer.rewrite(&original);
    if result.content == original {
        tracing::debug!(path = %path.display(), "no changes needed");
        return Ok(FileOutcome::Unchanged);
    }

    for fix in &result.fixes {
        tracing::info!(path = %path.display(), original = %fix.original, fixed = %fix.fixed, "rewrote url");
    }

    let diff = options
        .capture_diff
        .then(|| diff_preview(path, &original, &result.content));

    if !options.dry_run {
        fs::write(path, &result.content)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(FileOutcome::Fixed {
        fixes: result.fixes,
        written: !options.dry_run,
        diff,
    })
}

/// Unified diff between the on-disk content and the rewritten content.
pub fn diff_preview(path: &Path, before: &str, after: &str) -> String {
    let label = path.to_string_lossy().replace('\\', "/");
    TextDiff::from_lines(before, after)
        .unified_diff()
        .context_radius(1)
        .header(&format!("a/{label}"), &format!("b/{label}"))
        .to_string()
}
