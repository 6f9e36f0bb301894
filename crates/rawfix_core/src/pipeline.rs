use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::config::RunConfig;
use crate::filesystem::{find_json_files, relative_display};
use crate::publish::{PublishOutcome, publish};
use crate::repair::{FileOutcome, RepairOptions, repair_file};
use crate::rewrite::UrlFixer;
use crate::runtime::normalize_for_display;
use crate::vcs::VersionControl;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Compute fixes without writing files or publishing.
    pub dry_run: bool,
    /// Keep a unified diff per changed file.
    pub capture_diff: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub relative_path: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub cache_dir: String,
    pub cache_dir_exists: bool,
    pub files: Vec<FileReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scan: ScanReport,
    pub files_fixed: usize,
    pub urls_fixed: usize,
    pub files_failed: usize,
    pub dry_run: bool,
    pub publish: PublishOutcome,
}

impl RunReport {
    pub fn files_unchanged(&self) -> usize {
        self.scan.files.len() - self.files_fixed - self.files_failed
    }
}

/// Scan the cache, repair every JSON file, then publish if anything changed.
///
/// Only a failed directory walk is returned as an error. Per-file and
/// publishing failures are recorded in the report.
pub fn run(config: &RunConfig, vcs: &dyn VersionControl, options: RunOptions) -> Result<RunReport> {
    let fixer = UrlFixer::new(&config.owner, &config.repository, &config.branch)?;
    let cache_dir_exists = config.cache_dir.is_dir();
    let mut scan = ScanReport {
        cache_dir: normalize_for_display(&config.cache_dir),
        cache_dir_exists,
        files: Vec::new(),
    };

    if !cache_dir_exists {
        tracing::warn!(cache_dir = %scan.cache_dir, "cache directory not found");
        return Ok(finish(scan, options, PublishOutcome::skipped("cache directory not found")));
    }

    let paths = find_json_files(&config.cache_dir)?;
    tracing::debug!(count = paths.len(), cache_dir = %scan.cache_dir, "found json files");
    if paths.is_empty() {
        return Ok(finish(scan, options, PublishOutcome::skipped("no JSON files found")));
    }

    let repair_options = RepairOptions {
        dry_run: options.dry_run,
        capture_diff: options.capture_diff,
    };
    for path in paths {
        let outcome = repair_file(&path, &fixer, repair_options);
        scan.files.push(FileReport {
            relative_path: relative_display(&path, &config.repo_root),
            path,
            outcome,
        });
    }

    let any_fixed = scan
        .files
        .iter()
        .any(|file| matches!(file.outcome, FileOutcome::Fixed { .. }));
    let publish_outcome = if !any_fixed {
        PublishOutcome::skipped("no files changed")
    } else if options.dry_run {
        PublishOutcome::skipped("dry run")
    } else if !config.publish.enabled {
        PublishOutcome::skipped("publishing disabled")
    } else {
        publish(vcs, &config.publish)
    };

    Ok(finish(scan, options, publish_outcome))
}

fn finish(scan: ScanReport, options: RunOptions, publish: PublishOutcome) -> RunReport {
    let mut files_fixed = 0;
    let mut urls_fixed = 0;
    let mut files_failed = 0;
    for file in &scan.files {
        match &file.outcome {
            FileOutcome::Fixed { fixes, .. } => {
                files_fixed += 1;
                urls_fixed += fixes.len();
            }
            FileOutcome::Failed { .. } => files_failed += 1,
            FileOutcome::Unchanged => {}
        }
    }
    RunReport {
        scan,
        files_fixed,
        urls_fixed,
        files_failed,
        dry_run: options.dry_run,
        publish,
    }
}
