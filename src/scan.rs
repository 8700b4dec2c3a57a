//! Report file discovery.
//!
//! Walks the configured data directory and returns every report file that
//! matches the include globs and none of the exclude globs, in a stable
//! order.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::config::InputConfig;
use crate::extract::content_type_for;

/// A report file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    pub path: PathBuf,
    /// Path relative to the data directory, used for ordering.
    pub relative_path: String,
    pub filename: String,
    pub content_type: &'static str,
}

pub fn scan_reports(input: &InputConfig) -> Result<Vec<ReportFile>> {
    let root = &input.data_dir;
    if !root.is_dir() {
        bail!("Data directory does not exist: {}", root.display());
    }

    let include_set = build_globset(&input.include_globs)?;
    let mut excludes = vec!["**/.git/**".to_string()];
    excludes.extend(input.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        // Globs may admit files we cannot read; skip them here.
        let Some(content_type) = content_type_for(&filename) else {
            continue;
        };

        files.push(ReportFile {
            path: path.to_path_buf(),
            relative_path: rel_str,
            filename,
            content_type,
        });
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
