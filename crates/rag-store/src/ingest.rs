//! Walk the base directory for markdown and feed it to the passage index.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rag_core::paths;

use crate::error::Result;
use crate::index::PassageIndex;

pub const IGNORE_FILE: &str = ".ragignore";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub files: usize,
    pub chunks: usize,
    /// Already-indexed files left alone by a partial run.
    pub unchanged: usize,
    /// Indexed files no longer on disk, dropped by a partial run.
    pub removed: usize,
    /// Files that could not be read as UTF-8 text.
    pub skipped: usize,
}

/// Absolute paths listed in `.ragignore`, one per line, relative to
/// `base_dir`. Blank lines and `#` comments are ignored.
pub fn load_ignore(base_dir: &Path) -> Result<Vec<PathBuf>> {
    let path = base_dir.join(IGNORE_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| paths::resolve(Path::new(l), base_dir))
        .collect())
}

fn is_ignored(path: &Path, ignore: &[PathBuf]) -> bool {
    ignore.iter().any(|p| path.starts_with(p))
}

/// Every `*.md` file under `base_dir`, sorted. Hidden entries and ignored
/// paths are skipped.
pub fn collect_markdown(base_dir: &Path, ignore: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut stack = vec![base_dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if hidden || is_ignored(&path, ignore) {
                continue;
            }
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() && path.extension().is_some_and(|e| e == "md") {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Index the markdown under `base_dir`. A full run rebuilds from scratch;
/// a partial run only adds files the index has not seen and drops the ones
/// that disappeared.
///
/// The whole run is one transaction: if it fails part way, the index keeps
/// its previous contents.
pub fn index_documents(index: &PassageIndex, base_dir: &Path, partial: bool) -> Result<IngestReport> {
    let ignore = load_ignore(base_dir)?;
    let files = collect_markdown(base_dir, &ignore)?;
    let known = if partial {
        index.indexed_sources()?
    } else {
        HashSet::new()
    };

    let report = index.batch(|batch| {
        let mut report = IngestReport::default();
        if !partial {
            batch.clear()?;
        }

        let current: HashSet<String> = files
            .iter()
            .map(|p| paths::relative_to(p, base_dir))
            .collect();
        for stale in known.difference(&current) {
            batch.remove_source(stale)?;
            report.removed += 1;
            tracing::debug!("dropped {stale}");
        }

        for path in &files {
            let source = paths::relative_to(path, base_dir);
            if known.contains(&source) {
                report.unchanged += 1;
                continue;
            }
            let text = match fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("skipping {}: {e}", path.display());
                    report.skipped += 1;
                    continue;
                }
            };
            report.chunks += batch.add_document(&source, &text)?;
            report.files += 1;
            tracing::debug!("indexed {source}");
        }
        Ok(report)
    })?;

    tracing::info!(
        files = report.files,
        chunks = report.chunks,
        unchanged = report.unchanged,
        removed = report.removed,
        skipped = report.skipped,
        "indexing complete"
    );
    Ok(report)
}
