//! Priority directives: `priority,path[,alias]` lines mapping a source path
//! prefix to a precedence. Lower numbers win; `-1` excludes the source.

use std::path::Path;

use serde::Serialize;

use crate::constants::EXCLUDE_PRIORITY;
use crate::paths;

/// One parsed directive line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityEntry {
    pub priority: i64,
    /// Path prefix, always relative to the base directory.
    pub relative_path: String,
    /// Display label used instead of the path when rendering.
    pub alias: Option<String>,
}

impl PriorityEntry {
    pub fn is_excluded(&self) -> bool {
        self.priority == EXCLUDE_PRIORITY
    }

    /// Heading shown above this entry's rendered block.
    pub fn label(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.relative_path)
    }
}

/// Parse a single directive line. Comments, blank lines and malformed
/// lines yield `None`.
pub fn parse_line(line: &str, base_dir: &Path) -> Option<PriorityEntry> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut fields = line.split(',').map(str::trim);
    let priority = fields.next()?.parse::<i64>().ok()?;
    let path = fields.next().filter(|p| !p.is_empty())?;
    let alias = fields
        .next()
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    Some(PriorityEntry {
        priority,
        relative_path: paths::relative_to(Path::new(path), base_dir),
        alias,
    })
}

/// Parse directive file content, preserving declaration order.
///
/// Returns `None` when nothing usable is left, which callers treat the same
/// as an absent file.
pub fn parse_directives(content: &str, base_dir: &Path) -> Option<Vec<PriorityEntry>> {
    let entries: Vec<PriorityEntry> = content
        .lines()
        .filter_map(|line| parse_line(line, base_dir))
        .collect();
    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

/// Directives that take part in allocation (everything except `-1`).
pub fn active_entries(entries: &[PriorityEntry]) -> Vec<PriorityEntry> {
    entries.iter().filter(|e| !e.is_excluded()).cloned().collect()
}
