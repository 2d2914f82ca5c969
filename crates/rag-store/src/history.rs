//! Chat history files: `YYYYMMDD_HHMMSS_micros_message.md`, one exchange
//! each. The sources cited by each saved answer live beside them in
//! `font-refs.json`, keyed by file name.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rag_core::{
    HISTORY_SUFFIX, HistoryExchange, Timestamp, format_exchange, parse_exchange, parse_file_name,
    paths, within_window,
};

use crate::error::{Result, StoreError};

pub const SOURCES_FILE: &str = "font-refs.json";

type SourceMap = BTreeMap<String, Vec<String>>;

/// Cited sources per exchange file name. A missing or corrupt map reads as
/// empty.
fn read_sources(dir: &Path) -> SourceMap {
    let path = dir.join(SOURCES_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return SourceMap::new(),
        Err(e) => {
            tracing::warn!("ignoring {}: {e}", path.display());
            return SourceMap::new();
        }
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!("ignoring {}: {e}", path.display());
        SourceMap::new()
    })
}

fn write_sources(dir: &Path, map: &SourceMap) -> Result<()> {
    let json = serde_json::to_string_pretty(map)
        .map_err(|e| StoreError::InvalidData(format!("{SOURCES_FILE}: {e}")))?;
    fs::write(dir.join(SOURCES_FILE), json)?;
    Ok(())
}

fn scan(
    dir: &Path,
    base_dir: &Path,
    keep: impl Fn(Timestamp) -> bool,
) -> Vec<HistoryExchange> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!("no history from {}: {e}", dir.display());
            return Vec::new();
        }
    };
    let mut sources = read_sources(dir);

    let mut exchanges = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(timestamp) = parse_file_name(name) else {
            if name.ends_with(".md") {
                tracing::debug!("skipping {name}: not a history file name");
            }
            continue;
        };
        if !keep(timestamp) {
            continue;
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("skipping {}: {e}", path.display());
                continue;
            }
        };
        let source = paths::relative_to(&path, base_dir);
        match parse_exchange(name, &source, &content) {
            Some(mut exchange) => {
                exchange.sources = sources.remove(name).unwrap_or_default();
                exchanges.push(exchange);
            }
            None => tracing::warn!("skipping {}: missing question or answer", path.display()),
        }
    }
    exchanges
}

/// Exchanges stamped inside `[now - window, now]`, newest first. A missing
/// or unreadable directory yields no history.
pub fn load_history(
    dir: &Path,
    base_dir: &Path,
    now: Timestamp,
    window: Duration,
) -> Result<Vec<HistoryExchange>> {
    let exchanges = scan(dir, base_dir, |ts| ts.within(now, window));
    Ok(within_window(exchanges, now, window))
}

/// Every readable exchange, newest first.
pub fn list_history(dir: &Path, base_dir: &Path) -> Result<Vec<HistoryExchange>> {
    list_history_between(dir, base_dir, None, None)
}

/// Exchanges stamped in `[since, until]`, newest first. Either bound may be
/// left open.
pub fn list_history_between(
    dir: &Path,
    base_dir: &Path,
    since: Option<Timestamp>,
    until: Option<Timestamp>,
) -> Result<Vec<HistoryExchange>> {
    let mut exchanges = scan(dir, base_dir, |ts| {
        since.is_none_or(|s| ts >= s) && until.is_none_or(|u| ts <= u)
    });
    exchanges.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.source.cmp(&b.source)));
    Ok(exchanges)
}

/// Persist one exchange as a new history file, record the sources its
/// answer cited, and return the file's path.
pub fn save_exchange(
    dir: &Path,
    question: &str,
    answer: &str,
    title: Option<&str>,
    sources: &[String],
    now: Timestamp,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let name = format!("{}{HISTORY_SUFFIX}", now.to_file_stamp());
    let path = dir.join(&name);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => {
                StoreError::InvalidData(format!("{} already exists", path.display()))
            }
            _ => StoreError::Io(e),
        })?;
    file.write_all(format_exchange(title, question, answer).as_bytes())?;

    let mut map = read_sources(dir);
    map.insert(name, sources.to_vec());
    write_sources(dir, &map)?;

    tracing::info!(sources = sources.len(), "saved exchange to {}", path.display());
    Ok(path)
}
