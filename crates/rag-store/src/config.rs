//! Assembler configuration: built-in defaults, then `<base>/.rag.toml`,
//! then environment overrides. Callers layer CLI flags on top with the
//! `with_*` builders.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rag_core::{DEFAULT_K, DIRECTIVE_FILE, HISTORY_DIR, TEMPLATE_FILE};
use serde::Deserialize;

use crate::error::{Result, StoreError};

pub const CONFIG_FILE: &str = ".rag.toml";
pub const INDEX_FILE: &str = ".rag_index.db";
pub const DEFAULT_LANGUAGE: &str = "Portuguese";

/// Keys accepted in `.rag.toml`. Relative paths resolve against the base
/// directory.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub retriever_k: Option<usize>,
    pub history_hours: Option<f64>,
    pub history_dir: Option<PathBuf>,
    pub template: Option<PathBuf>,
    pub language: Option<String>,
    pub index: Option<PathBuf>,
}

impl FileConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| StoreError::Config(e.to_string()))
    }
}

/// Immutable settings for one assembly call.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblerConfig {
    pub base_dir: PathBuf,
    /// Budget K: passages plus history exchanges per context.
    pub k: usize,
    /// Lookback for recent conversation; `None` disables history.
    pub history_window: Option<Duration>,
    pub history_dir: PathBuf,
    pub template_path: PathBuf,
    pub directive_path: PathBuf,
    pub index_path: PathBuf,
    pub language: String,
}

/// Positive, finite hours as a window; anything else disables history.
/// Windows longer than `Duration` can hold saturate to `Duration::MAX`.
pub fn hours_to_window(hours: f64) -> Option<Duration> {
    (hours.is_finite() && hours > 0.0)
        .then(|| Duration::try_from_secs_f64(hours * 3600.0).unwrap_or(Duration::MAX))
}

impl AssemblerConfig {
    /// Built-in defaults rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            k: DEFAULT_K,
            history_window: None,
            history_dir: base_dir.join(HISTORY_DIR),
            template_path: base_dir.join(TEMPLATE_FILE),
            directive_path: base_dir.join(DIRECTIVE_FILE),
            index_path: base_dir.join(INDEX_FILE),
            language: DEFAULT_LANGUAGE.to_string(),
            base_dir,
        }
    }

    /// Defaults, then `.rag.toml` under `base_dir` if present, then the
    /// `RETRIEVER_K` environment variable.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let base_dir = std::path::absolute(base_dir)?;
        let mut config = Self::new(&base_dir);

        let file = base_dir.join(CONFIG_FILE);
        if file.is_file() {
            let content = fs::read_to_string(&file)?;
            let parsed = FileConfig::parse(&content).map_err(|e| match e {
                StoreError::Config(msg) => StoreError::Config(format!("{}: {msg}", file.display())),
                other => other,
            })?;
            config = config.apply(parsed);
            tracing::debug!("loaded config from {}", file.display());
        }

        if let Ok(raw) = env::var("RETRIEVER_K") {
            match raw.trim().parse::<usize>() {
                Ok(k) => config.k = k,
                Err(_) => tracing::warn!("ignoring non-numeric RETRIEVER_K={raw:?}"),
            }
        }
        Ok(config)
    }

    /// Overlay values from a parsed config file.
    pub fn apply(mut self, file: FileConfig) -> Self {
        if let Some(k) = file.retriever_k {
            self.k = k;
        }
        if let Some(hours) = file.history_hours {
            self.history_window = hours_to_window(hours);
        }
        if let Some(dir) = file.history_dir {
            self.history_dir = self.resolve(&dir);
        }
        if let Some(template) = file.template {
            self.template_path = self.resolve(&template);
        }
        if let Some(language) = file.language {
            self.language = language;
        }
        if let Some(index) = file.index {
            self.index_path = self.resolve(&index);
        }
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_history_hours(mut self, hours: f64) -> Self {
        self.history_window = hours_to_window(hours);
        self
    }

    pub fn with_template(mut self, path: &Path) -> Self {
        self.template_path = self.resolve(path);
        self
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        rag_core::paths::resolve(path, &self.base_dir)
    }
}
