use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tasklist_core::CompletionFilter;
use tasklist_core::ViewCriteria;
use tasklist_store::DEFAULT_SNAPSHOT_KEY;

/// Directory name used under the platform config and data directories.
pub const APP_DIR: &str = "tasklist";
/// File name of the configuration file.
pub const CONFIG_FILE: &str = "config.toml";
const DEFAULT_COLLECTION: &str = "tasks";

/// Top-level configuration loaded from `config.toml`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TasklistConfig {
    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Initial list view settings.
    #[serde(default)]
    pub view: ViewConfig,
}

impl TasklistConfig {
    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Parse and validate configuration text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.storage.key.trim().is_empty() {
            bail!("storage key must not be empty");
        }
        if self.storage.collection.trim().is_empty() {
            bail!("storage collection must not be empty");
        }
        Ok(())
    }
}

/// Which storage provider backs the task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// JSON snapshot on the local filesystem.
    #[default]
    Local,
    /// Realtime provider over an in-process document collection.
    Memory,
}

impl Backend {
    /// String representation used in configuration files.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "memory" => Ok(Self::Memory),
            other => bail!("unknown backend '{other}' (expected local or memory)"),
        }
    }
}

/// `[storage]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Provider kind.
    #[serde(default)]
    pub backend: Backend,
    /// Directory of the local snapshot; defaults to the platform data directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Key of the local snapshot.
    #[serde(default = "default_key")]
    pub key: String,
    /// Name of the remote collection.
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            dir: None,
            key: default_key(),
            collection: default_collection(),
        }
    }
}

fn default_key() -> String {
    DEFAULT_SNAPSHOT_KEY.to_owned()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_owned()
}

/// `[view]` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewConfig {
    /// Completion filter applied at startup.
    #[serde(default)]
    pub filter: CompletionFilter,
    /// Whether the completed section starts expanded.
    #[serde(default)]
    pub show_completed: bool,
}

impl ViewConfig {
    /// Initial criteria for a list view.
    pub fn criteria(&self) -> ViewCriteria {
        ViewCriteria::default().with_filter(self.filter)
    }
}
