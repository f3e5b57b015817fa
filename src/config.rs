//! Configuration file support.
//!
//! Loads and saves store configuration from TOML files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    sql::engine::flat::{AUDIT_LOG, PENDING_LOG},
};

/// Name of the configuration file looked up inside the data directory
pub const CONFIG_FILE: &str = "flatdb.toml";

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `databases/` and the transaction logs.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Pending log file name, relative to the data directory.
    #[serde(default = "default_pending_log")]
    pub pending_log: String,

    /// Audit log file name, relative to the data directory.
    #[serde(default = "default_audit_log")]
    pub audit_log: String,

    /// Relationship label recorded when a REFERENCES clause has none.
    #[serde(default = "default_relation")]
    pub default_relation: String,

    /// tracing filter used by the CLI when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_pending_log() -> String {
    PENDING_LOG.to_string()
}

fn default_audit_log() -> String {
    AUDIT_LOG.to_string()
}

fn default_relation() -> String {
    "relates to".to_string()
}

fn default_log_filter() -> String {
    "flatdb=warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            pending_log: default_pending_log(),
            audit_log: default_audit_log(),
            default_relation: default_relation(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a builder from the defaults.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Loads the configuration for a data directory.
    ///
    /// Looks in the following locations:
    /// 1. the explicit `path`, if given
    /// 2. `<data_dir>/flatdb.toml`
    /// 3. returns defaults rooted at `data_dir`
    ///
    /// The data directory argument always wins over the file's `data_dir`.
    pub fn load(path: Option<&Path>, data_dir: Option<&Path>) -> Result<Self> {
        let mut config = match (path, data_dir) {
            (Some(path), _) => Self::from_file(path)?,
            (None, Some(dir)) if dir.join(CONFIG_FILE).is_file() => {
                Self::from_file(&dir.join(CONFIG_FILE))?
            }
            _ => Self::default(),
        };
        if let Some(dir) = data_dir {
            config.data_dir = dir.to_path_buf();
        }
        Ok(config)
    }
}

/// Builder for [`Config`], mostly used by tests.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn pending_log(mut self, name: impl Into<String>) -> Self {
        self.config.pending_log = name.into();
        self
    }

    pub fn audit_log(mut self, name: impl Into<String>) -> Self {
        self.config.audit_log = name.into();
        self
    }

    pub fn default_relation(mut self, label: impl Into<String>) -> Self {
        self.config.default_relation = label.into();
        self
    }

    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.log_filter = filter.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
