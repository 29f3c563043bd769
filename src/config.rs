//! Configuration file support for gistghost
//!
//! Reads from .gistghost/config.toml, with environment overrides.

use crate::thought::DEFAULT_PRIORITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_DIR: &str = ".gistghost";
pub const INDEX_FILE: &str = "index.json";
pub const HOST_DIR: &str = "gists";

pub const ENV_INDEX_PATH: &str = "GISTGHOST_INDEX_PATH";
pub const ENV_HOST_DIR: &str = "GISTGHOST_HOST_DIR";
pub const ENV_ORIGIN: &str = "GISTGHOST_ORIGIN";

/// Configuration structure
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Identity of this node in the network
    #[serde(default)]
    pub node: NodeConfig,

    /// Where the index snapshot lives
    #[serde(default)]
    pub index: IndexConfig,

    /// Where locally hosted documents live
    #[serde(default)]
    pub host: HostConfig,
}

/// Node identity settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NodeConfig {
    /// Origin tag stamped on every thought this node creates
    /// Default: "gistghost-local"
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Priority used when `create` gets none
    /// Default: 5
    #[serde(default = "default_priority")]
    pub default_priority: i64,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct IndexConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct HostConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_origin() -> String {
    "gistghost-local".to_string()
}

fn default_priority() -> i64 {
    DEFAULT_PRIORITY as i64
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            default_priority: default_priority(),
        }
    }
}

impl Config {
    /// Load config from .gistghost/config.toml, then apply environment overrides.
    /// Returns default config if the file doesn't exist or doesn't parse.
    pub fn load() -> Self {
        let mut config: Config = Self::find_config_path()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|contents| match toml::from_str(&contents) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring unreadable config.toml");
                    None
                }
            })
            .unwrap_or_default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(path) = std::env::var(ENV_INDEX_PATH) {
            self.index.path = Some(PathBuf::from(path));
        }
        if let Ok(dir) = std::env::var(ENV_HOST_DIR) {
            self.host.dir = Some(PathBuf::from(dir));
        }
        if let Ok(origin) = std::env::var(ENV_ORIGIN) {
            if !origin.is_empty() {
                self.node.origin = origin;
            }
        }
    }

    /// Walk up the directory tree to find the .gistghost folder (like git finds .git)
    fn find_data_dir() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut dir = current_dir.as_path();

        loop {
            let candidate = dir.join(CONFIG_DIR);
            if candidate.is_dir() {
                return Some(candidate);
            }

            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
        None
    }

    fn find_config_path() -> Option<PathBuf> {
        let path = Self::find_data_dir()?.join("config.toml");
        path.exists().then_some(path)
    }

    fn data_dir() -> PathBuf {
        Self::find_data_dir().unwrap_or_else(|| Path::new(CONFIG_DIR).to_path_buf())
    }

    /// Snapshot file: explicit setting, else `<nearest .gistghost>/index.json`
    pub fn index_path(&self) -> PathBuf {
        self.index
            .path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join(INDEX_FILE))
    }

    /// Directory for locally hosted documents
    pub fn host_dir(&self) -> PathBuf {
        self.host
            .dir
            .clone()
            .unwrap_or_else(|| Self::data_dir().join(HOST_DIR))
    }
}
