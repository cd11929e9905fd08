//! Configuration for tips.
//!
//! Root resolution order:
//! 1. Explicit path passed to Config::with_root() / Config::load_from()
//! 2. TIPS_ROOT environment variable
//! 3. Platform data directory
//! 4. Fallback: ~/.local/share/tips

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable overriding the data root.
pub const ROOT_ENV: &str = "TIPS_ROOT";
/// Environment variable holding the API key. Never written to disk.
pub const API_KEY_ENV: &str = "TIPS_API_KEY";

const CONFIG_FILE: &str = "config.toml";

/// tips configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root directory for all tips data.
    #[serde(skip)]
    pub root: PathBuf,

    /// Tailnet to query; `-` means the key's default tailnet.
    #[serde(default = "default_tailnet")]
    pub tailnet: String,

    /// How long a built index stays fresh.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Local client binary used for status enrichment.
    #[serde(default = "default_cli_path")]
    pub cli_path: String,

    /// Default sort order, e.g. `user,machine:dsc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,

    /// Read devices from this JSON file instead of the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices_file: Option<PathBuf>,
}

fn default_tailnet() -> String {
    "-".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_api_timeout_secs() -> u64 {
    5
}

fn default_api_base_url() -> String {
    "https://api.tailscale.com".to_string()
}

fn default_cli_path() -> String {
    "tailscale".to_string()
}

impl Config {
    /// Create a default config rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tailnet: default_tailnet(),
            cache_ttl_secs: default_cache_ttl_secs(),
            api_timeout_secs: default_api_timeout_secs(),
            api_base_url: default_api_base_url(),
            cli_path: default_cli_path(),
            sort: None,
            devices_file: None,
        }
    }

    /// Load config from the resolved root, writing the defaults there on
    /// first use.
    pub fn load() -> Result<Self> {
        let root = resolve_root()?;
        Self::load_or_init(&root)
    }

    /// Like [`load_from`](Self::load_from), but a missing config file is
    /// created with the defaults so there is something to edit.
    pub fn load_or_init(root: &Path) -> Result<Self> {
        let config = Self::load_from(root)?;
        if !config.config_path().exists() {
            config.save()?;
            tracing::info!(path = %config.config_path().display(), "wrote default config");
        }
        Ok(config)
    }

    /// Load config from `root/config.toml`, or defaults when it is missing.
    pub fn load_from(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let mut config: Config = toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
            config.root = root.to_path_buf();
            Ok(config)
        } else {
            Ok(Self::with_root(root))
        }
    }

    /// Save config to `root/config.toml`.
    pub fn save(&self) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        crate::atomic::write_file(&self.config_path(), contents.as_bytes())?;
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// API key from the environment, if set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty())
    }

    /// Identity the index is kept under. A devices file gets its own index
    /// so it never mixes with data from the API.
    pub fn scope(&self) -> String {
        match &self.devices_file {
            Some(path) => format!("file:{}", path.display()),
            None => self.tailnet.clone(),
        }
    }

    // Path helpers

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Directory holding one index file per tailnet.
    pub fn index_dir(&self) -> PathBuf {
        self.root.join("index")
    }
}

/// Resolve the data root using the standard resolution order.
pub fn resolve_root() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(ROOT_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    if let Some(proj_dirs) = ProjectDirs::from("", "", "tips") {
        return Ok(proj_dirs.data_dir().to_path_buf());
    }

    let home = std::env::var("HOME")
        .map_err(|_| Error::Config("Could not determine home directory".to_string()))?;
    Ok(PathBuf::from(home).join(".local/share/tips"))
}
