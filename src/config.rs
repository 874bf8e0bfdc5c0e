//! User configuration management
//!
//! Configuration is stored in TOML format at `~/.dreamassembler/config.toml`.
//!
//! # Examples
//!
//! ```no_run
//! use dreamassembler::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::load()?;
//! println!("Cache: {}", config.cache_dir().display());
//!
//! config.set("github.organization", "MyOrg")?;
//! config.save()?;
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// User configuration file (`~/.dreamassembler/config.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// GitHub access settings
    #[serde(default)]
    pub github: GithubConfig,

    /// Where the manifest and the staging cache live
    #[serde(default)]
    pub paths: PathsConfig,

    /// Bulk "extra files" archive settings
    #[serde(default)]
    pub bulk: BulkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// REST API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Organization owning the mod repositories
    #[serde(default = "default_organization")]
    pub organization: String,

    /// Repository whose releases carry the bulk archive
    #[serde(default = "default_modpack_repo")]
    pub modpack_repo: String,

    /// Personal access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Token taken from the environment; never written back to disk
    #[serde(skip)]
    pub env_token: Option<String>,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_organization() -> String {
    "GTNewHorizons".to_string()
}

fn default_modpack_repo() -> String {
    "GT-New-Horizons-Modpack".to_string()
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            organization: default_organization(),
            modpack_repo: default_modpack_repo(),
            token: None,
            env_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Staging root holding client_archive/, server_archive/, temp/ and the built zips
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Modpack manifest file
    #[serde(default = "default_manifest")]
    pub manifest: String,
}

fn default_cache_dir() -> String {
    "~/.dreamassembler/cache".to_string()
}

fn default_manifest() -> String {
    "gtnh-modpack.json".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            manifest: default_manifest(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    /// Re-download a cached bulk archive whose checksum sidecar is missing or wrong
    #[serde(default = "default_verify_checksum")]
    pub verify_checksum: bool,
}

fn default_verify_checksum() -> bool {
    true
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            verify_checksum: default_verify_checksum(),
        }
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// Uses DREAMASSEMBLER_CONFIG_DIR if set, otherwise ~/.dreamassembler/config.toml
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(config_dir) = std::env::var("DREAMASSEMBLER_CONFIG_DIR") {
            return Ok(PathBuf::from(config_dir).join("config.toml"));
        }

        let home = dirs::home_dir()
            .ok_or_else(|| Error::Other("Could not find home directory".to_string()))?;

        Ok(home.join(".dreamassembler").join("config.toml"))
    }

    /// Load config from file, or the defaults if it doesn't exist
    ///
    /// Environment variable overrides:
    /// - `DREAMASSEMBLER_TOKEN`, then `GITHUB_TOKEN`: take precedence over `github.token`
    ///   for this process only
    /// - `DREAMASSEMBLER_CONFIG_DIR`: overrides the config directory location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;

        let mut config = if !path.exists() {
            Self::default()
        } else {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        };

        for var in ["DREAMASSEMBLER_TOKEN", "GITHUB_TOKEN"] {
            if let Ok(token) = std::env::var(var) {
                if !token.is_empty() {
                    config.github.env_token = Some(token);
                    break;
                }
            }
        }

        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Token to authenticate with: the environment first, then the file
    pub fn token(&self) -> Option<&str> {
        self.github
            .env_token
            .as_deref()
            .or(self.github.token.as_deref())
    }

    /// Staging root with `~` expanded
    pub fn cache_dir(&self) -> PathBuf {
        expand(&self.paths.cache_dir)
    }

    /// Manifest path with `~` expanded
    pub fn manifest_path(&self) -> PathBuf {
        expand(&self.paths.manifest)
    }

    /// Set a value by dotted key (e.g. `github.organization`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "github.api_url" => self.github.api_url = value.trim_end_matches('/').to_string(),
            "github.organization" => self.github.organization = value.to_string(),
            "github.modpack_repo" => self.github.modpack_repo = value.to_string(),
            "github.token" => {
                self.github.token = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
            "paths.cache_dir" => self.paths.cache_dir = value.to_string(),
            "paths.manifest" => self.paths.manifest = value.to_string(),
            "bulk.verify_checksum" => {
                self.bulk.verify_checksum = value.parse().map_err(|_| {
                    Error::Other(format!("Expected true or false for {}, got '{}'", key, value))
                })?
            }
            _ => return Err(Error::Other(format!("Unknown configuration key: {}", key))),
        }
        Ok(())
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
