//! Modpack manifest handling
//!
//! The manifest lists the pack version, every GitHub-hosted mod with the side
//! it is needed on, and the per-platform exclusion lists applied to the bulk
//! archive. It is read-only while a pipeline runs; only the add-mod flow
//! mutates and rewrites it.
//!
//! # Examples
//!
//! ```no_run
//! use dreamassembler::Manifest;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manifest = Manifest::load("gtnh-modpack.json")?;
//! manifest.validate()?;
//! println!("{} mods in {}", manifest.github_mods.len(), manifest.modpack_version);
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Component, Path};
use std::str::FromStr;

/// Which platform(s) a mod is needed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Client,
    Server,
    Both,
}

impl Side {
    pub fn on_client(self) -> bool {
        matches!(self, Side::Client | Side::Both)
    }

    pub fn on_server(self) -> bool {
        matches!(self, Side::Server | Side::Both)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Client => "CLIENT",
            Side::Server => "SERVER",
            Side::Both => "BOTH",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "CLIENT" => Ok(Side::Client),
            "SERVER" => Ok(Side::Server),
            "BOTH" => Ok(Side::Both),
            other => Err(other.to_string()),
        }
    }
}

/// A mod hosted as a GitHub repository of the organization
///
/// `side` is kept as written in the file so that an unknown value surfaces as
/// a configuration error from [`Manifest::validate`] instead of a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModEntry {
    /// Repository name, also used as the mod name
    pub name: String,

    /// CLIENT, SERVER or BOTH
    pub side: String,

    /// Release tag to download; the latest release when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

impl ModEntry {
    pub fn new(name: impl Into<String>, side: Side) -> Self {
        Self {
            name: name.into(),
            side: side.as_str().to_string(),
            version: None,
            license: None,
        }
    }

    /// Parsed side, failing on anything but CLIENT, SERVER or BOTH
    pub fn side(&self) -> Result<Side> {
        self.side.parse().map_err(|side| Error::InvalidSide {
            mod_name: self.name.clone(),
            side,
        })
    }
}

/// Modpack manifest file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Version stamped into the archive names
    pub modpack_version: String,

    /// Paths (relative to the bulk archive root) left out of the client archive
    #[serde(default)]
    pub client_exclusions: Vec<String>,

    /// Paths (relative to the bulk archive root) left out of the server archive
    #[serde(default)]
    pub server_exclusions: Vec<String>,

    #[serde(default)]
    pub github_mods: Vec<ModEntry>,
}

impl Manifest {
    pub fn new(modpack_version: impl Into<String>) -> Self {
        Self {
            modpack_version: modpack_version.into(),
            client_exclusions: Vec::new(),
            server_exclusions: Vec::new(),
            github_mods: Vec::new(),
        }
    }

    /// Load a manifest from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Error::InvalidManifest(format!(
                "{} not found",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)?;
        let manifest: Manifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    /// Write the manifest as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content + "\n")?;
        Ok(())
    }

    /// Check everything a run depends on before any file is touched
    pub fn validate(&self) -> Result<()> {
        if self.modpack_version.trim().is_empty() {
            return Err(Error::InvalidManifest(
                "modpack_version must not be empty".to_string(),
            ));
        }

        for entry in &self.github_mods {
            entry.side()?;
        }

        for exclusion in self.client_exclusions.iter().chain(&self.server_exclusions) {
            validate_exclusion(exclusion)?;
        }

        Ok(())
    }

    pub fn get_github_mod(&self, name: &str) -> Option<&ModEntry> {
        self.github_mods.iter().find(|m| m.name == name)
    }

    /// Register a new mod; a mod of the same name is left untouched
    pub fn add_github_mod(&mut self, entry: ModEntry) -> Result<()> {
        if self.get_github_mod(&entry.name).is_some() {
            return Err(Error::AlreadyExists(entry.name));
        }
        entry.side()?;
        self.github_mods.push(entry);
        Ok(())
    }

    /// Sort mods by name, ignoring case
    pub fn sort_mods(&mut self) {
        self.github_mods.sort_by_key(|m| m.name.to_lowercase());
    }
}

/// An exclusion must be a non-empty relative path that stays inside the root
pub fn validate_exclusion(entry: &str) -> Result<()> {
    let path = Path::new(entry);

    if entry.trim().is_empty() {
        return Err(Error::InvalidExclusion("empty entry".to_string()));
    }

    let mut depth: usize = 0;
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                return Err(Error::InvalidExclusion(format!(
                    "'{}' must be relative to the pack root",
                    entry
                )));
            }
            Component::ParentDir => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    Error::InvalidExclusion(format!("'{}' escapes the pack root", entry))
                })?;
            }
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
        }
    }

    if depth == 0 {
        return Err(Error::InvalidExclusion(format!(
            "'{}' names the pack root itself",
            entry
        )));
    }

    Ok(())
}
