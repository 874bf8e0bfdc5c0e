//! Side routing of downloaded mod artifacts
//!
//! A pure partition: no network or filesystem access happens here.

use crate::manifest::{ModEntry, Side};
use crate::Result;
use std::path::PathBuf;

/// A mod whose release files are already on disk
#[derive(Debug, Clone, PartialEq)]
pub struct ModArtifact {
    pub name: String,
    pub side: Side,
    pub downloaded_paths: Vec<PathBuf>,
}

impl ModArtifact {
    /// Pair a manifest entry with its downloaded files, validating the side
    pub fn from_entry(entry: &ModEntry, downloaded_paths: Vec<PathBuf>) -> Result<Self> {
        Ok(Self {
            name: entry.name.clone(),
            side: entry.side()?,
            downloaded_paths,
        })
    }
}

/// Mod files destined for each platform, in manifest order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutedPaths {
    pub client_paths: Vec<PathBuf>,
    pub server_paths: Vec<PathBuf>,
}

/// Split artifacts into client and server path lists.
///
/// BOTH-side files are appended to both lists; nothing is deduplicated.
pub fn route(artifacts: &[ModArtifact]) -> RoutedPaths {
    let mut routed = RoutedPaths::default();

    for artifact in artifacts {
        if artifact.side.on_client() {
            routed
                .client_paths
                .extend(artifact.downloaded_paths.iter().cloned());
        }
        if artifact.side.on_server() {
            routed
                .server_paths
                .extend(artifact.downloaded_paths.iter().cloned());
        }
    }

    routed
}
