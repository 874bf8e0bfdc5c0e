//! Per-platform file selection from the extracted bulk archive

use crate::manifest::validate_exclusion;
use crate::paths::{crawl, normalize_path, FileSet};
use crate::Result;
use std::path::Path;
use tracing::{debug, info};

/// Files of the bulk tree that ship with each platform
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedFiles {
    pub client_files: FileSet,
    pub server_files: FileSet,
}

/// `discovered - exclusions`, with exclusions joined to `root` and normalized.
///
/// Entries that name no discovered file are ignored.
pub fn subtract<S: AsRef<str>>(
    discovered: &FileSet,
    root: &Path,
    exclusions: &[S],
) -> Result<FileSet> {
    let root = normalize_path(root);
    let mut excluded = FileSet::new();

    for entry in exclusions {
        let entry = entry.as_ref();
        validate_exclusion(entry)?;
        excluded.insert(normalize_path(&root.join(entry)));
    }

    let kept: FileSet = discovered
        .iter()
        .map(|f| normalize_path(f))
        .filter(|f| !excluded.contains(f))
        .collect();

    debug!(
        discovered = discovered.len(),
        excluded = discovered.len().saturating_sub(kept.len()),
        "applied exclusion list"
    );
    Ok(kept)
}

/// Crawl `root` and compute the client and server file sets.
pub fn resolve<S: AsRef<str>>(
    root: &Path,
    client_exclusions: &[S],
    server_exclusions: &[S],
) -> Result<ResolvedFiles> {
    let discovered = crawl(root)?;

    let resolved = ResolvedFiles {
        client_files: subtract(&discovered, root, client_exclusions)?,
        server_files: subtract(&discovered, root, server_exclusions)?,
    };

    info!(
        discovered = discovered.len(),
        client = resolved.client_files.len(),
        server = resolved.server_files.len(),
        "resolved bulk file sets"
    );
    Ok(resolved)
}
