//! File enumeration and relative-path-preserving relocation
//!
//! Every set operation in the pipeline works on [`FileSet`]s of normalized
//! absolute paths, so `root/a/b.txt` and `root/./a/b.txt` are the same member.

use crate::{Error, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A set of file locations, unique by normalized path
pub type FileSet = BTreeSet<PathBuf>;

/// Lexically normalize a path: drop `.` components and fold `..` into its parent.
///
/// The filesystem is not consulted, so symlinks are not resolved.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Recursively list every regular file below `root`.
///
/// Directories are traversed but never returned. Symbolic links are not followed.
pub fn crawl(root: &Path) -> Result<FileSet> {
    let mut files = FileSet::new();

    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.insert(normalize_path(entry.path()));
        }
    }

    debug!(root = %root.display(), count = files.len(), "crawled directory");
    Ok(files)
}

/// Copy `files` from below `source_root` to the same relative location below
/// `destination_root`, creating missing directories on demand.
///
/// Stops at the first failure; the destination may then hold a partial tree.
pub fn relocate<I, P>(files: I, source_root: &Path, destination_root: &Path) -> Result<usize>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let source_root = normalize_path(source_root);
    let mut copied = 0;

    for file in files {
        let file = normalize_path(file.as_ref());
        let relative = file.strip_prefix(&source_root)?;
        let dst = destination_root.join(relative);

        if let Some(parent) = dst.parent() {
            if !parent.is_dir() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::copy(&file, &dst).map_err(|source| Error::Copy {
            from: file.clone(),
            to: dst.clone(),
            source,
        })?;
        copied += 1;
    }

    debug!(
        from = %source_root.display(),
        to = %destination_root.display(),
        copied,
        "relocated files"
    );
    Ok(copied)
}
