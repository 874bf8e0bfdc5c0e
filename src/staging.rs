//! On-disk staging layout and its lifecycle
//!
//! ```text
//! cache/
//! ├── client_archive/      files destined for client-{version}.zip
//! ├── server_archive/      files destined for server-{version}.zip
//! ├── temp/                extracted bulk archive
//! ├── mods/                downloaded mod releases
//! ├── client-{version}.zip
//! └── server-{version}.zip
//! ```
//!
//! Resetting the platform folders is destructive, so a run must hold a
//! [`RunLock`] on the staging root first.

use crate::archive::Platform;
use crate::{Error, Result};
use chrono::Utc;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const CLIENT_FOLDER: &str = "client_archive";
pub const SERVER_FOLDER: &str = "server_archive";
pub const TEMP_FOLDER: &str = "temp";
pub const MODS_FOLDER: &str = "mods";

const LOCK_FILE: &str = ".pipeline.lock";

/// A lock older than this is considered abandoned
const LOCK_STALE_SECS: i64 = 6 * 60 * 60;

/// Paths of the staging layout below one root
#[derive(Debug, Clone, PartialEq)]
pub struct StagingArea {
    pub root: PathBuf,
    pub client_folder: PathBuf,
    pub server_folder: PathBuf,
    pub temp_folder: PathBuf,
}

impl StagingArea {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            client_folder: root.join(CLIENT_FOLDER),
            server_folder: root.join(SERVER_FOLDER),
            temp_folder: root.join(TEMP_FOLDER),
            root,
        }
    }

    /// Create the root if needed
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Download directory for mod releases
    pub fn mods_folder(&self) -> PathBuf {
        self.root.join(MODS_FOLDER)
    }

    pub fn folder(&self, platform: Platform) -> &Path {
        match platform {
            Platform::Client => &self.client_folder,
            Platform::Server => &self.server_folder,
        }
    }

    pub fn archive_path(&self, platform: Platform, version: &str) -> PathBuf {
        self.root.join(platform.archive_name(version))
    }

    /// Delete and recreate the client and server folders
    pub fn reset_platform_folders(&self) -> Result<()> {
        for folder in [&self.client_folder, &self.server_folder] {
            recreate_dir(folder)?;
        }
        info!(root = %self.root.display(), "staging folders reset");
        Ok(())
    }

    /// Delete and recreate the temp folder
    pub fn reset_temp(&self) -> Result<()> {
        recreate_dir(&self.temp_folder)
    }

    /// Unpack the bulk archive into a fresh temp folder.
    ///
    /// Entries whose names would land outside the temp folder are rejected.
    pub fn extract_bulk_archive(&self, archive_path: &Path) -> Result<usize> {
        let file = File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)?;

        self.reset_temp()?;

        let mut extracted = 0;
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let relative = entry.enclosed_name().ok_or_else(|| {
                Error::Other(format!(
                    "Unsafe entry '{}' in {}",
                    entry.name(),
                    archive_path.display()
                ))
            })?;

            let out_path = self.temp_folder.join(relative);
            if entry.is_dir() {
                fs::create_dir_all(&out_path)?;
                continue;
            }

            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut out = File::create(&out_path)?;
            std::io::copy(&mut entry, &mut out)?;
            extracted += 1;
        }

        info!(
            archive = %archive_path.display(),
            files = extracted,
            "unzipped the pack"
        );
        Ok(extracted)
    }

    /// `client-*.zip` and `server-*.zip` files at the root, sorted
    pub fn built_archives(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let mut archives: Vec<PathBuf> = entries
            .flatten()
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                (name.starts_with("client-") || name.starts_with("server-"))
                    && name.ends_with(".zip")
            })
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        archives.sort();
        archives
    }

    /// Remove every staging folder and built archive; downloads are kept
    pub fn clean(&self) -> Result<usize> {
        let mut removed = 0;

        for folder in [&self.client_folder, &self.server_folder, &self.temp_folder] {
            if folder.exists() {
                fs::remove_dir_all(folder)?;
                removed += 1;
            }
        }

        for archive in self.built_archives() {
            fs::remove_file(&archive)?;
            removed += 1;
        }

        Ok(removed)
    }

    /// Remove downloaded mod releases, superseded versions included.
    ///
    /// The next run downloads every mod of the manifest again.
    pub fn clean_downloads(&self) -> Result<usize> {
        let mods = self.mods_folder();
        if !mods.exists() {
            return Ok(0);
        }

        let count = fs::read_dir(&mods)?.count();
        fs::remove_dir_all(&mods)?;
        info!(folder = %mods.display(), count, "downloaded mods removed");
        Ok(count)
    }

    /// Take the single-run lock on this staging root
    pub fn lock(&self) -> Result<RunLock> {
        self.ensure_root()?;
        RunLock::acquire(&self.root.join(LOCK_FILE))
    }
}

fn recreate_dir(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)?;
    }
    fs::create_dir_all(path)?;
    Ok(())
}

/// Exclusive claim on a staging root, released on drop
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// The payload is written to a private file first and hard-linked into
    /// place, so the lock never exists without its content.
    fn acquire(path: &Path) -> Result<Self> {
        let mut staged = path.as_os_str().to_owned();
        staged.push(format!(".{}.tmp", std::process::id()));
        let staged = PathBuf::from(staged);

        let payload = serde_json::json!({
            "pid": std::process::id(),
            "timestamp": Utc::now().timestamp(),
        });
        let mut file = File::create(&staged)?;
        file.write_all(payload.to_string().as_bytes())?;
        file.sync_all()?;
        drop(file);

        let linked = Self::link(&staged, path);
        let _ = fs::remove_file(&staged);
        linked?;

        debug!(lock = %path.display(), "run lock acquired");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    fn link(staged: &Path, path: &Path) -> Result<()> {
        for attempt in 0..2 {
            match fs::hard_link(staged, path) {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    if attempt == 0 && clear_stale_lock(path) {
                        continue;
                    }
                    return Err(Error::RunInProgress(path.to_path_buf()));
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(Error::RunInProgress(path.to_path_buf()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(source) = fs::remove_file(&self.path) {
            warn!("Failed to remove lock {:?}: {}", self.path, source);
        }
    }
}

/// Remove a lock left behind by a dead or long-gone process
fn clear_stale_lock(path: &Path) -> bool {
    let Ok(content) = fs::read_to_string(path) else {
        return false;
    };
    let value: serde_json::Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        // Locks are linked in fully written; only an old-age check applies
        Err(_) => return remove_if_old(path),
    };

    let pid = value.get("pid").and_then(|v| v.as_u64()).unwrap_or_default() as u32;
    let timestamp = value
        .get("timestamp")
        .and_then(|v| v.as_i64())
        .unwrap_or_default();
    let expired = Utc::now().timestamp().saturating_sub(timestamp) > LOCK_STALE_SECS;

    #[cfg(target_os = "linux")]
    let dead = !PathBuf::from(format!("/proc/{pid}")).exists();
    #[cfg(not(target_os = "linux"))]
    let dead = false;

    if expired || dead {
        warn!(lock = %path.display(), pid, "removing stale run lock");
        return fs::remove_file(path).is_ok();
    }
    false
}

/// Remove an unreadable lock once its file is older than the stale limit
fn remove_if_old(path: &Path) -> bool {
    let age = fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok());
    match age {
        Some(age) if age.as_secs() > LOCK_STALE_SECS as u64 => {
            warn!(lock = %path.display(), "removing unreadable run lock");
            fs::remove_file(path).is_ok()
        }
        _ => false,
    }
}
