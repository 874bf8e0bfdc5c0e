//! Packing a staging folder into a versioned zip
//!
//! Archive members are stored relative to the staging folder, with `/`
//! separators and no extra prefix. Members are written in sorted order so two
//! builds of the same file set carry the same entries with the same contents.

use crate::paths::{normalize_path, FileSet};
use crate::Result;
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Target platform of an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Client,
    Server,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Client => "client",
            Platform::Server => "server",
        }
    }

    /// `{platform}-{version}.zip`
    pub fn archive_name(self, version: &str) -> String {
        format!("{}-{}.zip", self.as_str(), version)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A built archive
#[derive(Debug, Clone, PartialEq)]
pub struct Archive {
    pub path: PathBuf,
    pub version: String,
    pub platform: Platform,
    pub file_count: usize,
}

/// Zip member name for `file`, relative to `staging_folder`
fn member_name(file: &Path, staging_folder: &Path) -> Result<String> {
    let relative = normalize_path(file)
        .strip_prefix(normalize_path(staging_folder))?
        .to_path_buf();

    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

/// Write `files` into `{output_dir}/{platform}-{version}.zip`.
///
/// An existing archive of that name is deleted first. `progress` receives
/// `100 / files.len()` per member written.
pub fn build_archive(
    files: &FileSet,
    staging_folder: &Path,
    output_dir: &Path,
    version: &str,
    platform: Platform,
    mut progress: Option<&mut dyn FnMut(f64, &str)>,
) -> Result<Archive> {
    let archive_path = output_dir.join(platform.archive_name(version));

    if archive_path.exists() {
        fs::remove_file(&archive_path)?;
        info!(path = %archive_path.display(), "previous {} archive deleted", platform);
    }
    fs::create_dir_all(output_dir)?;

    info!(
        path = %archive_path.display(),
        files = files.len(),
        "zipping {} archive",
        platform
    );

    let delta = if files.is_empty() {
        0.0
    } else {
        100.0 / files.len() as f64
    };
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut zip = ZipWriter::new(File::create(&archive_path)?);

    for file in files {
        let name = member_name(file, staging_folder)?;

        if let Some(report) = progress.as_deref_mut() {
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            report(
                delta,
                &format!(
                    "Packing {} archive version {}: {}. Progress: {{0}}%",
                    platform, version, file_name
                ),
            );
        }

        zip.start_file(name, options)?;
        let mut source = File::open(file)?;
        std::io::copy(&mut source, &mut zip)?;
    }

    zip.finish()?;
    info!(path = %archive_path.display(), "{} archive written", platform);

    Ok(Archive {
        path: archive_path,
        version: version.to_string(),
        platform,
        file_count: files.len(),
    })
}
