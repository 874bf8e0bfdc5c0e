//! Cache management commands for the staging root
//!
//! - `cache path` - Show the staging root
//! - `cache clean` - Remove staging folders and built archives
//! - `cache clean --downloads` - Also drop downloaded mod releases

use anyhow::Result;
use dreamassembler::{Config, StagingArea};
use std::path::Path;
use walkdir::WalkDir;

/// Format bytes as human-readable size
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Total size of the files below `path`
fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Show the staging root
pub fn run_path() -> Result<()> {
    let config = Config::load()?;
    println!("{}", config.cache_dir().display());
    Ok(())
}

/// Remove staging folders and built archives; with `downloads`, also the
/// downloaded mod releases
pub fn run_clean(dry_run: bool, downloads: bool) -> Result<()> {
    let config = Config::load()?;
    let staging = StagingArea::new(config.cache_dir());

    let mut targets: Vec<_> = [
        &staging.client_folder,
        &staging.server_folder,
        &staging.temp_folder,
    ]
    .into_iter()
    .filter(|p| p.exists())
    .cloned()
    .collect();
    targets.extend(staging.built_archives());

    let mods_folder = staging.mods_folder();
    if downloads && mods_folder.exists() {
        targets.push(mods_folder);
    }

    if targets.is_empty() {
        println!("Nothing to clean in {}", staging.root.display());
        return Ok(());
    }

    let total_size: u64 = targets.iter().map(|p| dir_size(p)).sum();

    if dry_run {
        println!("[DRY RUN] Would remove:");
        for path in &targets {
            println!("  {}", path.display());
        }
        println!();
        println!("Would free {}", format_size(total_size));
        return Ok(());
    }

    // Held so a running build is never cleaned from under it
    let _lock = staging.lock()?;
    let removed = staging.clean()?;
    println!(
        "Removed {} entries, freed {}",
        removed,
        format_size(total_size)
    );

    if downloads {
        let jars = staging.clean_downloads()?;
        println!("Removed {} downloaded mod files", jars);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
