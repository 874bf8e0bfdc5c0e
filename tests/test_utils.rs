//! Test utilities and helpers for DreamAssembler integration tests.
//!
//! Provides in-memory stand-ins for the download collaborators, zip helpers
//! and a ready-made manifest.

#![allow(dead_code)]

use dreamassembler::{BulkArchiveSource, Error, Manifest, ModDownloader, ModEntry, Result, Side};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// Serves mod releases from a table instead of GitHub
#[derive(Default)]
pub struct FakeMods {
    releases: HashMap<String, Vec<(String, String)>>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeMods {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a release of `name` carrying `(file name, content)` assets
    pub fn with_release(mut self, name: &str, files: &[(&str, &str)]) -> Self {
        self.releases.insert(
            name.to_string(),
            files
                .iter()
                .map(|(f, c)| (f.to_string(), c.to_string()))
                .collect(),
        );
        self
    }
}

impl ModDownloader for FakeMods {
    fn download_mod(&self, entry: &ModEntry, destination: &Path) -> Result<Vec<PathBuf>> {
        self.calls.borrow_mut().push(entry.name.clone());

        let files = self
            .releases
            .get(&entry.name)
            .ok_or_else(|| Error::ReleaseNotFound(entry.name.clone()))?;

        fs::create_dir_all(destination)?;
        let mut paths = Vec::new();
        for (name, content) in files {
            let path = destination.join(name);
            fs::write(&path, content)?;
            paths.push(path);
        }
        Ok(paths)
    }
}

/// Builds the bulk archive on demand from a list of entries
pub struct FakeBulk {
    entries: Vec<(String, String)>,
    missing: bool,
    pub fetches: Cell<usize>,
}

impl FakeBulk {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(n, c)| (n.to_string(), c.to_string()))
                .collect(),
            missing: false,
            fetches: Cell::new(0),
        }
    }

    /// A modpack repository without any release
    pub fn missing() -> Self {
        Self {
            entries: Vec::new(),
            missing: true,
            fetches: Cell::new(0),
        }
    }
}

impl BulkArchiveSource for FakeBulk {
    fn fetch_bulk_archive(&self, cache_dir: &Path) -> Result<PathBuf> {
        self.fetches.set(self.fetches.get() + 1);
        if self.missing {
            return Err(Error::LatestReleaseNotFound(
                "GT-New-Horizons-Modpack".to_string(),
            ));
        }

        fs::create_dir_all(cache_dir)?;
        let path = cache_dir.join("pack-extras.zip");
        let entries: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(n, c)| (n.as_str(), c.as_str()))
            .collect();
        write_zip(&path, &entries);
        Ok(path)
    }
}

/// Write a zip holding `(name, content)` entries
pub fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let mut zip = zip::ZipWriter::new(File::create(path).expect("Failed to create zip"));
    for (name, content) in entries {
        zip.start_file(*name, SimpleFileOptions::default())
            .expect("Failed to start zip entry");
        zip.write_all(content.as_bytes())
            .expect("Failed to write zip entry");
    }
    zip.finish().expect("Failed to finish zip");
}

/// Member names of a zip, sorted
pub fn zip_names(path: &Path) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(File::open(path).expect("Failed to open zip"))
        .expect("Failed to read zip");
    let mut names: Vec<String> = archive.file_names().map(|n| n.to_string()).collect();
    names.sort();
    names
}

/// Content of one zip member
pub fn zip_entry(path: &Path, name: &str) -> String {
    let mut archive = zip::ZipArchive::new(File::open(path).expect("Failed to open zip"))
        .expect("Failed to read zip");
    let mut entry = archive.by_name(name).expect("Missing zip entry");
    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .expect("Failed to read zip entry");
    content
}

/// Three mods (one per side) plus a bulk tree with side-specific files
pub fn sample_manifest() -> Manifest {
    let mut manifest = Manifest::new("2.1.0");
    manifest
        .github_mods
        .push(ModEntry::new("ClientOnly", Side::Client));
    manifest
        .github_mods
        .push(ModEntry::new("ServerOnly", Side::Server));
    manifest.github_mods.push(ModEntry::new("Shared", Side::Both));
    manifest.client_exclusions = vec!["scripts/server.zs".to_string()];
    manifest.server_exclusions = vec![
        "config/client.cfg".to_string(),
        "./resourcepacks/pack.zip".to_string(),
    ];
    manifest
}

pub fn sample_mods() -> FakeMods {
    FakeMods::new()
        .with_release("ClientOnly", &[("ClientOnly-1.0.jar", "client-jar")])
        .with_release("ServerOnly", &[("ServerOnly-1.0.jar", "server-jar")])
        .with_release("Shared", &[("Shared-1.0.jar", "shared-jar")])
}

pub fn sample_bulk() -> FakeBulk {
    FakeBulk::new(&[
        ("config/common.cfg", "common"),
        ("config/client.cfg", "client"),
        ("scripts/server.zs", "server"),
        ("resourcepacks/pack.zip", "pack"),
    ])
}
