//! Archive assembly pipeline
//!
//! Runs the whole packaging sequence against one staging root:
//!
//! ```text
//! Idle → DownloadingMods → ExtractingBulkArchive → ResolvingFileSets
//!      → Relocating → PackingClient → PackingServer → Done
//! ```
//!
//! Any stage may end in `Aborted` when an upstream release is missing. The
//! client and server folders are only reset in `Relocating`, after every
//! download has succeeded, so an aborted run leaves them exactly as it found
//! them.
//!
//! # Examples
//!
//! ```no_run
//! use dreamassembler::{Config, GithubClient, Manifest, Pipeline, PipelineOutcome, StagingArea};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let manifest = Manifest::load(config.manifest_path())?;
//! let github = GithubClient::from_config(&config)?;
//!
//! let mut pipeline = Pipeline::new(
//!     StagingArea::new(config.cache_dir()),
//!     &manifest,
//!     &github,
//!     &github,
//! );
//! match pipeline.run()? {
//!     PipelineOutcome::Completed(built) => println!("{}", built.client.path.display()),
//!     PipelineOutcome::Aborted(reason) => eprintln!("aborted: {}", reason),
//! }
//! # Ok(())
//! # }
//! ```

use crate::archive::{build_archive, Archive, Platform};
use crate::exclusions;
use crate::manifest::{Manifest, ModEntry};
use crate::paths::{crawl, relocate};
use crate::progress::{ProgressCallback, ProgressState};
use crate::router::{self, ModArtifact};
use crate::staging::StagingArea;
use crate::Result;
use chrono::Utc;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span, warn};

/// Fetches the release files of one mod
pub trait ModDownloader {
    /// Download `entry` into `destination`, returning the files in release order.
    ///
    /// A missing release is reported as a not-found error
    /// (see [`crate::Error::is_not_found`]).
    fn download_mod(&self, entry: &ModEntry, destination: &Path) -> Result<Vec<PathBuf>>;
}

/// Supplies the bulk "extra files" archive
pub trait BulkArchiveSource {
    /// Make the latest bulk archive available below `cache_dir` and return its path
    fn fetch_bulk_archive(&self, cache_dir: &Path) -> Result<PathBuf>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    DownloadingMods,
    ExtractingBulkArchive,
    ResolvingFileSets,
    Relocating,
    PackingClient,
    PackingServer,
    Done,
    Aborted,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Aborted)
    }

    /// Share of the run's progress bar owned by this state
    pub fn weight(self) -> f64 {
        match self {
            PipelineState::DownloadingMods => 40.0,
            PipelineState::ExtractingBulkArchive => 5.0,
            PipelineState::ResolvingFileSets => 5.0,
            PipelineState::Relocating => 10.0,
            PipelineState::PackingClient => 20.0,
            PipelineState::PackingServer => 20.0,
            PipelineState::Idle | PipelineState::Done | PipelineState::Aborted => 0.0,
        }
    }
}

/// Why a run stopped without producing archives
#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason {
    BulkReleaseNotFound(String),
    ModReleaseNotFound(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::BulkReleaseNotFound(detail) => {
                write!(f, "the modpack repository has no usable release ({})", detail)
            }
            AbortReason::ModReleaseNotFound(name) => {
                write!(f, "no release found for mod {}", name)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuiltArchives {
    pub client: Archive,
    pub server: Archive,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Completed(BuiltArchives),
    Aborted(AbortReason),
}

pub struct Pipeline<'a> {
    staging: StagingArea,
    manifest: &'a Manifest,
    mods: &'a dyn ModDownloader,
    bulk: &'a dyn BulkArchiveSource,
    progress: ProgressState,
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        staging: StagingArea,
        manifest: &'a Manifest,
        mods: &'a dyn ModDownloader,
        bulk: &'a dyn BulkArchiveSource,
    ) -> Self {
        Self {
            staging,
            manifest,
            mods,
            bulk,
            progress: ProgressState::new(None),
            state: PipelineState::Idle,
            history: Vec::new(),
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = ProgressState::new(Some(callback));
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// States visited by the last run, in order
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    pub fn accumulated_progress(&self) -> f64 {
        self.progress.accumulated()
    }

    fn transition(&mut self, state: PipelineState) {
        info!(from = ?self.state, to = ?state, "pipeline transition");
        self.state = state;
        self.history.push(state);
        self.progress.begin_stage(state.weight());
        if state.is_terminal() {
            debug!(history = ?self.history, "pipeline finished");
        }
    }

    fn abort(&mut self, reason: AbortReason) -> PipelineOutcome {
        warn!(%reason, "pipeline aborted");
        self.transition(PipelineState::Aborted);
        PipelineOutcome::Aborted(reason)
    }

    /// Run the whole pipeline once.
    ///
    /// Missing upstream releases end in [`PipelineOutcome::Aborted`]; every
    /// other failure is returned as an error and leaves the staging folders
    /// unusable until the next successful run.
    pub fn run(&mut self) -> Result<PipelineOutcome> {
        let run_id = format!(
            "{}-{}",
            Utc::now().format("%Y%m%dT%H%M%S"),
            std::process::id()
        );
        let span = info_span!(
            "pipeline",
            run = %run_id,
            version = %self.manifest.modpack_version
        );
        let _enter = span.enter();

        self.state = PipelineState::Idle;
        self.history = vec![PipelineState::Idle];
        self.progress.reset();

        let _lock = self.staging.lock()?;
        self.manifest.validate()?;

        let artifacts = match self.download_mods()? {
            Ok(artifacts) => artifacts,
            Err(reason) => return Ok(self.abort(reason)),
        };

        if let Err(reason) = self.extract_bulk_archive()? {
            return Ok(self.abort(reason));
        }

        self.transition(PipelineState::ResolvingFileSets);
        let resolved = exclusions::resolve(
            &self.staging.temp_folder,
            self.manifest.client_exclusions.as_slice(),
            self.manifest.server_exclusions.as_slice(),
        )?;
        let routed = router::route(&artifacts);
        self.progress.finish_stage("resolved the file sets. Progress: {0}%");

        self.transition(PipelineState::Relocating);
        self.staging.reset_platform_folders()?;
        let mod_batches = [
            (&routed.client_paths, &self.staging.client_folder),
            (&routed.server_paths, &self.staging.server_folder),
        ];
        for (files, destination) in mod_batches {
            relocate(files, &self.staging.root, destination)?;
            self.progress
                .report(25.0, "moving mods to the staging folders. Progress: {0}%");
        }
        info!("moving files for the client archive");
        relocate(
            &resolved.client_files,
            &self.staging.temp_folder,
            &self.staging.client_folder,
        )?;
        self.progress
            .report(25.0, "moving files for the client archive. Progress: {0}%");
        info!("moving files for the server archive");
        relocate(
            &resolved.server_files,
            &self.staging.temp_folder,
            &self.staging.server_folder,
        )?;
        self.progress.finish_stage("moving files for the server archive. Progress: {0}%");

        let client = self.pack(PipelineState::PackingClient, Platform::Client)?;
        let server = self.pack(PipelineState::PackingServer, Platform::Server)?;

        self.transition(PipelineState::Done);
        info!(
            client = %client.path.display(),
            server = %server.path.display(),
            "success!"
        );
        Ok(PipelineOutcome::Completed(BuiltArchives { client, server }))
    }

    /// Outer error: fatal failure. Inner error: the run must abort.
    fn download_mods(&mut self) -> Result<std::result::Result<Vec<ModArtifact>, AbortReason>> {
        self.transition(PipelineState::DownloadingMods);

        let entries = &self.manifest.github_mods;
        let destination = self.staging.mods_folder();
        let delta = if entries.is_empty() {
            0.0
        } else {
            100.0 / entries.len() as f64
        };

        let mut artifacts = Vec::with_capacity(entries.len());
        for entry in entries {
            self.progress.report(
                delta,
                &format!(
                    "downloading mods. current mod: {} Progress: {{0}}%",
                    entry.name
                ),
            );

            let paths = match self.mods.download_mod(entry, &destination) {
                Ok(paths) => paths,
                Err(e) if e.is_not_found() => {
                    warn!(mod_name = %entry.name, error = %e, "*** No release found");
                    return Ok(Err(AbortReason::ModReleaseNotFound(entry.name.clone())));
                }
                Err(e) => return Err(e),
            };
            artifacts.push(ModArtifact::from_entry(entry, paths)?);
        }

        self.progress.finish_stage("mods downloaded. Progress: {0}%");
        Ok(Ok(artifacts))
    }

    fn extract_bulk_archive(&mut self) -> Result<std::result::Result<(), AbortReason>> {
        self.transition(PipelineState::ExtractingBulkArchive);

        let archive_path = match self.bulk.fetch_bulk_archive(&self.staging.root) {
            Ok(path) => path,
            Err(e) if e.is_not_found() => {
                return Ok(Err(AbortReason::BulkReleaseNotFound(e.to_string())));
            }
            Err(e) => return Err(e),
        };
        self.progress
            .report(50.0, "unzipping the modpack archive. Progress: {0}%");

        self.staging.extract_bulk_archive(&archive_path)?;
        self.progress.finish_stage("unzipped the pack. Progress: {0}%");
        Ok(Ok(()))
    }

    fn pack(&mut self, state: PipelineState, platform: Platform) -> Result<Archive> {
        self.transition(state);

        let folder = self.staging.folder(platform);
        let files = crawl(folder)?;
        let progress = &mut self.progress;
        let archive = build_archive(
            &files,
            folder,
            &self.staging.root,
            &self.manifest.modpack_version,
            platform,
            Some(&mut |delta: f64, label: &str| progress.report(delta, label)),
        )?;

        self.progress
            .finish_stage(&format!("{} archive packed. Progress: {{0}}%", platform));
        Ok(archive)
    }
}
