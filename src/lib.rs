//! DreamAssembler - builds the distributable archives of a community modpack
//!
//! Mods are fetched from their GitHub releases and routed to the client
//! and/or server side. The pack's bulk "extra files" archive (configs,
//! scripts) is extracted and filtered through per-platform exclusion lists.
//! Both results are staged into clean folders and packed as
//! `client-{version}.zip` and `server-{version}.zip`.
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
//! let mut pipeline = Pipeline::new(StagingArea::new(config.cache_dir()), &manifest, &github, &github);
//! if let PipelineOutcome::Completed(built) = pipeline.run()? {
//!     println!("client: {}", built.client.path.display());
//!     println!("server: {}", built.server.path.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`paths`] - Recursive file enumeration and relative-path relocation
//! - [`router`] - Client/server routing of downloaded mods
//! - [`exclusions`] - Per-platform filtering of the bulk archive
//! - [`staging`] - Staging folder layout, reset lifecycle and run lock
//! - [`archive`] - Zip packing of a staging folder
//! - [`pipeline`] - The orchestrator tying the stages together
//! - [`progress`] - Weighted progress reporting
//! - [`github`] - GitHub release downloads
//! - [`manifest`] - The modpack manifest
//! - [`config`] - User configuration
//! - [`error`] - Error types and result handling

pub mod archive;
pub mod config;
pub mod error;
pub mod exclusions;
pub mod github;
pub mod manifest;
pub mod paths;
pub mod pipeline;
pub mod progress;
pub mod router;
pub mod staging;

pub use archive::{build_archive, Archive, Platform};
pub use config::Config;
pub use error::{Error, Result};
pub use exclusions::{resolve, ResolvedFiles};
pub use github::GithubClient;
pub use manifest::{Manifest, ModEntry, Side};
pub use paths::{crawl, normalize_path, relocate, FileSet};
pub use pipeline::{
    AbortReason, BuiltArchives, BulkArchiveSource, ModDownloader, Pipeline, PipelineOutcome,
    PipelineState,
};
pub use progress::{render_label, ProgressCallback, ProgressState};
pub use router::{route, ModArtifact, RoutedPaths};
pub use staging::{RunLock, StagingArea};
