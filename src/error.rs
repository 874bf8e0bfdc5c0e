use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Path is outside of its source root: {0}")]
    StripPrefix(#[from] std::path::StripPrefixError),

    #[error("Failed to copy {from:?} to {to:?}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("No release found for {0}")]
    ReleaseNotFound(String),

    #[error("The repository {0} has no release")]
    LatestReleaseNotFound(String),

    #[error("{0} is already in the manifest")]
    AlreadyExists(String),

    #[error("Unknown side '{side}' for mod '{mod_name}' (expected CLIENT, SERVER or BOTH)")]
    InvalidSide { mod_name: String, side: String },

    #[error("Invalid exclusion entry: {0}")]
    InvalidExclusion(String),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Another packaging run is already in progress (lock held at {})\n\n\
             Hint: wait for the other run to finish. If no run is active, delete the lock file.",
             .0.display())]
    RunInProgress(PathBuf),

    #[error("Checksum mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for the "nothing upstream" conditions the pipeline turns into an abort.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::RepoNotFound(_) | Error::ReleaseNotFound(_) | Error::LatestReleaseNotFound(_)
        )
    }

    /// True for manifest problems that must stop a run before any file moves.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidSide { .. } | Error::InvalidExclusion(_) | Error::InvalidManifest(_)
        )
    }
}
