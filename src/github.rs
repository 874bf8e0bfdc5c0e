//! GitHub release client
//!
//! Fetches mod releases and the bulk "extra files" archive from the
//! organization's repositories. This is the network collaborator behind the
//! [`ModDownloader`] and [`BulkArchiveSource`] seams of the pipeline.
//!
//! # Examples
//!
//! ```no_run
//! use dreamassembler::{Config, GithubClient};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GithubClient::from_config(&Config::load()?)?;
//! let release = client.latest_release("NotEnoughItems")?;
//! println!("latest: {}", release.tag_name);
//! # Ok(())
//! # }
//! ```

use crate::manifest::ModEntry;
use crate::pipeline::{BulkArchiveSource, ModDownloader};
use crate::{Config, Error, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub license: Option<RepositoryLicense>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryLicense {
    #[serde(default)]
    pub spdx_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    /// API URL; serves the binary with `Accept: application/octet-stream`
    pub url: String,
}

/// Release assets that are the mod itself, not dev or source jars
pub fn is_mod_jar(name: &str) -> bool {
    name.ends_with(".jar")
        && !["-dev.jar", "-sources.jar", "-api.jar", "-javadoc.jar"]
            .iter()
            .any(|suffix| name.ends_with(suffix))
}

/// SHA-256 of a file as lowercase hex
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// `<archive>.sha256` next to a cached download
pub fn checksum_sidecar(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".sha256");
    PathBuf::from(name)
}

/// Check `path` against its sidecar digest
fn verify_cached_file(path: &Path) -> Result<()> {
    let sidecar = checksum_sidecar(path);
    let expected = fs::read_to_string(&sidecar)
        .map_err(|_| Error::Other(format!("No checksum recorded at {}", sidecar.display())))?;
    let expected = expected.trim().to_lowercase();

    let actual = file_sha256(path)?;
    if actual != expected {
        return Err(Error::ChecksumMismatch {
            path: path.to_path_buf(),
            expected,
            actual,
        });
    }
    Ok(())
}

pub struct GithubClient {
    api_url: String,
    organization: String,
    modpack_repo: String,
    token: Option<String>,
    verify_checksum: bool,
    client: Client,
}

impl GithubClient {
    pub fn new(api_url: &str, organization: &str, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("dreamassembler/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            organization: organization.to_string(),
            modpack_repo: crate::config::GithubConfig::default().modpack_repo,
            token,
            verify_checksum: true,
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            &config.github.api_url,
            &config.github.organization,
            config.token().map(str::to_string),
        )?
        .with_modpack_repo(&config.github.modpack_repo)
        .with_checksum_verification(config.bulk.verify_checksum))
    }

    pub fn with_modpack_repo(mut self, repo: &str) -> Self {
        self.modpack_repo = repo.to_string();
        self
    }

    pub fn with_checksum_verification(mut self, verify: bool) -> Self {
        self.verify_checksum = verify;
        self
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header("Authorization", format!("token {}", token)),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.authorized(request).send().map_err(|e| {
            if e.is_connect() {
                Error::Other(format!(
                    "Cannot connect to GitHub at {}\n\
                     Please check your network connection and the configured API URL.",
                    self.api_url
                ))
            } else if e.is_timeout() {
                Error::Other("GitHub request timed out. Please try again.".to_string())
            } else {
                Error::Http(e)
            }
        })
    }

    fn repo_url(&self, repo: &str) -> String {
        format!(
            "{}/repos/{}/{}",
            self.api_url,
            urlencoding::encode(&self.organization),
            urlencoding::encode(repo)
        )
    }

    /// GET a JSON document; `None` on 404
    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        debug!(url, "GitHub API request");
        let response = self.send(
            self.client
                .get(url)
                .header("Accept", "application/vnd.github+json"),
        )?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = match status.as_u16() {
                401 => "GitHub rejected the token (HTTP 401). Check github.token.".to_string(),
                403 => "GitHub refused the request (HTTP 403). You may be rate limited; \
                        set a token with `dreamassembler config set github.token <token>`."
                    .to_string(),
                code => format!("GitHub API error: HTTP {}", code),
            };
            return Err(Error::Other(message));
        }

        Ok(Some(response.json()?))
    }

    /// Look up a repository of the organization
    pub fn get_repo(&self, name: &str) -> Result<Repository> {
        self.get_json(&self.repo_url(name))?
            .ok_or_else(|| Error::RepoNotFound(name.to_string()))
    }

    /// Latest published release of a repository
    pub fn latest_release(&self, repo: &str) -> Result<Release> {
        let url = format!("{}/releases/latest", self.repo_url(repo));
        self.get_json(&url)?
            .ok_or_else(|| Error::LatestReleaseNotFound(repo.to_string()))
    }

    /// Release carrying a specific tag
    pub fn release_by_tag(&self, repo: &str, tag: &str) -> Result<Release> {
        let url = format!(
            "{}/releases/tags/{}",
            self.repo_url(repo),
            urlencoding::encode(tag)
        );
        self.get_json(&url)?
            .ok_or_else(|| Error::ReleaseNotFound(format!("{}@{}", repo, tag)))
    }

    /// Stream a release asset to `destination`.
    ///
    /// The body goes to a `.part` file first, so an interrupted download never
    /// leaves a file under the final name.
    pub fn download_asset(&self, asset: &ReleaseAsset, destination: &Path) -> Result<()> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(asset = %asset.name, to = %destination.display(), "downloading");
        let mut response = self.send(
            self.client
                .get(&asset.url)
                .header("Accept", "application/octet-stream"),
        )?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::ReleaseNotFound(asset.name.clone()));
        }
        if !status.is_success() {
            return Err(Error::Other(format!(
                "Download of {} failed: HTTP {}",
                asset.name,
                status.as_u16()
            )));
        }

        let mut part = destination.as_os_str().to_owned();
        part.push(".part");
        let part = PathBuf::from(part);

        let mut file = File::create(&part)?;
        response.copy_to(&mut file)?;
        drop(file);
        fs::rename(&part, destination)?;

        info!(asset = %asset.name, "download successful");
        Ok(())
    }
}

impl ModDownloader for GithubClient {
    fn download_mod(&self, entry: &ModEntry, destination: &Path) -> Result<Vec<PathBuf>> {
        let release = match &entry.version {
            Some(tag) => self.release_by_tag(&entry.name, tag),
            None => self.latest_release(&entry.name),
        }
        .map_err(|e| match e {
            Error::LatestReleaseNotFound(_) | Error::ReleaseNotFound(_) => {
                Error::ReleaseNotFound(entry.name.clone())
            }
            other => other,
        })?;

        let jars: Vec<&ReleaseAsset> = release
            .assets
            .iter()
            .filter(|a| is_mod_jar(&a.name))
            .collect();

        if jars.is_empty() {
            warn!(
                mod_name = %entry.name,
                tag = %release.tag_name,
                "*** No jar asset found in release"
            );
            return Err(Error::ReleaseNotFound(entry.name.clone()));
        }

        let mut paths = Vec::with_capacity(jars.len());
        for asset in jars {
            let path = destination.join(&asset.name);
            if path.exists() {
                debug!(asset = %asset.name, "skipping re-download");
            } else {
                self.download_asset(asset, &path)?;
            }
            paths.push(path);
        }

        Ok(paths)
    }
}

impl BulkArchiveSource for GithubClient {
    fn fetch_bulk_archive(&self, cache_dir: &Path) -> Result<PathBuf> {
        let release = self.latest_release(&self.modpack_repo)?;
        info!(
            repo = %self.modpack_repo,
            release = %release.name.as_deref().unwrap_or(&release.tag_name),
            "found modpack release"
        );

        let asset = release
            .assets
            .iter()
            .find(|a| a.name.ends_with(".zip"))
            .ok_or_else(|| {
                warn!(repo = %self.modpack_repo, "*** No zip asset in the latest release");
                Error::LatestReleaseNotFound(self.modpack_repo.clone())
            })?;

        let archive_path = cache_dir.join(&asset.name);

        if archive_path.exists() {
            if !self.verify_checksum {
                info!(asset = %asset.name, "skipping re-download");
                return Ok(archive_path);
            }
            match verify_cached_file(&archive_path) {
                Ok(()) => {
                    info!(asset = %asset.name, "cached archive verified, skipping re-download");
                    return Ok(archive_path);
                }
                Err(e) => warn!(asset = %asset.name, error = %e, "re-downloading cached archive"),
            }
            fs::remove_file(&archive_path)?;
        }

        self.download_asset(asset, &archive_path)?;
        let checksum = file_sha256(&archive_path)?;
        fs::write(checksum_sidecar(&archive_path), &checksum)?;

        Ok(archive_path)
    }
}
