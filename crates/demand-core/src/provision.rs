//! Make sure a model artifact exists on local disk before inference.
//!
//! An existing file is trusted as-is. A missing file is downloaded once into
//! a `.part` sibling and renamed into place on success, so an interrupted
//! fetch never leaves a file at the target path. When a SHA-256 pin is
//! configured, a mismatching download is discarded and fetched one more
//! time before giving up.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::artifact::load_artifact;
use crate::error::{DemandError, DemandResult};
use crate::model::DemandModel;

/// Default bound on a single artifact download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Somewhere model bytes can be fetched from.
pub trait ArtifactSource {
    /// Stream the resource at `url` into `sink`, returning the byte count.
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64>;
}

/// Fetches artifacts over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSource {
    agent: ureq::Agent,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl ArtifactSource for HttpSource {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
        let response = self
            .agent
            .get(url)
            .call()
            .with_context(|| format!("requesting {}", url))?;
        if response.status() >= 400 {
            bail!("HTTP {}", response.status());
        }
        let mut reader = response.into_reader();
        io::copy(&mut reader, sink).context("reading response body")
    }
}

/// What [`Provisioner::ensure`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The artifact was already on disk; nothing was fetched.
    AlreadyPresent,
    /// The artifact was downloaded.
    Downloaded { bytes: u64 },
}

/// Guarantees a local copy of the model artifact.
#[derive(Debug, Clone)]
pub struct Provisioner<S = HttpSource> {
    source: S,
    expected_sha256: Option<String>,
}

impl Provisioner<HttpSource> {
    /// HTTP provisioner with the given download timeout.
    pub fn http(timeout: Duration) -> Self {
        Self::new(HttpSource::new(timeout))
    }
}

impl<S: ArtifactSource> Provisioner<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            expected_sha256: None,
        }
    }

    /// Require downloads to hash to `sha256` (hex, case-insensitive).
    pub fn with_sha256(mut self, sha256: Option<String>) -> Self {
        self.expected_sha256 = sha256.map(|s| s.trim().to_ascii_lowercase());
        self
    }

    /// Ensure `path` exists, fetching it from `url` if absent.
    pub fn ensure(&self, url: Option<&str>, path: &Path) -> DemandResult<ProvisionOutcome> {
        if path.exists() {
            info!(path = %path.display(), "model artifact already present");
            return Ok(ProvisionOutcome::AlreadyPresent);
        }
        let url = url.ok_or_else(|| {
            DemandError::provisioning(
                "<unset>",
                format!(
                    "{} does not exist and no model URL is configured",
                    path.display()
                ),
            )
        })?;

        info!(url, path = %path.display(), "downloading model artifact");
        let attempts = if self.expected_sha256.is_some() { 2 } else { 1 };
        let mut last_error = None;
        for attempt in 1..=attempts {
            match self.download_once(url, path) {
                Ok(bytes) => {
                    info!(bytes, path = %path.display(), "model artifact downloaded");
                    return Ok(ProvisionOutcome::Downloaded { bytes });
                }
                Err(FetchFailure::Checksum(reason)) if attempt < attempts => {
                    warn!(attempt, "{reason}; retrying download");
                    last_error = Some(reason);
                }
                Err(FetchFailure::Checksum(reason)) => {
                    last_error = Some(reason);
                }
                Err(FetchFailure::Transfer(err)) => {
                    return Err(DemandError::provisioning(url, format!("{err:#}")));
                }
            }
        }
        Err(DemandError::provisioning(
            url,
            last_error.unwrap_or_else(|| "download failed".to_string()),
        ))
    }

    fn download_once(&self, url: &str, path: &Path) -> std::result::Result<u64, FetchFailure> {
        let partial = partial_path(path);
        let result = self.fetch_to(url, &partial);
        let bytes = match result {
            Ok(bytes) => bytes,
            Err(err) => {
                let _ = fs::remove_file(&partial);
                return Err(FetchFailure::Transfer(err));
            }
        };

        if let Some(expected) = &self.expected_sha256 {
            let actual = match compute_sha256(&partial) {
                Ok(actual) => actual,
                Err(err) => {
                    let _ = fs::remove_file(&partial);
                    return Err(FetchFailure::Transfer(err));
                }
            };
            if &actual != expected {
                let _ = fs::remove_file(&partial);
                return Err(FetchFailure::Checksum(format!(
                    "checksum mismatch: expected {expected}, got {actual}"
                )));
            }
        }

        if let Err(err) = fs::rename(&partial, path) {
            let _ = fs::remove_file(&partial);
            return Err(FetchFailure::Transfer(anyhow::Error::new(err).context(
                format!("moving download into place at {}", path.display()),
            )));
        }
        Ok(bytes)
    }

    fn fetch_to(&self, url: &str, partial: &Path) -> Result<u64> {
        if let Some(parent) = partial.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let mut file = File::create(partial)
            .with_context(|| format!("creating download target {}", partial.display()))?;
        let bytes = self.source.fetch(url, &mut file)?;
        file.flush()?;
        file.sync_all()
            .with_context(|| format!("flushing {}", partial.display()))?;
        Ok(bytes)
    }
}

enum FetchFailure {
    Transfer(anyhow::Error),
    Checksum(String),
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "artifact".into());
    name.push(".part");
    path.with_file_name(name)
}

/// Provision the artifact and load it.
///
/// A provisioning failure returns before any load is attempted.
pub fn provision_and_load<S: ArtifactSource>(
    provisioner: &Provisioner<S>,
    url: Option<&str>,
    path: &Path,
) -> DemandResult<Box<dyn DemandModel>> {
    provisioner.ensure(url, path)?;
    load_artifact(path)
}

/// Compute SHA256 hash of a file
pub fn compute_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open file for hashing {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .with_context(|| format!("Failed to read file for hashing {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::tempdir;

    struct StaticSource {
        body: Vec<u8>,
        calls: Cell<usize>,
    }

    impl ArtifactSource for StaticSource {
        fn fetch(&self, _url: &str, sink: &mut dyn Write) -> Result<u64> {
            self.calls.set(self.calls.get() + 1);
            sink.write_all(&self.body)?;
            Ok(self.body.len() as u64)
        }
    }

    #[test]
    fn test_partial_path_is_sibling() {
        let p = partial_path(Path::new("/tmp/models/model.json"));
        assert_eq!(p, PathBuf::from("/tmp/models/model.json.part"));
    }

    #[test]
    fn test_sha256_of_known_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        fs::write(&path, b"abc").unwrap();
        assert_eq!(
            compute_sha256(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_download_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/cache/model.json");
        let provisioner = Provisioner::new(StaticSource {
            body: b"{}".to_vec(),
            calls: Cell::new(0),
        });
        let outcome = provisioner.ensure(Some("http://unused"), &path).unwrap();
        assert_eq!(outcome, ProvisionOutcome::Downloaded { bytes: 2 });
        assert_eq!(fs::read(&path).unwrap(), b"{}");
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_missing_url_is_provisioning_error() {
        let dir = tempdir().unwrap();
        let provisioner = Provisioner::new(StaticSource {
            body: Vec::new(),
            calls: Cell::new(0),
        });
        let err = provisioner
            .ensure(None, &dir.path().join("model.json"))
            .unwrap_err();
        assert!(matches!(err, DemandError::Provisioning { .. }));
    }
}
