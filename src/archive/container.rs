//! Byte-range access to archive containers.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::RANGE;
use reqwest::StatusCode;
use url::Url;

use crate::error::{ResolveError, Result};

/// Reads a byte range out of a named container without fetching the rest.
pub trait ContainerStore: Send + Sync {
    fn read_range(&self, container_path: &str, offset: u64, len: u64) -> Result<Vec<u8>>;
}

/// Containers stored under a local directory.
#[derive(Debug, Clone)]
pub struct LocalContainers {
    root: PathBuf,
}

impl LocalContainers {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, container_path: &str) -> Result<PathBuf> {
        validate_container_path(container_path)?;
        Ok(self.root.join(container_path))
    }
}

impl ContainerStore for LocalContainers {
    fn read_range(&self, container_path: &str, offset: u64, len: u64) -> Result<Vec<u8>> {
        let path = self.resolve(container_path)?;
        let mut file = File::open(&path).map_err(|err| {
            ResolveError::SourceUnavailable(format!("open {}: {err}", path.display()))
        })?;

        let mut buf = vec![0u8; range_len(len)?];
        file.seek(SeekFrom::Start(offset)).map_err(|err| {
            ResolveError::SourceUnavailable(format!("seek {}: {err}", path.display()))
        })?;
        file.read_exact(&mut buf).map_err(|err| match err.kind() {
            ErrorKind::UnexpectedEof => ResolveError::CorruptArchive(format!(
                "{} ends inside range {offset}+{len}",
                path.display()
            )),
            _ => ResolveError::SourceUnavailable(format!("read {}: {err}", path.display())),
        })?;
        Ok(buf)
    }
}

/// Containers served over HTTP, e.g. an object-storage bucket.
#[derive(Debug, Clone)]
pub struct HttpContainers {
    base_url: Url,
    client: Client,
}

impl HttpContainers {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = directory_url(base_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl ContainerStore for HttpContainers {
    fn read_range(&self, container_path: &str, offset: u64, len: u64) -> Result<Vec<u8>> {
        validate_container_path(container_path)?;
        let url = self.base_url.join(container_path).map_err(|err| {
            ResolveError::SourceUnavailable(format!("invalid container path {container_path}: {err}"))
        })?;
        let want = range_len(len)?;
        let last = offset + len.saturating_sub(1);

        log::debug!("range read {url} bytes={offset}-{last}");
        let response = self
            .client
            .get(url.clone())
            .header(RANGE, format!("bytes={offset}-{last}"))
            .send()?;

        let status = response.status();
        let body = match status {
            StatusCode::PARTIAL_CONTENT => response.bytes()?.to_vec(),
            // The server ignored the range header and sent the whole object.
            StatusCode::OK => {
                let whole = response.bytes()?;
                log::warn!(
                    "{url}: range ignored, fetched whole object ({} bytes) for {want} bytes",
                    whole.len()
                );
                let start = usize::try_from(offset).unwrap_or(usize::MAX);
                whole
                    .get(start..start.saturating_add(want))
                    .map(|range| range.to_vec())
                    .unwrap_or_default()
            }
            other => {
                return Err(ResolveError::SourceUnavailable(format!(
                    "{url}: unexpected status {other}"
                )))
            }
        };

        if body.len() != want {
            return Err(ResolveError::CorruptArchive(format!(
                "{url}: expected {want} bytes at {offset}, got {}",
                body.len()
            )));
        }
        Ok(body)
    }
}

/// Container paths are relative and never step outside the store root.
fn validate_container_path(container_path: &str) -> Result<()> {
    let plain = Path::new(container_path)
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if container_path.is_empty() || !plain || container_path.contains(':') {
        return Err(ResolveError::SourceUnavailable(format!(
            "invalid container path: {container_path}"
        )));
    }
    Ok(())
}

/// Parses `raw` as a base URL whose last segment is treated as a directory.
pub(crate) fn directory_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)
        .map_err(|err| ResolveError::SourceUnavailable(format!("invalid url {raw}: {err}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn range_len(len: u64) -> Result<usize> {
    usize::try_from(len)
        .map_err(|_| ResolveError::CorruptArchive(format!("range length {len} exceeds address space")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_escaping_paths() {
        let store = LocalContainers::new("/data/archive");
        for path in ["", "/etc/passwd", "../secret", "2016-10-02/../../x", "./a"] {
            let err = store.resolve(path).unwrap_err();
            assert!(matches!(err, ResolveError::SourceUnavailable(_)), "{path}");
        }
        assert_eq!(
            store.resolve("2016-10-02/http_requests.0.tar.zst").expect("path"),
            PathBuf::from("/data/archive/2016-10-02/http_requests.0.tar.zst")
        );
    }

    #[test]
    fn directory_url_gets_trailing_slash() {
        let url = directory_url("https://bucket.example.com/canned").expect("url");
        assert_eq!(url.as_str(), "https://bucket.example.com/canned/");
        let joined = url.join("2016-10-02/a.zst").expect("join");
        assert_eq!(joined.as_str(), "https://bucket.example.com/canned/2016-10-02/a.zst");
    }
}
