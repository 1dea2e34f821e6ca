use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use url::Url;

use super::envelope::unwrap_post;
use super::spool::DEFAULT_SPOOL_EXTENSION;
use crate::archive::directory_url;
use crate::error::{ResolveError, Result};
use crate::id::{ReportIdentifier, UidParts};
use crate::source::ReportSource;

pub const DEFAULT_PEER_PREFIX: &str = "measurement_spool";

/// Another collector that exposes its spool over HTTP.
#[derive(Debug, Clone)]
pub struct PeerHost {
    name: String,
    spool_url: Url,
    extension: String,
    client: Client,
}

impl PeerHost {
    /// `host` is either a bare host name, served as `https://<host>/`, or a
    /// full base URL.
    pub fn new(host: &str, prefix: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(host, prefix, client)
    }

    pub fn with_client(host: &str, prefix: &str, client: Client) -> Result<Self> {
        let base = if host.contains("://") {
            directory_url(host)?
        } else {
            directory_url(&format!("https://{host}/"))?
        };
        let prefix = prefix.trim_matches('/');
        let spool_url = if prefix.is_empty() {
            base
        } else {
            base.join(&format!("{prefix}/")).map_err(|err| {
                ResolveError::SourceUnavailable(format!("invalid peer prefix {prefix}: {err}"))
            })?
        };

        Ok(Self {
            name: format!("peer:{host}"),
            spool_url,
            extension: DEFAULT_SPOOL_EXTENSION.to_string(),
            client,
        })
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn url_for(&self, uid: &str) -> Result<Url> {
        let parts = UidParts::parse(uid)?;
        self.spool_url
            .join(&parts.relative_path(&self.extension))
            .map_err(|err| ResolveError::MalformedIdentifier(format!("{uid}: {err}")))
    }
}

impl ReportSource for PeerHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, id: &ReportIdentifier) -> Result<Option<Vec<u8>>> {
        let Some(uid) = id.measurement_uid() else {
            return Ok(None);
        };
        let url = self.url_for(uid)?;
        log::debug!("requesting {url}");

        let response = self.client.get(url.clone()).send()?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::OK => {
                let raw = response.bytes()?;
                unwrap_post(&raw).map(Some)
            }
            other => Err(ResolveError::SourceUnavailable(format!(
                "{url}: unexpected status {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UID: &str = "20260124093015.412305_IT_webconnectivity_01a2b3c4";

    #[test]
    fn bare_host_uses_https() {
        let peer = PeerHost::new("collector.example.org", DEFAULT_PEER_PREFIX, Duration::from_secs(1))
            .expect("peer");
        assert_eq!(
            peer.url_for(UID).expect("url").as_str(),
            "https://collector.example.org/measurement_spool/2026012409_IT_webconnectivity/\
             20260124093015.412305_IT_webconnectivity_01a2b3c4.post"
        );
    }

    #[test]
    fn base_url_keeps_scheme_and_port() {
        let peer = PeerHost::new("http://127.0.0.1:8080", "/spool/", Duration::from_secs(1))
            .expect("peer");
        let url = peer.url_for(UID).expect("url");
        assert!(url
            .as_str()
            .starts_with("http://127.0.0.1:8080/spool/2026012409_IT_webconnectivity/"));
    }

    #[test]
    fn malformed_uid_builds_no_url() {
        let peer = PeerHost::new("collector.example.org", DEFAULT_PEER_PREFIX, Duration::from_secs(1))
            .expect("peer");
        let err = peer.url_for("2026_IT_webconnectivity").unwrap_err();
        assert!(matches!(err, ResolveError::MalformedIdentifier(_)));
        let err = peer.url_for("2026012409/../../../admin_IT_web_x").unwrap_err();
        assert!(matches!(err, ResolveError::MalformedIdentifier(_)));
    }
}
