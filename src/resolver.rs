//! Resolution of an identifier to a report body across every source.
//!
//! Probe order depends on freshness. A report newer than the horizon is most
//! likely still in the spool or on a peer, so those go first:
//! spool → peers → archive. Older reports are usually archived already:
//! archive → spool → peers. Report-id lookups only have the archive.
//! The first body wins; every source failure only advances the chain.

use std::iter;
use std::sync::Arc;

use reqwest::blocking::Client;
use time::{Duration, OffsetDateTime};

use crate::archive::{ArchiveReader, ContainerStore, HttpContainers, LocalContainers};
use crate::config::{ContainerConfig, IndexConfig, ResolverConfig};
use crate::error::{ResolveError, Result};
use crate::fresh::{PeerHost, SpoolSource};
use crate::id::{classify, Freshness, ReportIdentifier, FRESH_HORIZON};
use crate::index::{ArchiveLocator, ClickhouseIndex, MemoryIndex, ReportIndex};
use crate::observe::{NoopObserver, ProbeOutcome, ResolveObserver};
use crate::source::{ArchiveSource, ReportSource};

pub struct Resolver {
    spool: Option<Box<dyn ReportSource>>,
    peers: Vec<Box<dyn ReportSource>>,
    archive: Box<dyn ReportSource>,
    horizon: Duration,
    observer: Arc<dyn ResolveObserver>,
}

impl Resolver {
    pub fn new(archive: impl ReportSource + 'static) -> Self {
        Self {
            spool: None,
            peers: Vec::new(),
            archive: Box::new(archive),
            horizon: FRESH_HORIZON,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_spool(mut self, spool: impl ReportSource + 'static) -> Self {
        self.spool = Some(Box::new(spool));
        self
    }

    /// Peers are probed in the order they are added.
    pub fn with_peer(mut self, peer: impl ReportSource + 'static) -> Self {
        self.peers.push(Box::new(peer));
        self
    }

    pub fn with_horizon(mut self, horizon: Duration) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ResolveObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn from_config(
        config: &ResolverConfig,
        observer: Arc<dyn ResolveObserver>,
    ) -> anyhow::Result<Self> {
        let timeout = config.http_timeout();

        let containers: Arc<dyn ContainerStore> = match &config.containers {
            ContainerConfig::Local { root } => Arc::new(LocalContainers::new(root)),
            ContainerConfig::Http { base_url } => Arc::new(HttpContainers::new(base_url, timeout)?),
        };
        let index: Arc<dyn ReportIndex> = match &config.index {
            IndexConfig::Jsonl { path } => Arc::new(MemoryIndex::load_jsonl(path)?),
            IndexConfig::Clickhouse {
                url,
                database,
                tables,
            } => Arc::new(ClickhouseIndex::new(url, database.clone(), tables, timeout)?),
        };
        let archive = ArchiveSource::new(ArchiveLocator::new(index), ArchiveReader::new(containers));

        let mut resolver = Resolver::new(archive)
            .with_horizon(config.fresh_horizon())
            .with_observer(observer);

        if let Some(dir) = &config.spool_dir {
            resolver =
                resolver.with_spool(SpoolSource::new(dir).with_extension(&config.spool_extension));
        }

        let client = Client::builder().timeout(timeout).build()?;
        for host in &config.peer_hosts {
            let peer = PeerHost::with_client(host, &config.peer_spool_prefix, client.clone())?
                .with_extension(&config.spool_extension);
            resolver = resolver.with_peer(peer);
        }

        Ok(resolver)
    }

    pub fn resolve(&self, id: &ReportIdentifier) -> Result<Vec<u8>> {
        self.resolve_at(id, OffsetDateTime::now_utc())
    }

    pub fn resolve_at(&self, id: &ReportIdentifier, now: OffsetDateTime) -> Result<Vec<u8>> {
        let freshness = classify(id, now, self.horizon);
        log::debug!("resolving {id} ({freshness:?})");
        self.run_chain(id, &self.probe_order(id, freshness))
    }

    /// Fresh-report chain for a uid regardless of its age.
    pub fn resolve_fresh(&self, uid: &str) -> Result<Vec<u8>> {
        let id = ReportIdentifier::uid(uid);
        self.run_chain(&id, &self.probe_order(&id, Freshness::Fresh))
    }

    pub fn probe_order(&self, id: &ReportIdentifier, freshness: Freshness) -> Vec<&dyn ReportSource> {
        let archive = iter::once(self.archive.as_ref());
        let fresh = self
            .spool
            .iter()
            .chain(self.peers.iter())
            .map(|source| source.as_ref());

        match (id, freshness) {
            (ReportIdentifier::Report { .. }, _) => archive.collect(),
            (_, Freshness::Fresh) => fresh.chain(archive).collect(),
            (_, Freshness::Archived) => archive.chain(fresh).collect(),
        }
    }

    fn run_chain(&self, id: &ReportIdentifier, chain: &[&dyn ReportSource]) -> Result<Vec<u8>> {
        for source in chain {
            let name = source.name();
            let outcome = match source.fetch(id) {
                Ok(Some(body)) => {
                    log::info!("{id}: {} bytes from {name}", body.len());
                    self.observer.probe(name, ProbeOutcome::Found);
                    self.observer.finished(true);
                    return Ok(body);
                }
                Ok(None) => {
                    log::debug!("{id}: not in {name}");
                    ProbeOutcome::Absent
                }
                Err(ResolveError::NotIndexed(detail)) => {
                    log::debug!("{id}: not indexed ({detail})");
                    ProbeOutcome::Absent
                }
                Err(err @ ResolveError::MalformedIdentifier(_)) => {
                    log::warn!("{id}: {name} skipped: {err}");
                    ProbeOutcome::Rejected
                }
                Err(err @ ResolveError::CorruptArchive(_)) => {
                    log::error!("{id}: {name}: {err}");
                    ProbeOutcome::Corrupt
                }
                Err(err) => {
                    log::warn!("{id}: {name} failed: {err}");
                    ProbeOutcome::Unavailable
                }
            };
            self.observer.probe(name, outcome);
        }

        log::info!("{id}: not found in {} sources", chain.len());
        self.observer.finished(false);
        Err(ResolveError::NotFound)
    }
}
