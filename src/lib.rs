//! Raw measurement retrieval.
//!
//! A report lives in one of three places depending on its age: the local
//! spool, the spool of a peer collector, or a cold-storage container of
//! concatenated zstd frames located through an index. [`Resolver`] probes
//! them in freshness-dependent order and returns the first body found.

pub mod archive;
pub mod config;
pub mod error;
pub mod fresh;
pub mod id;
pub mod index;
pub mod observe;
pub mod resolver;
pub mod source;

pub use archive::{ArchiveCoordinates, ArchiveReader, FrameExtractor};
pub use config::ResolverConfig;
pub use error::{ResolveError, Result};
pub use id::{Freshness, ReportIdentifier};
pub use index::ArchiveLocator;
pub use observe::{ProbeOutcome, ResolveCounters, ResolveObserver};
pub use resolver::Resolver;
pub use source::{ArchiveSource, ReportSource};
