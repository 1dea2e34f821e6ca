//! Sources for reports younger than the archival horizon: the local spool
//! and the spools of peer collectors.

mod envelope;
mod peer;
mod spool;

pub use envelope::unwrap_post;
pub use peer::{PeerHost, DEFAULT_PEER_PREFIX};
pub use spool::{SpoolSource, DEFAULT_SPOOL_EXTENSION};
