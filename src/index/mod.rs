//! Lookup of archive coordinates.

mod clickhouse;
mod memory;

use std::sync::Arc;

use crate::archive::ArchiveCoordinates;
use crate::error::{ResolveError, Result};
use crate::id::ReportIdentifier;

pub use clickhouse::{ClickhouseIndex, ClickhouseTables};
pub use memory::{IndexRow, MemoryIndex};

/// `(report_id, input)` as stored in the index; "no input" is `""`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportKey {
    pub report_id: String,
    pub input: String,
}

impl ReportKey {
    pub fn new(report_id: impl Into<String>, input: Option<&str>) -> Self {
        Self {
            report_id: report_id.into(),
            input: input.unwrap_or("").to_string(),
        }
    }
}

/// External index. Each lookup yields at most one row; no row is `Ok(None)`.
pub trait ReportIndex: Send + Sync {
    fn report_key_for_uid(&self, uid: &str) -> Result<Option<ReportKey>>;

    fn coordinates_for(&self, key: &ReportKey) -> Result<Option<ArchiveCoordinates>>;
}

/// Resolves any identifier form to coordinates through a [`ReportIndex`].
#[derive(Clone)]
pub struct ArchiveLocator {
    index: Arc<dyn ReportIndex>,
}

impl ArchiveLocator {
    pub fn new(index: Arc<dyn ReportIndex>) -> Self {
        Self { index }
    }

    pub fn locate(&self, id: &ReportIdentifier) -> Result<ArchiveCoordinates> {
        let key = match id {
            ReportIdentifier::Report { report_id, input } => {
                ReportKey::new(report_id.as_str(), input.as_deref())
            }
            ReportIdentifier::MeasurementUid(uid) => self
                .index
                .report_key_for_uid(uid)?
                .ok_or_else(|| ResolveError::NotIndexed(format!("uid {uid}")))?,
        };

        self.index.coordinates_for(&key)?.ok_or_else(|| {
            ResolveError::NotIndexed(format!("report {} input {:?}", key.report_id, key.input))
        })
    }
}
