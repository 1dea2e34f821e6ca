use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{ReportIndex, ReportKey};
use crate::archive::ArchiveCoordinates;

/// One line of a JSON-lines index file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRow {
    #[serde(default)]
    pub measurement_uid: Option<String>,
    pub report_id: String,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(flatten)]
    pub coordinates: ArchiveCoordinates,
}

/// In-process index, typically loaded from an exported JSON-lines file.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    by_uid: HashMap<String, ReportKey>,
    by_key: HashMap<ReportKey, ArchiveCoordinates>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("open index {}", path.display()))?;
        let mut index = Self::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("read index {}", path.display()))?;
            if line.trim().is_empty() {
                continue;
            }
            let row: IndexRow = serde_json::from_str(&line)
                .with_context(|| format!("{}:{}: invalid index row", path.display(), lineno + 1))?;
            index.insert(row);
        }
        log::debug!("loaded {} index rows from {}", index.len(), path.display());
        Ok(index)
    }

    /// Adds a row. The first row seen for a uid or report key wins.
    pub fn insert(&mut self, row: IndexRow) {
        let key = ReportKey::new(row.report_id, row.input.as_deref());
        if let Some(uid) = row.measurement_uid {
            self.by_uid.entry(uid).or_insert_with(|| key.clone());
        }
        self.by_key.entry(key).or_insert(row.coordinates);
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl ReportIndex for MemoryIndex {
    fn report_key_for_uid(&self, uid: &str) -> crate::Result<Option<ReportKey>> {
        Ok(self.by_uid.get(uid).cloned())
    }

    fn coordinates_for(&self, key: &ReportKey) -> crate::Result<Option<ArchiveCoordinates>> {
        Ok(self.by_key.get(key).cloned())
    }
}
