use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::envelope::unwrap_post;
use crate::error::{ResolveError, Result};
use crate::id::{ReportIdentifier, UidParts};
use crate::source::ReportSource;

pub const DEFAULT_SPOOL_EXTENSION: &str = "post";

/// Local directory of submissions not yet packed into archive containers.
#[derive(Debug, Clone)]
pub struct SpoolSource {
    root: PathBuf,
    extension: String,
}

impl SpoolSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: DEFAULT_SPOOL_EXTENSION.to_string(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<hour>_<cc>_<test>/<uid>.<ext>`; fails before touching the
    /// filesystem when the uid is malformed.
    pub fn path_for(&self, uid: &str) -> Result<PathBuf> {
        let parts = UidParts::parse(uid)?;
        Ok(self
            .root
            .join(parts.bucket_name())
            .join(parts.file_name(&self.extension)))
    }
}

impl ReportSource for SpoolSource {
    fn name(&self) -> &str {
        "spool"
    }

    fn fetch(&self, id: &ReportIdentifier) -> Result<Option<Vec<u8>>> {
        let Some(uid) = id.measurement_uid() else {
            return Ok(None);
        };
        let path = self.path_for(uid)?;
        log::debug!("reading spool file {}", path.display());

        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(ResolveError::SourceUnavailable(format!(
                    "read {}: {err}",
                    path.display()
                )))
            }
        };
        unwrap_post(&raw).map(Some)
    }
}
