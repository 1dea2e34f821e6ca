//! The probe interface shared by every place a report body can come from.

use crate::archive::ArchiveReader;
use crate::error::Result;
use crate::id::ReportIdentifier;
use crate::index::ArchiveLocator;

/// One place a report body may be found.
///
/// `Ok(None)` means "not here"; errors are absorbed by the resolver, which
/// moves on to the next source either way.
pub trait ReportSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch(&self, id: &ReportIdentifier) -> Result<Option<Vec<u8>>>;
}

/// Cold storage: index lookup followed by frame extraction.
#[derive(Clone)]
pub struct ArchiveSource {
    locator: ArchiveLocator,
    reader: ArchiveReader,
}

impl ArchiveSource {
    pub fn new(locator: ArchiveLocator, reader: ArchiveReader) -> Self {
        Self { locator, reader }
    }
}

impl ReportSource for ArchiveSource {
    fn name(&self) -> &str {
        "archive"
    }

    fn fetch(&self, id: &ReportIdentifier) -> Result<Option<Vec<u8>>> {
        let coords = self.locator.locate(id)?;
        log::debug!(
            "extracting {} from {} at {}+{} (skip {})",
            id,
            coords.container_path,
            coords.frame_byte_offset,
            coords.frame_byte_length,
            coords.intra_frame_offset
        );
        self.reader.read_record(&coords).map(Some)
    }
}
