//! Cold-storage archives: containers of back-to-back zstd frames holding
//! many reports each, addressed by coordinates from the index.

mod container;
mod frames;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, Result};

pub use container::{ContainerStore, HttpContainers, LocalContainers};
pub(crate) use container::directory_url;
pub use frames::FrameExtractor;

/// Location of one record inside an archive container.
///
/// `frame_byte_offset..frame_byte_offset + frame_byte_length` covers one or
/// more whole compressed frames; `intra_frame_offset` and `logical_length`
/// select the record inside the decompressed concatenation of those frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveCoordinates {
    pub container_path: String,
    pub frame_byte_offset: u64,
    pub frame_byte_length: u64,
    pub intra_frame_offset: u64,
    pub logical_length: u64,
}

impl ArchiveCoordinates {
    pub fn validate(&self) -> Result<()> {
        if self.logical_length == 0 {
            return Err(ResolveError::CorruptArchive(format!(
                "{}: zero logical length",
                self.container_path
            )));
        }
        if self.frame_byte_length == 0 {
            return Err(ResolveError::CorruptArchive(format!(
                "{}: empty frame range",
                self.container_path
            )));
        }
        if self.frame_byte_offset.checked_add(self.frame_byte_length).is_none()
            || self.intra_frame_offset.checked_add(self.logical_length).is_none()
        {
            return Err(ResolveError::CorruptArchive(format!(
                "{}: coordinates overflow",
                self.container_path
            )));
        }
        Ok(())
    }
}

/// Reads compressed ranges from a [`ContainerStore`] and hands back a lazy
/// extractor over the record.
#[derive(Clone)]
pub struct ArchiveReader {
    containers: Arc<dyn ContainerStore>,
}

impl ArchiveReader {
    pub fn new(containers: Arc<dyn ContainerStore>) -> Self {
        Self { containers }
    }

    pub fn extract(&self, coords: &ArchiveCoordinates) -> Result<FrameExtractor> {
        coords.validate()?;
        let compressed = self.containers.read_range(
            &coords.container_path,
            coords.frame_byte_offset,
            coords.frame_byte_length,
        )?;
        if compressed.len() as u64 != coords.frame_byte_length {
            return Err(ResolveError::CorruptArchive(format!(
                "{}: short range read, {} of {} bytes",
                coords.container_path,
                compressed.len(),
                coords.frame_byte_length
            )));
        }
        Ok(FrameExtractor::new(
            compressed,
            coords.intra_frame_offset,
            coords.logical_length,
        ))
    }

    pub fn read_record(&self, coords: &ArchiveCoordinates) -> Result<Vec<u8>> {
        self.extract(coords)?.read_to_end()
    }
}
