//! Record extraction over a run of concatenated zstd frames.

use zstd::zstd_safe;

use crate::error::{ResolveError, Result};

/// Pull-based extractor yielding the decompressed bytes of one record.
///
/// Frames are decoded one at a time, so memory is bounded by the largest
/// frame rather than by the record or the container. Bytes before
/// `start` are dropped; iteration stops as soon as `length` bytes have been
/// yielded, without decoding any further frame. Running out of frames
/// first is reported as [`ResolveError::CorruptArchive`].
pub struct FrameExtractor {
    compressed: Vec<u8>,
    /// Byte position of the next undecoded frame in `compressed`.
    cursor: usize,
    frame_index: usize,
    /// Decompressed bytes produced across all frames decoded so far.
    produced: u64,
    yielded: u64,
    start: u64,
    length: u64,
    failed: bool,
}

impl FrameExtractor {
    pub fn new(compressed: Vec<u8>, start: u64, length: u64) -> Self {
        Self {
            compressed,
            cursor: 0,
            frame_index: 0,
            produced: 0,
            yielded: 0,
            start,
            length,
            failed: false,
        }
    }

    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    pub fn frames_decoded(&self) -> usize {
        self.frame_index
    }

    /// Drains the extractor into one buffer.
    pub fn read_to_end(self) -> Result<Vec<u8>> {
        let mut body = Vec::with_capacity(usize::try_from(self.length).unwrap_or(0));
        for chunk in self {
            body.extend_from_slice(&chunk?);
        }
        Ok(body)
    }

    fn decode_next_frame(&mut self) -> Result<Vec<u8>> {
        let rest = &self.compressed[self.cursor..];
        let frame_len = zstd_safe::find_frame_compressed_size(rest).map_err(|code| {
            ResolveError::CorruptArchive(format!(
                "frame {} at byte {}: {}",
                self.frame_index,
                self.cursor,
                zstd_safe::get_error_name(code)
            ))
        })?;
        if frame_len == 0 || frame_len > rest.len() {
            return Err(ResolveError::CorruptArchive(format!(
                "frame {} at byte {} overruns the compressed range",
                self.frame_index, self.cursor
            )));
        }

        let decoded = zstd::stream::decode_all(&rest[..frame_len]).map_err(|err| {
            ResolveError::CorruptArchive(format!(
                "frame {} at byte {}: {err}",
                self.frame_index, self.cursor
            ))
        })?;

        self.cursor += frame_len;
        self.frame_index += 1;
        Ok(decoded)
    }

    fn fail(&mut self, err: ResolveError) -> Option<Result<Vec<u8>>> {
        self.failed = true;
        Some(Err(err))
    }
}

impl Iterator for FrameExtractor {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.yielded >= self.length {
            return None;
        }

        loop {
            if self.cursor >= self.compressed.len() {
                let err = ResolveError::CorruptArchive(format!(
                    "record truncated: {} of {} bytes after {} frames",
                    self.yielded, self.length, self.frame_index
                ));
                return self.fail(err);
            }

            let frame = match self.decode_next_frame() {
                Ok(frame) => frame,
                Err(err) => return self.fail(err),
            };
            let frame_start = self.produced;
            let frame_end = frame_start + frame.len() as u64;
            self.produced = frame_end;

            let want_from = self.start + self.yielded;
            let want_to = self.start + self.length;
            if frame_end <= want_from {
                continue;
            }

            let lo = (want_from - frame_start) as usize;
            let hi = (frame_end.min(want_to) - frame_start) as usize;
            self.yielded += (hi - lo) as u64;

            let chunk = if lo == 0 && hi == frame.len() {
                frame
            } else {
                frame[lo..hi].to_vec()
            };
            return Some(Ok(chunk));
        }
    }
}
