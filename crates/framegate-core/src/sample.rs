use std::fmt;
use std::sync::Arc;

use framegate_foundation::SampleAccessError;

/// One plane of a locked video buffer. Packed pixel layouts expose a
/// single plane; planar layouts expose one per component.
pub struct PlaneRef<'a> {
    pub data: &'a [u8],
    /// Bytes from one row start to the next. May exceed `row_bytes` when
    /// the backend pads rows out to an alignment boundary.
    pub stride: usize,
    /// Payload bytes per row.
    pub row_bytes: usize,
    pub rows: usize,
}

impl<'a> PlaneRef<'a> {
    pub fn row(&self, index: usize) -> Option<&'a [u8]> {
        let start = index.checked_mul(self.stride)?;
        let end = start.checked_add(self.row_bytes)?;
        self.data.get(start..end)
    }

    /// Bytes this plane contributes to a tightly packed packet.
    pub fn payload_len(&self) -> usize {
        self.row_bytes * self.rows
    }
}

/// A captured video frame owned by the backend.
///
/// Handles are reference counted: cloning the `Arc` retains the underlying
/// buffer, dropping the last handle releases it. The bridge never mutates
/// frame contents; it only reads geometry and copies bytes out.
pub trait VideoSample: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Locks the native buffer, presents its planes to `visit`, then
    /// unlocks. Fails when the backend cannot map the buffer into host
    /// memory.
    fn with_planes(
        &self,
        visit: &mut dyn FnMut(&[PlaneRef<'_>]),
    ) -> Result<(), SampleAccessError>;
}

/// A captured audio block. Consumed exactly once by the reader.
pub trait AudioSample: Send {
    fn byte_len(&self) -> usize;

    /// Copies the block's bytes into `dst`, which must be `byte_len()`
    /// bytes long.
    fn copy_bytes(&self, dst: &mut [u8]) -> Result<(), SampleAccessError>;
}

pub type VideoHandle = Arc<dyn VideoSample>;
pub type AudioHandle = Box<dyn AudioSample>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// Heap-backed plane for samples that live entirely in host memory.
#[derive(Debug, Clone)]
pub struct OwnedPlane {
    pub bytes: Vec<u8>,
    pub stride: usize,
    pub row_bytes: usize,
    pub rows: usize,
}

impl OwnedPlane {
    /// A plane with no padding between rows.
    pub fn packed(bytes: Vec<u8>, row_bytes: usize) -> Self {
        let rows = if row_bytes == 0 { 0 } else { bytes.len() / row_bytes };
        Self {
            bytes,
            stride: row_bytes,
            row_bytes,
            rows,
        }
    }
}

/// In-memory video frame used by synthetic sources and tests.
#[derive(Debug, Clone)]
pub struct MemoryVideoSample {
    width: u32,
    height: u32,
    planes: Vec<OwnedPlane>,
}

impl MemoryVideoSample {
    pub fn new(width: u32, height: u32, planes: Vec<OwnedPlane>) -> Self {
        Self {
            width,
            height,
            planes,
        }
    }
}

impl VideoSample for MemoryVideoSample {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn with_planes(
        &self,
        visit: &mut dyn FnMut(&[PlaneRef<'_>]),
    ) -> Result<(), SampleAccessError> {
        let refs: Vec<PlaneRef<'_>> = self
            .planes
            .iter()
            .map(|p| PlaneRef {
                data: &p.bytes,
                stride: p.stride,
                row_bytes: p.row_bytes,
                rows: p.rows,
            })
            .collect();
        visit(&refs);
        Ok(())
    }
}

/// In-memory audio block used by synthetic sources and tests.
#[derive(Debug, Clone)]
pub struct MemoryAudioSample {
    bytes: Vec<u8>,
}

impl MemoryAudioSample {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl AudioSample for MemoryAudioSample {
    fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    fn copy_bytes(&self, dst: &mut [u8]) -> Result<(), SampleAccessError> {
        if dst.len() != self.bytes.len() {
            return Err(SampleAccessError::new(format!(
                "destination holds {} bytes, block has {}",
                dst.len(),
                self.bytes.len()
            )));
        }
        dst.copy_from_slice(&self.bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_row_respects_stride() {
        // 2 rows of 3 payload bytes padded to a stride of 4.
        let plane = OwnedPlane {
            bytes: vec![1, 2, 3, 0, 4, 5, 6, 0],
            stride: 4,
            row_bytes: 3,
            rows: 2,
        };
        let sample = MemoryVideoSample::new(3, 2, vec![plane]);
        let mut rows: Vec<Vec<u8>> = Vec::new();
        sample
            .with_planes(&mut |planes| {
                for r in 0..planes[0].rows {
                    rows.push(planes[0].row(r).unwrap().to_vec());
                }
            })
            .unwrap();
        assert_eq!(rows, vec![vec![1, 2, 3], vec![4, 5, 6]]);
    }

    #[test]
    fn plane_row_out_of_bounds_is_none() {
        let plane = OwnedPlane::packed(vec![0u8; 8], 4);
        assert_eq!(plane.rows, 2);
        let r = PlaneRef {
            data: &plane.bytes,
            stride: plane.stride,
            row_bytes: plane.row_bytes,
            rows: plane.rows,
        };
        assert!(r.row(1).is_some());
        assert!(r.row(2).is_none());
    }

    #[test]
    fn audio_copy_length_mismatch_fails() {
        let sample = MemoryAudioSample::new(vec![1, 2, 3, 4]);
        let mut short = [0u8; 2];
        assert!(sample.copy_bytes(&mut short).is_err());
        let mut exact = [0u8; 4];
        sample.copy_bytes(&mut exact).unwrap();
        assert_eq!(exact, [1, 2, 3, 4]);
    }
}
