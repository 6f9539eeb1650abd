use framegate_foundation::{CaptureError, ReadError};

use crate::packet::AudioStreamParams;

/// Planar-to-interleaved PCM transform with bit-depth widening.
///
/// The source lays channels out as `channels` contiguous runs of samples.
/// Samples ride in 2-byte containers up to 16 bits and 4-byte containers
/// above; narrower values sit low-aligned and are left-shifted up to full
/// container scale on the way out, so the transform deinterleaves and
/// normalizes depth in one pass.
pub struct Deinterleaver {
    channels: usize,
    container_bytes: usize,
    shift: u32,
}

impl Deinterleaver {
    pub fn new(params: &AudioStreamParams) -> Result<Self, CaptureError> {
        let unsupported = |reason: String| CaptureError::UnsupportedAudioFormat { reason };

        if params.channels == 0 {
            return Err(unsupported("zero channels".into()));
        }
        if !matches!(params.bits_per_sample, 8 | 16 | 24 | 32) {
            return Err(unsupported(format!(
                "{}-bit samples cannot be widened",
                params.bits_per_sample
            )));
        }
        let container_bits = params.container_bytes() as u32 * 8;
        let shift = container_bits - params.bits_per_sample as u32;

        if params.is_float && params.bits_per_sample != 32 {
            return Err(unsupported(format!(
                "{}-bit float samples",
                params.bits_per_sample
            )));
        }
        if params.packed && shift != 0 {
            return Err(unsupported(format!(
                "packed {}-bit samples",
                params.bits_per_sample
            )));
        }
        // Shifting foreign-endian words would scramble them; without a
        // shift the transform is a pure byte move and endianness survives.
        if params.big_endian && shift != 0 {
            return Err(unsupported(format!(
                "big-endian {}-bit samples require widening",
                params.bits_per_sample
            )));
        }

        Ok(Self {
            channels: params.channels as usize,
            container_bytes: params.container_bytes(),
            shift,
        })
    }

    pub fn container_bytes(&self) -> usize {
        self.container_bytes
    }

    /// Interleaves one planar block. The output is the same length as the
    /// input; only order and scale change.
    pub fn interleave(&self, src: &[u8]) -> Result<Vec<u8>, ReadError> {
        let frame_bytes = self.channels * self.container_bytes;
        if frame_bytes == 0 || src.len() % frame_bytes != 0 {
            return Err(ReadError::Malformed(format!(
                "audio block of {} bytes does not divide into {} channels of {}-byte containers",
                src.len(),
                self.channels,
                self.container_bytes
            )));
        }
        let num_samples = src.len() / frame_bytes;
        let mut out = vec![0u8; src.len()];

        // With shift 0 the round trip below is an exact byte move, which
        // also covers float and big-endian payloads.
        match self.container_bytes {
            2 => {
                for c in 0..self.channels {
                    let run = &src[c * num_samples * 2..];
                    for i in 0..num_samples {
                        let v = i16::from_ne_bytes([run[i * 2], run[i * 2 + 1]]) << self.shift;
                        let dst = (i * self.channels + c) * 2;
                        out[dst..dst + 2].copy_from_slice(&v.to_ne_bytes());
                    }
                }
            }
            _ => {
                for c in 0..self.channels {
                    let run = &src[c * num_samples * 4..];
                    for i in 0..num_samples {
                        let v = i32::from_ne_bytes([
                            run[i * 4],
                            run[i * 4 + 1],
                            run[i * 4 + 2],
                            run[i * 4 + 3],
                        ]) << self.shift;
                        let dst = (i * self.channels + c) * 4;
                        out[dst..dst + 4].copy_from_slice(&v.to_ne_bytes());
                    }
                }
            }
        }
        Ok(out)
    }
}
