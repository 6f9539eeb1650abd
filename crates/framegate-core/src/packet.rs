use framegate_foundation::CaptureError;

/// One unit of output handed to the pull-based consumer.
///
/// `data` is tightly packed (no row padding, audio interleaved). Every
/// packet from this bridge is a key frame and carries `pts == dts`.
#[derive(Debug, Clone)]
pub struct Packet {
    pub data: Vec<u8>,
    /// Microseconds since the stream epoch.
    pub pts: i64,
    pub dts: i64,
    pub stream_index: usize,
    pub flags: PacketFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketFlags {
    pub key_frame: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoStreamParams {
    pub width: u32,
    pub height: u32,
}

/// Negotiated audio layout, immutable for the life of the session.
///
/// Integer samples ride in 2-byte containers up to 16 bits and 4-byte
/// containers above, low-aligned. `packed` asserts the sample width fills
/// its container exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioStreamParams {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub is_float: bool,
    pub is_signed: bool,
    pub big_endian: bool,
    pub packed: bool,
    pub interleaved: bool,
}

impl AudioStreamParams {
    /// Conventional signed 16-bit little-endian PCM.
    pub fn s16(channels: u16, sample_rate: u32, interleaved: bool) -> Self {
        Self {
            channels,
            sample_rate,
            bits_per_sample: 16,
            is_float: false,
            is_signed: true,
            big_endian: false,
            packed: true,
            interleaved,
        }
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.channels == 0 {
            return Err(CaptureError::UnsupportedAudioFormat {
                reason: "zero channels".into(),
            });
        }
        if self.sample_rate == 0 {
            return Err(CaptureError::UnsupportedAudioFormat {
                reason: "zero sample rate".into(),
            });
        }
        Ok(())
    }

    /// Bytes per sample container as stored and as emitted.
    pub fn container_bytes(&self) -> usize {
        if self.bits_per_sample <= 16 {
            2
        } else {
            4
        }
    }
}

/// Stream layout of the packet sequence, for the host demuxer.
///
/// Indices are assigned at session construction: video first when
/// configured, audio next.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub video_index: Option<usize>,
    pub audio_index: Option<usize>,
    pub video: Option<VideoStreamParams>,
    pub audio: Option<AudioStreamParams>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_width_tracks_depth() {
        let mut p = AudioStreamParams::s16(2, 48_000, false);
        assert_eq!(p.container_bytes(), 2);
        p.bits_per_sample = 24;
        assert_eq!(p.container_bytes(), 4);
        p.bits_per_sample = 8;
        assert_eq!(p.container_bytes(), 2);
        p.bits_per_sample = 32;
        assert_eq!(p.container_bytes(), 4);
    }

    #[test]
    fn degenerate_params_rejected() {
        let mut p = AudioStreamParams::s16(0, 48_000, true);
        assert!(p.validate().is_err());
        p.channels = 2;
        p.sample_rate = 0;
        assert!(p.validate().is_err());
    }
}
