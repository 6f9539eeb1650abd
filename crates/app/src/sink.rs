use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;

use framegate_core::Packet;

/// Writes emitted audio packets into a 16-bit PCM WAV file.
pub struct WavSink {
    writer: hound::WavWriter<BufWriter<File>>,
}

impl WavSink {
    pub fn create(path: &Path, channels: u16, sample_rate: u32) -> anyhow::Result<Self> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path, spec)
            .with_context(|| format!("failed to create {}", path.display()))?;
        Ok(Self { writer })
    }

    pub fn write_packet(&mut self, packet: &Packet) -> anyhow::Result<()> {
        for pair in packet.data.chunks_exact(2) {
            let sample = i16::from_ne_bytes([pair[0], pair[1]]);
            self.writer
                .write_sample(sample)
                .context("failed to write audio sample")?;
        }
        Ok(())
    }

    pub fn finalize(self) -> anyhow::Result<()> {
        self.writer.finalize().context("failed to finalize wav file")
    }
}

/// Appends raw video frame payloads back to back, one file per run.
pub struct RawVideoSink {
    writer: BufWriter<File>,
    frames: u64,
}

impl RawVideoSink {
    pub fn create(path: &Path) -> anyhow::Result<Self> {
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
            frames: 0,
        })
    }

    pub fn write_packet(&mut self, packet: &Packet) -> anyhow::Result<()> {
        self.writer
            .write_all(&packet.data)
            .context("failed to write video frame")?;
        self.frames += 1;
        Ok(())
    }

    pub fn finalize(mut self) -> anyhow::Result<u64> {
        self.writer.flush().context("failed to flush video file")?;
        Ok(self.frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framegate_core::PacketFlags;

    fn audio_packet(samples: &[i16]) -> Packet {
        let mut data = Vec::with_capacity(samples.len() * 2);
        for s in samples {
            data.extend_from_slice(&s.to_ne_bytes());
        }
        Packet {
            data,
            pts: 0,
            dts: 0,
            stream_index: 0,
            flags: PacketFlags::default(),
        }
    }

    #[test]
    fn wav_sink_round_trips_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");

        let mut sink = WavSink::create(&path, 2, 48_000).unwrap();
        sink.write_packet(&audio_packet(&[100, -100, 2000, -2000])).unwrap();
        sink.finalize().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 48_000);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![100, -100, 2000, -2000]);
    }

    #[test]
    fn raw_sink_counts_frames_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video.raw");

        let mut sink = RawVideoSink::create(&path).unwrap();
        for fill in [1u8, 2, 3] {
            let packet = Packet {
                data: vec![fill; 16],
                pts: 0,
                dts: 0,
                stream_index: 0,
                flags: PacketFlags::default(),
            };
            sink.write_packet(&packet).unwrap();
        }
        let frames = sink.finalize().unwrap();

        assert_eq!(frames, 3);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 48);
    }
}
