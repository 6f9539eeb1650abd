use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use framegate_core::{
    AudioProducer, CaptureBackend, MemoryAudioSample, MemoryVideoSample, OwnedPlane, Producers,
    VideoProducer,
};
use framegate_foundation::{CaptureError, MediaTime, MICROS_PER_SECOND};

/// Pretend device clock: a session does not start at zero, so normalized
/// output timestamps prove the epoch rebasing actually ran.
const DEVICE_CLOCK_BASE_US: i64 = 86_400_000_000;

/// Row stride alignment of the pretend video hardware.
const ROW_ALIGN: usize = 64;

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    /// Actual delivery rate of the camera, which the pacer corrects
    /// toward the configured target.
    pub camera_fps: u32,
    /// Timestamp wobble as a percentage of the frame period.
    pub jitter_pct: u32,
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples per channel in one audio block.
    pub block_samples: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 300,
            height: 200,
            camera_fps: 30,
            jitter_pct: 0,
            sample_rate: 48_000,
            channels: 2,
            block_samples: 1024,
        }
    }
}

/// Capture backend that fabricates samples on real producer threads:
/// a moving gradient for video and planar sine tones for audio.
pub struct SyntheticBackend {
    cfg: SyntheticConfig,
    stop_tx: Option<Sender<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl SyntheticBackend {
    pub fn new(cfg: SyntheticConfig) -> Self {
        Self {
            cfg,
            stop_tx: None,
            workers: Vec::new(),
        }
    }

    pub fn boxed(cfg: SyntheticConfig) -> Box<Self> {
        Box::new(Self::new(cfg))
    }
}

impl CaptureBackend for SyntheticBackend {
    fn start(&mut self, producers: Producers) -> Result<(), CaptureError> {
        let (stop_tx, stop_rx) = bounded::<()>(0);

        if let Some(producer) = producers.video {
            let cfg = self.cfg.clone();
            let stop = stop_rx.clone();
            let handle = thread::Builder::new()
                .name("synthetic-video".to_string())
                .spawn(move || video_loop(cfg, producer, stop))
                .map_err(|e| CaptureError::Backend(format!("failed to spawn video source: {}", e)))?;
            self.workers.push(handle);
        }

        if let Some(producer) = producers.audio {
            let cfg = self.cfg.clone();
            let stop = stop_rx.clone();
            let handle = thread::Builder::new()
                .name("synthetic-audio".to_string())
                .spawn(move || audio_loop(cfg, producer, stop))
                .map_err(|e| CaptureError::Backend(format!("failed to spawn audio source: {}", e)))?;
            self.workers.push(handle);
        }

        self.stop_tx = Some(stop_tx);
        Ok(())
    }

    fn stop(&mut self) {
        // Dropping the sender disconnects both receivers, so the workers
        // fall out of their paced waits immediately.
        self.stop_tx.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for SyntheticBackend {
    fn drop(&mut self) {
        self.stop();
    }
}

fn video_loop(cfg: SyntheticConfig, mut producer: VideoProducer, stop: Receiver<()>) {
    let period_us = MICROS_PER_SECOND / cfg.camera_fps as i64;
    let period = Duration::from_micros(period_us as u64);
    tracing::info!(
        fps = cfg.camera_fps,
        width = cfg.width,
        height = cfg.height,
        "synthetic video source started"
    );

    let mut tick: u64 = 0;
    loop {
        match stop.recv_timeout(period) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let jitter = if cfg.jitter_pct > 0 {
            let bound = period_us * cfg.jitter_pct as i64 / 100;
            fastrand::i64(-bound..=bound)
        } else {
            0
        };
        let ts_us = DEVICE_CLOCK_BASE_US + tick as i64 * period_us + jitter;

        let frame = gradient_frame(&cfg, tick);
        // Delivered on a nanosecond device clock, as real drivers do.
        producer.on_sample(Arc::new(frame), MediaTime::new(ts_us * 1_000, 1_000_000_000));
        tick += 1;
    }

    tracing::info!(frames = tick, "synthetic video source stopped");
}

fn audio_loop(cfg: SyntheticConfig, mut producer: AudioProducer, stop: Receiver<()>) {
    let block_period_us = cfg.block_samples as i64 * MICROS_PER_SECOND / cfg.sample_rate as i64;
    let period = Duration::from_micros(block_period_us as u64);
    tracing::info!(
        rate = cfg.sample_rate,
        channels = cfg.channels,
        block_samples = cfg.block_samples,
        "synthetic audio source started"
    );

    let mut block: u64 = 0;
    loop {
        match stop.recv_timeout(period) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let ts_us = DEVICE_CLOCK_BASE_US + block as i64 * block_period_us;
        let bytes = tone_block(&cfg, block);
        producer.on_sample(
            Box::new(MemoryAudioSample::new(bytes)),
            MediaTime::new(ts_us * 1_000, 1_000_000_000),
        );
        block += 1;
    }

    tracing::info!(blocks = block, "synthetic audio source stopped");
}

/// A diagonal gradient that slides with time, padded out to the pretend
/// hardware's row alignment.
fn gradient_frame(cfg: &SyntheticConfig, tick: u64) -> MemoryVideoSample {
    let row_bytes = cfg.width as usize;
    let stride = (row_bytes + ROW_ALIGN - 1) / ROW_ALIGN * ROW_ALIGN;
    let rows = cfg.height as usize;

    let mut bytes = vec![0u8; stride * rows];
    for y in 0..rows {
        let row = &mut bytes[y * stride..y * stride + row_bytes];
        for (x, px) in row.iter_mut().enumerate() {
            *px = (x as u64 + y as u64 + tick * 4) as u8;
        }
    }

    MemoryVideoSample::new(
        cfg.width,
        cfg.height,
        vec![OwnedPlane {
            bytes,
            stride,
            row_bytes,
            rows,
        }],
    )
}

/// One planar block of per-channel sine tones, phase-continuous across
/// blocks. Channel runs sit one after another, s16 native-endian.
fn tone_block(cfg: &SyntheticConfig, block: u64) -> Vec<u8> {
    let start = block * cfg.block_samples as u64;
    let mut bytes = Vec::with_capacity(cfg.block_samples * cfg.channels as usize * 2);
    for c in 0..cfg.channels {
        let freq = 440.0 * (c + 1) as f64;
        for i in 0..cfg.block_samples {
            let t = (start + i as u64) as f64 / cfg.sample_rate as f64;
            let v = (std::f64::consts::TAU * freq * t).sin();
            let s = (v * 0.3 * i16::MAX as f64) as i16;
            bytes.extend_from_slice(&s.to_ne_bytes());
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use framegate_core::VideoSample;

    #[test]
    fn gradient_frame_pads_rows_to_alignment() {
        let cfg = SyntheticConfig {
            width: 300,
            height: 4,
            ..Default::default()
        };
        let frame = gradient_frame(&cfg, 0);
        frame
            .with_planes(&mut |planes| {
                assert_eq!(planes.len(), 1);
                assert_eq!(planes[0].row_bytes, 300);
                assert_eq!(planes[0].stride, 320);
                assert_eq!(planes[0].rows, 4);
                // Row content is the diagonal gradient, not the padding.
                let row = planes[0].row(1).unwrap();
                assert_eq!(row[0], 1);
                assert_eq!(row[10], 11);
            })
            .unwrap();
    }

    #[test]
    fn gradient_slides_with_time() {
        let cfg = SyntheticConfig {
            width: 8,
            height: 1,
            ..Default::default()
        };
        let a = gradient_frame(&cfg, 0);
        let b = gradient_frame(&cfg, 1);
        let mut first = (0u8, 0u8);
        a.with_planes(&mut |p| first.0 = p[0].row(0).unwrap()[0]).unwrap();
        b.with_planes(&mut |p| first.1 = p[0].row(0).unwrap()[0]).unwrap();
        assert_eq!(first.1, first.0.wrapping_add(4));
    }

    #[test]
    fn tone_block_is_planar_and_phase_continuous() {
        let cfg = SyntheticConfig {
            sample_rate: 48_000,
            channels: 2,
            block_samples: 16,
            ..Default::default()
        };
        let b0 = tone_block(&cfg, 0);
        assert_eq!(b0.len(), 16 * 2 * 2);

        // Sample 16 computed inside block 1 must match sample 16 computed
        // from a doubled block 0, channel run by channel run.
        let wide = SyntheticConfig {
            block_samples: 32,
            ..cfg.clone()
        };
        let reference = tone_block(&wide, 0);
        let b1 = tone_block(&cfg, 1);
        // Channel 0 run: reference samples 16..32 == block 1 samples 0..16.
        assert_eq!(&b1[0..32], &reference[32..64]);
        // Channel 1 run follows its own continuity.
        assert_eq!(&b1[32..64], &reference[96..128]);
    }
}
