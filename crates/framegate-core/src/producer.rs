use std::sync::atomic::Ordering;
use std::sync::Arc;

use framegate_foundation::{Fps, MediaTime};
use framegate_telemetry::PipelineMetrics;

use crate::gate::SyncGate;
use crate::pacer::{FrameRatePacer, PacerDecision};
use crate::sample::{AudioHandle, MediaKind, VideoHandle};

/// Logs the first eviction of a burst, then stays quiet until the queue
/// recovers, reporting the tally on the way out.
#[derive(Debug, Default)]
struct DropBurst {
    in_burst: bool,
    suppressed: u64,
}

impl DropBurst {
    /// Returns true when this eviction should be logged.
    fn evicted(&mut self) -> bool {
        if self.in_burst {
            self.suppressed += 1;
            false
        } else {
            self.in_burst = true;
            self.suppressed = 0;
            true
        }
    }

    /// Called on an enqueue that did not evict. Returns how many evictions
    /// went unlogged if a burst just ended.
    fn recovered(&mut self) -> Option<u64> {
        if !self.in_burst {
            return None;
        }
        self.in_burst = false;
        (self.suppressed > 0).then_some(self.suppressed)
    }
}

/// Video-side callback endpoint handed to the capture backend.
///
/// Runs on the backend's delivery thread. Rescales the device timestamp,
/// rebases it against the stream epoch, consults the pacer, and enqueues
/// without ever blocking.
pub struct VideoProducer {
    gate: Arc<SyncGate>,
    metrics: PipelineMetrics,
    epoch: Option<i64>,
    pacer: Option<FrameRatePacer>,
    burst: DropBurst,
}

impl VideoProducer {
    pub fn new(gate: Arc<SyncGate>, metrics: PipelineMetrics, target_fps: Option<Fps>) -> Self {
        Self {
            gate,
            metrics,
            epoch: None,
            pacer: target_fps.map(FrameRatePacer::new),
            burst: DropBurst::default(),
        }
    }

    pub fn on_sample(&mut self, sample: VideoHandle, ts: MediaTime) {
        let Some(device_us) = ts.to_micros() else {
            // Backend could not attach usable timing; the sample is
            // unplaceable in the stream.
            self.metrics.video_discarded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("discarding video sample with invalid timing");
            return;
        };
        let epoch = *self.epoch.get_or_insert(device_us);
        let t = device_us - epoch;

        match self.pacer.as_mut().map(|p| p.on_sample(t)) {
            Some(PacerDecision::Suppress) => {
                self.metrics.video_suppressed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(pts = t, "pacer suppressed video frame");
            }
            Some(PacerDecision::Duplicate) => {
                self.metrics.video_duplicated.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(pts = t, "pacer duplicating video frame");
                self.enqueue(Arc::clone(&sample), t - 1);
                self.enqueue(sample, t);
            }
            Some(PacerDecision::Accept) | None => {
                self.enqueue(sample, t);
            }
        }
    }

    /// Backend-reported loss upstream of this bridge. Notification only.
    pub fn on_sample_dropped(&self) {
        self.metrics.backend_drops.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(kind = %MediaKind::Video, "capture backend reported a dropped sample");
    }

    fn enqueue(&mut self, sample: VideoHandle, pts: i64) {
        match self.gate.enqueue_video(sample, pts) {
            Some(evicted) => {
                self.metrics.video_evicted.fetch_add(1, Ordering::Relaxed);
                if self.burst.evicted() {
                    tracing::warn!(
                        evicted_pts = evicted.pts,
                        incoming_pts = pts,
                        "video queue full, dropping oldest frame"
                    );
                }
            }
            None => {
                if let Some(unlogged) = self.burst.recovered() {
                    tracing::warn!(count = unlogged, "video queue recovered after further drops");
                }
            }
        }
        self.metrics.video_enqueued.fetch_add(1, Ordering::Relaxed);
    }
}

/// Audio-side callback endpoint handed to the capture backend.
///
/// Audio entries are queued at capture-clock microseconds; the reader
/// rebases them once its epoch is fixed.
pub struct AudioProducer {
    gate: Arc<SyncGate>,
    metrics: PipelineMetrics,
    burst: DropBurst,
}

impl AudioProducer {
    pub fn new(gate: Arc<SyncGate>, metrics: PipelineMetrics) -> Self {
        Self {
            gate,
            metrics,
            burst: DropBurst::default(),
        }
    }

    pub fn on_sample(&mut self, sample: AudioHandle, ts: MediaTime) {
        let Some(device_us) = ts.to_micros() else {
            self.metrics.audio_discarded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("discarding audio block with invalid timing");
            return;
        };

        match self.gate.enqueue_audio(sample, device_us) {
            Some(evicted) => {
                self.metrics.audio_evicted.fetch_add(1, Ordering::Relaxed);
                if self.burst.evicted() {
                    tracing::warn!(
                        evicted_pts = evicted.pts,
                        incoming_pts = device_us,
                        "audio queue full, dropping oldest block"
                    );
                }
            }
            None => {
                if let Some(unlogged) = self.burst.recovered() {
                    tracing::warn!(count = unlogged, "audio queue recovered after further drops");
                }
            }
        }
        self.metrics.audio_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_sample_dropped(&self) {
        self.metrics.backend_drops.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(kind = %MediaKind::Audio, "capture backend reported a dropped sample");
    }
}
