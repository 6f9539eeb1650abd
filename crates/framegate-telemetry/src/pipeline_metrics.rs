use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared metrics for cross-thread pipeline monitoring
#[derive(Clone)]
pub struct PipelineMetrics {
    // Producer-side counters
    pub video_enqueued: Arc<AtomicU64>,
    pub video_evicted: Arc<AtomicU64>,   // Oldest frame pushed out of a full queue
    pub video_suppressed: Arc<AtomicU64>, // Dropped by the frame-rate pacer
    pub video_duplicated: Arc<AtomicU64>, // Re-enqueued by the frame-rate pacer
    pub video_discarded: Arc<AtomicU64>,  // Invalid timestamp, never enqueued
    pub audio_enqueued: Arc<AtomicU64>,
    pub audio_evicted: Arc<AtomicU64>,
    pub audio_discarded: Arc<AtomicU64>,
    pub backend_drops: Arc<AtomicU64>, // Frames the capture backend reported losing

    // Consumer-side counters
    pub video_packets: Arc<AtomicU64>,
    pub audio_packets: Arc<AtomicU64>,
    pub audio_preroll_dropped: Arc<AtomicU64>, // Audio discarded before the first frame

    // Queue depth gauges, updated under the gate lock
    pub video_depth: Arc<AtomicUsize>,
    pub audio_depth: Arc<AtomicUsize>,

    // Activity indicators
    pub last_packet_time: Arc<RwLock<Option<Instant>>>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            video_enqueued: Arc::new(AtomicU64::new(0)),
            video_evicted: Arc::new(AtomicU64::new(0)),
            video_suppressed: Arc::new(AtomicU64::new(0)),
            video_duplicated: Arc::new(AtomicU64::new(0)),
            video_discarded: Arc::new(AtomicU64::new(0)),
            audio_enqueued: Arc::new(AtomicU64::new(0)),
            audio_evicted: Arc::new(AtomicU64::new(0)),
            audio_discarded: Arc::new(AtomicU64::new(0)),
            backend_drops: Arc::new(AtomicU64::new(0)),

            video_packets: Arc::new(AtomicU64::new(0)),
            audio_packets: Arc::new(AtomicU64::new(0)),
            audio_preroll_dropped: Arc::new(AtomicU64::new(0)),

            video_depth: Arc::new(AtomicUsize::new(0)),
            audio_depth: Arc::new(AtomicUsize::new(0)),

            last_packet_time: Arc::new(RwLock::new(None)),
        }
    }
}

impl PipelineMetrics {
    pub fn mark_packet_emitted(&self) {
        *self.last_packet_time.write() = Some(Instant::now());
    }

    pub fn update_queue_depths(&self, video: usize, audio: usize) {
        self.video_depth.store(video, Ordering::Relaxed);
        self.audio_depth.store(audio, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            video_enqueued: self.video_enqueued.load(Ordering::Relaxed),
            video_evicted: self.video_evicted.load(Ordering::Relaxed),
            video_suppressed: self.video_suppressed.load(Ordering::Relaxed),
            video_duplicated: self.video_duplicated.load(Ordering::Relaxed),
            video_discarded: self.video_discarded.load(Ordering::Relaxed),
            audio_enqueued: self.audio_enqueued.load(Ordering::Relaxed),
            audio_evicted: self.audio_evicted.load(Ordering::Relaxed),
            audio_discarded: self.audio_discarded.load(Ordering::Relaxed),
            backend_drops: self.backend_drops.load(Ordering::Relaxed),
            video_packets: self.video_packets.load(Ordering::Relaxed),
            audio_packets: self.audio_packets.load(Ordering::Relaxed),
            audio_preroll_dropped: self.audio_preroll_dropped.load(Ordering::Relaxed),
            video_depth: self.video_depth.load(Ordering::Relaxed),
            audio_depth: self.audio_depth.load(Ordering::Relaxed),
            idle_for: self.last_packet_time.read().map(|t| t.elapsed()),
        }
    }
}

/// Point-in-time copy of every counter, cheap to log or compare.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub video_enqueued: u64,
    pub video_evicted: u64,
    pub video_suppressed: u64,
    pub video_duplicated: u64,
    pub video_discarded: u64,
    pub audio_enqueued: u64,
    pub audio_evicted: u64,
    pub audio_discarded: u64,
    pub backend_drops: u64,
    pub video_packets: u64,
    pub audio_packets: u64,
    pub audio_preroll_dropped: u64,
    pub video_depth: usize,
    pub audio_depth: usize,
    pub idle_for: Option<Duration>,
}

impl MetricsSnapshot {
    pub fn total_packets(&self) -> u64 {
        self.video_packets + self.audio_packets
    }

    pub fn total_lost(&self) -> u64 {
        self.video_evicted + self.audio_evicted + self.backend_drops
    }
}

#[derive(Debug)]
pub struct FpsTracker {
    last_update: Instant,
    frame_count: u64,
}

impl FpsTracker {
    pub fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frame_count: 0,
        }
    }

    pub fn tick(&mut self) -> Option<f64> {
        self.frame_count += 1;
        let elapsed = self.last_update.elapsed();

        if elapsed >= Duration::from_secs(1) {
            let fps = self.frame_count as f64 / elapsed.as_secs_f64();
            self.last_update = Instant::now();
            self.frame_count = 0;
            Some(fps)
        } else {
            None
        }
    }
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let metrics = PipelineMetrics::default();
        metrics.video_enqueued.fetch_add(3, Ordering::Relaxed);
        metrics.video_evicted.fetch_add(1, Ordering::Relaxed);
        metrics.audio_packets.fetch_add(5, Ordering::Relaxed);
        metrics.update_queue_depths(2, 14);

        let snap = metrics.snapshot();
        assert_eq!(snap.video_enqueued, 3);
        assert_eq!(snap.video_evicted, 1);
        assert_eq!(snap.total_packets(), 5);
        assert_eq!(snap.total_lost(), 1);
        assert_eq!(snap.video_depth, 2);
        assert_eq!(snap.audio_depth, 14);
        assert!(snap.idle_for.is_none());
    }

    #[test]
    fn clones_share_storage() {
        let metrics = PipelineMetrics::default();
        let other = metrics.clone();
        other.backend_drops.fetch_add(7, Ordering::Relaxed);
        assert_eq!(metrics.snapshot().backend_drops, 7);
    }

    #[test]
    fn mark_packet_sets_idle_clock() {
        let metrics = PipelineMetrics::default();
        metrics.mark_packet_emitted();
        let idle = metrics.snapshot().idle_for;
        assert!(idle.is_some());
        assert!(idle.unwrap() < Duration::from_secs(1));
    }
}
