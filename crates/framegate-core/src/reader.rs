use std::sync::atomic::Ordering;
use std::sync::Arc;

use framegate_foundation::ReadError;
use framegate_telemetry::PipelineMetrics;

use crate::gate::SyncGate;
use crate::interleave::Deinterleaver;
use crate::packet::{Packet, PacketFlags};
use crate::queue::QueueEntry;
use crate::sample::{AudioHandle, VideoHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    WaitingForFirstVideo,
    Recording,
}

/// Audio epoch lifecycle. `Pending` means recording has begun but no
/// audio packet has fixed the origin yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Epoch {
    NotStarted,
    Pending,
    Set(i64),
}

enum Dequeued {
    Video(QueueEntry<VideoHandle>),
    Audio(QueueEntry<AudioHandle>),
}

/// The single pull-based consumer.
///
/// Blocks on the gate, picks a lane by queue pressure, and turns the
/// dequeued sample into one output packet. Holds the gate lock only for
/// list operations; all byte copying happens after release.
pub struct StreamReader {
    gate: Arc<SyncGate>,
    metrics: PipelineMetrics,
    audio_priority_ratio: usize,
    phase: Phase,
    audio_epoch: Epoch,
    has_video_stream: bool,
    deinterleaver: Option<Deinterleaver>,
    video_index: usize,
    audio_index: usize,
}

impl StreamReader {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gate: Arc<SyncGate>,
        metrics: PipelineMetrics,
        audio_priority_ratio: usize,
        has_video_stream: bool,
        deinterleaver: Option<Deinterleaver>,
        video_index: usize,
        audio_index: usize,
    ) -> Self {
        Self {
            gate,
            metrics,
            audio_priority_ratio,
            phase: Phase::WaitingForFirstVideo,
            audio_epoch: Epoch::NotStarted,
            has_video_stream,
            deinterleaver,
            video_index,
            audio_index,
        }
    }

    /// Blocks until one packet can be emitted. Iterations that only move
    /// the state machine forward (discarding pre-roll audio) loop without
    /// returning.
    pub fn read_packet(&mut self) -> Result<Packet, ReadError> {
        loop {
            let mut slot = self.gate.wait_for_data().ok_or(ReadError::Closed)?;

            // Audio goes first only when its backlog outweighs video by
            // more than the configured ratio; otherwise video leads. The
            // preferred lane may have emptied since the signal, so fall
            // through to the other.
            let prefer_audio =
                slot.audio.len() > slot.video.len() * self.audio_priority_ratio;
            let entry = if prefer_audio {
                slot.audio
                    .pop()
                    .map(Dequeued::Audio)
                    .or_else(|| slot.video.pop().map(Dequeued::Video))
            } else {
                slot.video
                    .pop()
                    .map(Dequeued::Video)
                    .or_else(|| slot.audio.pop().map(Dequeued::Audio))
            };

            // The first dequeued frame starts recording. Audio buffered
            // ahead of it belongs to the pre-roll and is discarded under
            // the same lock hold, so both lanes restart from one origin.
            if matches!(entry, Some(Dequeued::Video(_))) && self.phase == Phase::WaitingForFirstVideo
            {
                self.phase = Phase::Recording;
                self.audio_epoch = Epoch::Pending;
                let cleared = slot.audio.clear();
                if cleared > 0 {
                    self.metrics
                        .audio_preroll_dropped
                        .fetch_add(cleared as u64, Ordering::Relaxed);
                    tracing::debug!(cleared, "recording started, cleared buffered pre-roll audio");
                }
            }

            let empty_now = slot.video.is_empty() && slot.audio.is_empty();
            self.metrics
                .update_queue_depths(slot.video.len(), slot.audio.len());
            SyncGate::release(slot, empty_now);

            match entry {
                None => continue,
                Some(Dequeued::Video(entry)) => return self.emit_video(entry),
                Some(Dequeued::Audio(entry)) => {
                    if self.phase == Phase::WaitingForFirstVideo {
                        if self.has_video_stream {
                            // Pre-roll audio dequeued ahead of the first
                            // frame; drop it and keep waiting.
                            self.metrics
                                .audio_preroll_dropped
                                .fetch_add(1, Ordering::Relaxed);
                            continue;
                        }
                        // No video lane configured: the first audio block
                        // starts the stream instead.
                        self.phase = Phase::Recording;
                        self.audio_epoch = Epoch::Pending;
                    }
                    return self.emit_audio(entry);
                }
            }
        }
    }

    fn emit_video(&mut self, entry: QueueEntry<VideoHandle>) -> Result<Packet, ReadError> {
        let mut data = Vec::new();
        let mut bad_row = None;
        entry.sample.with_planes(&mut |planes| {
            let total: usize = planes.iter().map(|p| p.payload_len()).sum();
            data.reserve_exact(total);
            for (index, plane) in planes.iter().enumerate() {
                for r in 0..plane.rows {
                    match plane.row(r) {
                        Some(row) => data.extend_from_slice(row),
                        None => {
                            bad_row = Some((index, r));
                            return;
                        }
                    }
                }
            }
        })?;
        if let Some((plane, row)) = bad_row {
            return Err(ReadError::Malformed(format!(
                "video plane {} row {} lies outside its mapping",
                plane, row
            )));
        }

        self.metrics.video_packets.fetch_add(1, Ordering::Relaxed);
        self.metrics.mark_packet_emitted();
        Ok(Packet {
            data,
            pts: entry.pts,
            dts: entry.pts,
            stream_index: self.video_index,
            flags: PacketFlags { key_frame: true },
        })
    }

    fn emit_audio(&mut self, entry: QueueEntry<AudioHandle>) -> Result<Packet, ReadError> {
        // Entries carry capture-clock time; the first block emitted after
        // the recording transition becomes the origin.
        let pts = match self.audio_epoch {
            Epoch::Set(epoch) => entry.pts - epoch,
            Epoch::Pending | Epoch::NotStarted => {
                self.audio_epoch = Epoch::Set(entry.pts);
                0
            }
        };

        let mut raw = vec![0u8; entry.sample.byte_len()];
        entry.sample.copy_bytes(&mut raw)?;
        let data = match &self.deinterleaver {
            Some(d) => d.interleave(&raw)?,
            None => raw,
        };

        self.metrics.audio_packets.fetch_add(1, Ordering::Relaxed);
        self.metrics.mark_packet_emitted();
        Ok(Packet {
            data,
            pts,
            dts: pts,
            stream_index: self.audio_index,
            flags: PacketFlags { key_frame: true },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{AudioSample, MemoryAudioSample, MemoryVideoSample, OwnedPlane, PlaneRef};
    use framegate_foundation::SampleAccessError;

    fn frame(byte: u8) -> VideoHandle {
        Arc::new(MemoryVideoSample::new(
            2,
            2,
            vec![OwnedPlane::packed(vec![byte; 8], 4)],
        ))
    }

    fn block(bytes: &[u8]) -> AudioHandle {
        Box::new(MemoryAudioSample::new(bytes.to_vec()))
    }

    fn reader(gate: &Arc<SyncGate>, has_video: bool) -> StreamReader {
        StreamReader::new(
            Arc::clone(gate),
            PipelineMetrics::default(),
            7,
            has_video,
            None,
            0,
            if has_video { 1 } else { 0 },
        )
    }

    struct FailingVideoSample;

    impl crate::sample::VideoSample for FailingVideoSample {
        fn width(&self) -> u32 {
            2
        }
        fn height(&self) -> u32 {
            2
        }
        fn with_planes(
            &self,
            _visit: &mut dyn FnMut(&[PlaneRef<'_>]),
        ) -> Result<(), SampleAccessError> {
            Err(SampleAccessError::new("mapping failed"))
        }
    }

    struct TruncatedAudioSample;

    impl AudioSample for TruncatedAudioSample {
        fn byte_len(&self) -> usize {
            4
        }
        fn copy_bytes(&self, _dst: &mut [u8]) -> Result<(), SampleAccessError> {
            Err(SampleAccessError::new("block unavailable"))
        }
    }

    #[test]
    fn video_packet_passes_pts_through() {
        let gate = Arc::new(SyncGate::new(4, 4));
        let mut r = reader(&gate, true);

        gate.enqueue_video(frame(9), 1_000);
        let pkt = r.read_packet().unwrap();
        assert_eq!(pkt.pts, 1_000);
        assert_eq!(pkt.dts, 1_000);
        assert_eq!(pkt.stream_index, 0);
        assert!(pkt.flags.key_frame);
        assert_eq!(pkt.data, vec![9u8; 8]);
    }

    #[test]
    fn stride_padding_is_trimmed_from_packets() {
        let gate = Arc::new(SyncGate::new(4, 4));
        let mut r = reader(&gate, true);

        let plane = OwnedPlane {
            bytes: vec![1, 2, 3, 0xAA, 4, 5, 6, 0xAA],
            stride: 4,
            row_bytes: 3,
            rows: 2,
        };
        gate.enqueue_video(Arc::new(MemoryVideoSample::new(3, 2, vec![plane])), 0);
        let pkt = r.read_packet().unwrap();
        assert_eq!(pkt.data, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn preroll_audio_is_never_surfaced() {
        let gate = Arc::new(SyncGate::new(4, 16));
        let mut r = reader(&gate, true);

        for i in 0..3 {
            gate.enqueue_audio(block(&[i as u8; 4]), 100 + i);
        }
        gate.enqueue_video(frame(1), 0);

        // 3 audio vs 1 video stays under the ratio, so video leads and
        // the pre-roll never surfaces.
        let pkt = r.read_packet().unwrap();
        assert_eq!(pkt.stream_index, 0);

        // The transition cleared the backlog; only fresh audio surfaces.
        gate.enqueue_audio(block(&[7u8; 4]), 500);
        let pkt = r.read_packet().unwrap();
        assert_eq!(pkt.stream_index, 1);
        assert_eq!(pkt.pts, 0);
        assert_eq!(r.metrics.snapshot().audio_preroll_dropped, 3);
    }

    #[test]
    fn deep_preroll_backlog_is_drained_one_per_iteration() {
        let gate = Arc::new(SyncGate::new(4, 64));
        let mut r = reader(&gate, true);

        // 20 audio blocks and one frame. The ratio prefers audio while
        // the backlog stays heavy, so the reader chews through pre-roll
        // until video wins the selection.
        for i in 0..20 {
            gate.enqueue_audio(block(&[0u8; 4]), i);
        }
        gate.enqueue_video(frame(1), 0);

        let pkt = r.read_packet().unwrap();
        assert_eq!(pkt.stream_index, 0);
        let snap = r.metrics.snapshot();
        assert_eq!(snap.audio_preroll_dropped, 20);
        assert_eq!(snap.audio_depth, 0);
    }

    #[test]
    fn audio_epoch_rebases_from_first_emitted_block() {
        let gate = Arc::new(SyncGate::new(4, 16));
        let mut r = reader(&gate, true);

        gate.enqueue_video(frame(0), 0);
        assert_eq!(r.read_packet().unwrap().stream_index, 0);

        gate.enqueue_audio(block(&[1; 4]), 90_000);
        gate.enqueue_audio(block(&[2; 4]), 111_333);
        assert_eq!(r.read_packet().unwrap().pts, 0);
        assert_eq!(r.read_packet().unwrap().pts, 21_333);
    }

    #[test]
    fn audio_only_session_starts_on_first_block() {
        let gate = Arc::new(SyncGate::new(4, 16));
        let mut r = reader(&gate, false);

        gate.enqueue_audio(block(&[1; 4]), 70_000);
        gate.enqueue_audio(block(&[2; 4]), 91_000);

        let pkt = r.read_packet().unwrap();
        assert_eq!(pkt.stream_index, 0);
        assert_eq!(pkt.pts, 0);
        // The backlog survives: nothing to align against without video.
        let pkt = r.read_packet().unwrap();
        assert_eq!(pkt.pts, 21_000);
        assert_eq!(r.metrics.snapshot().audio_preroll_dropped, 0);
    }

    #[test]
    fn ratio_prefers_audio_only_past_sevenfold() {
        let gate = Arc::new(SyncGate::new(8, 64));
        let mut r = reader(&gate, true);

        gate.enqueue_video(frame(0), 0);
        assert_eq!(r.read_packet().unwrap().stream_index, 0);

        // One frame, eight audio blocks: 8 > 1 * 7, audio goes first.
        gate.enqueue_video(frame(1), 40_000);
        for i in 0..8 {
            gate.enqueue_audio(block(&[0; 4]), 10_000 * i);
        }
        assert_eq!(r.read_packet().unwrap().stream_index, 1);
        // Down to 7 audio vs 1 video: video's turn again.
        assert_eq!(r.read_packet().unwrap().stream_index, 0);
    }

    #[test]
    fn mapping_failure_aborts_only_this_call() {
        let gate = Arc::new(SyncGate::new(4, 4));
        let mut r = reader(&gate, true);

        gate.enqueue_video(Arc::new(FailingVideoSample), 0);
        gate.enqueue_video(frame(3), 40_000);

        match r.read_packet() {
            Err(ReadError::Sample(_)) => {}
            other => panic!("expected sample access failure, got {:?}", other),
        }
        // The stream stays usable for the next call.
        let pkt = r.read_packet().unwrap();
        assert_eq!(pkt.pts, 40_000);
    }

    #[test]
    fn audio_copy_failure_surfaces_as_read_error() {
        let gate = Arc::new(SyncGate::new(4, 4));
        let mut r = reader(&gate, false);

        gate.enqueue_audio(Box::new(TruncatedAudioSample), 0);
        assert!(matches!(r.read_packet(), Err(ReadError::Sample(_))));
    }

    #[test]
    fn closed_gate_yields_closed_error() {
        let gate = Arc::new(SyncGate::new(4, 4));
        let mut r = reader(&gate, true);
        gate.close();
        assert!(matches!(r.read_packet(), Err(ReadError::Closed)));
    }
}
