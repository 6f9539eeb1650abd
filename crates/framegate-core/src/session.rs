use std::sync::Arc;

use framegate_foundation::{CaptureError, ReadError, StreamConfig};
use framegate_telemetry::PipelineMetrics;

use crate::backend::{CaptureBackend, Producers};
use crate::gate::SyncGate;
use crate::interleave::Deinterleaver;
use crate::packet::{AudioStreamParams, Packet, StreamInfo, VideoStreamParams};
use crate::producer::{AudioProducer, VideoProducer};
use crate::reader::StreamReader;

/// Streams the backend will deliver, as negotiated by the host.
#[derive(Debug, Clone, Default)]
pub struct SessionParams {
    pub video: Option<VideoStreamParams>,
    pub audio: Option<AudioStreamParams>,
}

/// One capture stream session: backend on one side, packet pulls on the
/// other.
///
/// `open` validates configuration and formats before any packet exists,
/// wires the producer endpoints into the backend, and starts delivery.
/// `close` tears down in the reverse order: producers stop first, then
/// the queues drain, so nothing enqueues into a dead gate.
pub struct CaptureSession {
    backend: Box<dyn CaptureBackend>,
    reader: StreamReader,
    gate: Arc<SyncGate>,
    metrics: PipelineMetrics,
    info: StreamInfo,
    closed: bool,
}

impl CaptureSession {
    pub fn open(
        mut backend: Box<dyn CaptureBackend>,
        params: SessionParams,
        config: StreamConfig,
    ) -> Result<Self, CaptureError> {
        config.validate()?;
        if params.video.is_none() && params.audio.is_none() {
            return Err(CaptureError::Config(
                "at least one stream must be configured".into(),
            ));
        }
        if let Some(audio) = &params.audio {
            audio.validate()?;
        }
        // Planar sources need the widening transform; reject what it
        // cannot carry before any packet is produced.
        let deinterleaver = match &params.audio {
            Some(audio) if !audio.interleaved => Some(Deinterleaver::new(audio)?),
            _ => None,
        };

        let gate = Arc::new(SyncGate::new(
            config.video_queue_capacity,
            config.audio_queue_capacity,
        ));
        let metrics = PipelineMetrics::default();

        let video_index = params.video.is_some().then_some(0);
        let audio_index = params
            .audio
            .is_some()
            .then(|| if params.video.is_some() { 1 } else { 0 });
        let info = StreamInfo {
            video_index,
            audio_index,
            video: params.video,
            audio: params.audio,
        };

        let producers = Producers {
            video: info.video.as_ref().map(|_| {
                VideoProducer::new(Arc::clone(&gate), metrics.clone(), config.target_fps)
            }),
            audio: info
                .audio
                .as_ref()
                .map(|_| AudioProducer::new(Arc::clone(&gate), metrics.clone())),
        };
        backend.start(producers)?;
        tracing::info!(
            video = info.video_index.is_some(),
            audio = info.audio_index.is_some(),
            target_fps = ?config.target_fps,
            "capture session started"
        );

        let reader = StreamReader::new(
            Arc::clone(&gate),
            metrics.clone(),
            config.audio_priority_ratio,
            info.video_index.is_some(),
            deinterleaver,
            video_index.unwrap_or(0),
            audio_index.unwrap_or(0),
        );

        Ok(Self {
            backend,
            reader,
            gate,
            metrics,
            info,
            closed: false,
        })
    }

    /// Blocking pull. One packet per call; failures abort only the call
    /// they occur in.
    pub fn read_packet(&mut self) -> Result<Packet, ReadError> {
        if self.closed {
            return Err(ReadError::Closed);
        }
        self.reader.read_packet()
    }

    pub fn stream_info(&self) -> &StreamInfo {
        &self.info
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Stops the backend first, then drains and releases every queued
    /// sample. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.backend.stop();
        let (video_dropped, audio_dropped) = self.gate.close();
        tracing::info!(
            video_dropped,
            audio_dropped,
            packets = self.metrics.snapshot().total_packets(),
            "capture session closed"
        );
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.close();
    }
}
