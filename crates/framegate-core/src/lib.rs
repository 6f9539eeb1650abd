pub mod backend;
pub mod gate;
pub mod interleave;
pub mod pacer;
pub mod packet;
pub mod producer;
pub mod queue;
pub mod reader;
pub mod sample;
pub mod session;

// Public API
pub use backend::{CaptureBackend, Producers};
pub use gate::{GateSlot, SyncGate};
pub use interleave::Deinterleaver;
pub use pacer::{FrameRatePacer, PacerDecision};
pub use packet::{AudioStreamParams, Packet, PacketFlags, StreamInfo, VideoStreamParams};
pub use producer::{AudioProducer, VideoProducer};
pub use queue::{BoundedFrameQueue, QueueEntry};
pub use reader::StreamReader;
pub use sample::{
    AudioHandle, AudioSample, MediaKind, MemoryAudioSample, MemoryVideoSample, OwnedPlane,
    PlaneRef, VideoHandle, VideoSample,
};
pub use session::{CaptureSession, SessionParams};
