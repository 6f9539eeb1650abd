use framegate_foundation::CaptureError;

use crate::producer::{AudioProducer, VideoProducer};

/// Callback endpoints handed to the backend at start. A lane the session
/// did not configure is `None` and must not be delivered to.
pub struct Producers {
    pub video: Option<VideoProducer>,
    pub audio: Option<AudioProducer>,
}

/// The opaque capture subsystem.
///
/// Implementations own their delivery threads; producer callbacks arrive
/// on them with uncontrolled timing. Device selection and format
/// negotiation happen behind this seam.
pub trait CaptureBackend: Send {
    /// Takes ownership of the producer endpoints and begins delivery.
    fn start(&mut self, producers: Producers) -> Result<(), CaptureError>;

    /// Halts delivery and joins the backend's threads before returning.
    /// Must be idempotent.
    fn stop(&mut self);
}
