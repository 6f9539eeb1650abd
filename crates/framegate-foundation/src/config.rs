use serde::{Deserialize, Serialize};

use crate::error::CaptureError;
use crate::time::MICROS_PER_SECOND;

/// Frame rate as a rational, so NTSC-style rates like 30000/1001 survive
/// the trip through configuration without rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32,
}

impl Fps {
    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// An integer rate such as plain 30 fps.
    pub fn whole(fps: u32) -> Self {
        Self { num: fps, den: 1 }
    }

    /// Microseconds between frames at this rate (truncated).
    pub fn period_micros(&self) -> i64 {
        MICROS_PER_SECOND * self.den as i64 / self.num as i64
    }

    /// Frames expected inside one one-second pacing bucket, rounded to the
    /// nearest integer.
    pub fn frames_per_bucket(&self) -> i64 {
        (self.num as i64 + self.den as i64 / 2) / self.den as i64
    }
}

impl std::fmt::Display for Fps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Tunables for one capture session.
///
/// The audio queue runs deeper than the video queue because audio blocks
/// arrive far more often than frames; the priority ratio keeps consumption
/// proportional to those depths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// When set, the frame-rate pacer drops or duplicates frames to hold
    /// this rate. `None` passes frames through untouched.
    pub target_fps: Option<Fps>,
    pub video_queue_capacity: usize,
    pub audio_queue_capacity: usize,
    /// Dequeue audio ahead of video whenever
    /// `audio_len > video_len * ratio`.
    pub audio_priority_ratio: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            target_fps: None,
            video_queue_capacity: 20,
            audio_queue_capacity: 140,
            audio_priority_ratio: 7,
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.video_queue_capacity == 0 {
            return Err(CaptureError::Config(
                "video_queue_capacity must be at least 1".into(),
            ));
        }
        if self.audio_queue_capacity == 0 {
            return Err(CaptureError::Config(
                "audio_queue_capacity must be at least 1".into(),
            ));
        }
        if self.audio_priority_ratio == 0 {
            return Err(CaptureError::Config(
                "audio_priority_ratio must be at least 1".into(),
            ));
        }
        if let Some(fps) = self.target_fps {
            if fps.num == 0 || fps.den == 0 {
                return Err(CaptureError::Config(format!(
                    "target_fps {}/{} is not a valid rate",
                    fps.num, fps.den
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_queue_geometry() {
        let cfg = StreamConfig::default();
        assert_eq!(cfg.video_queue_capacity, 20);
        assert_eq!(cfg.audio_queue_capacity, 140);
        assert_eq!(cfg.audio_priority_ratio, 7);
        assert!(cfg.target_fps.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn fps_period_and_bucket() {
        assert_eq!(Fps::whole(25).period_micros(), 40_000);
        assert_eq!(Fps::whole(25).frames_per_bucket(), 25);
        let ntsc = Fps::new(30_000, 1_001);
        assert_eq!(ntsc.period_micros(), 33_366);
        assert_eq!(ntsc.frames_per_bucket(), 30);
        assert_eq!(ntsc.to_string(), "30000/1001");
        assert_eq!(Fps::whole(60).to_string(), "60");
    }

    #[test]
    fn zero_geometry_is_rejected() {
        let mut cfg = StreamConfig::default();
        cfg.video_queue_capacity = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = StreamConfig::default();
        cfg.audio_priority_ratio = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = StreamConfig::default();
        cfg.target_fps = Some(Fps::new(30, 0));
        assert!(cfg.validate().is_err());
    }
}
