use framegate_foundation::{Fps, MICROS_PER_SECOND};

/// What to do with one incoming video sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacerDecision {
    /// Enqueue once at its own timestamp.
    Accept,
    /// Enqueue a copy at `t - 1`, then the sample itself at `t`.
    Duplicate,
    /// Enqueue nothing.
    Suppress,
}

/// Nudges an unevenly delivering camera toward the target rate.
///
/// Arrivals are counted per one-second bucket of normalized time. When a
/// bucket closes over target, the sample that closed it is suppressed;
/// under target, that sample is duplicated. One correction per bucket
/// boundary, so drift is worked off a single frame at a time rather than
/// in bursts.
#[derive(Debug)]
pub struct FrameRatePacer {
    /// Frames expected per bucket, rounded for fractional rates.
    target: i64,
    /// Microseconds per frame at the target rate.
    period: i64,
    epoch: Option<i64>,
    bucket_index: i64,
    bucket_count: i64,
}

impl FrameRatePacer {
    pub fn new(fps: Fps) -> Self {
        Self {
            target: fps.frames_per_bucket(),
            period: fps.period_micros(),
            epoch: None,
            bucket_index: 0,
            bucket_count: 0,
        }
    }

    /// Decides for a sample whose normalized timestamp is `t` microseconds.
    pub fn on_sample(&mut self, t: i64) -> PacerDecision {
        let epoch = match self.epoch {
            Some(e) => e,
            None => {
                self.epoch = Some(t);
                self.bucket_index = 0;
                self.bucket_count = 0;
                t
            }
        };

        // Half-period rounding keeps frames that straddle a boundary by a
        // jitter margin in their nominal bucket.
        let bucket = (t - epoch + self.period / 2) / MICROS_PER_SECOND;
        if bucket == self.bucket_index {
            self.bucket_count += 1;
            return PacerDecision::Accept;
        }

        let closed_count = self.bucket_count;
        self.bucket_index = bucket;
        self.bucket_count = 1;

        if closed_count > self.target {
            PacerDecision::Suppress
        } else if closed_count < self.target {
            PacerDecision::Duplicate
        } else {
            PacerDecision::Accept
        }
    }
}
