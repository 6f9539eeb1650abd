//! Media timestamps as delivered by capture backends.
//!
//! Devices report time as a counter value against an arbitrary timescale.
//! Everything downstream of the producers works in a fixed microsecond
//! time base, so the producer boundary is the only place a rescale happens.

/// Microseconds per second; also the width of one pacing bucket.
pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// A device timestamp paired with the timescale it was measured against.
///
/// A non-positive timescale marks unusable timing info (the backend could
/// not attach a clock reading to the sample); such samples are discarded
/// at the producer boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaTime {
    pub value: i64,
    pub timescale: i32,
}

impl MediaTime {
    /// Sentinel for samples that arrived without usable timing.
    pub const INVALID: MediaTime = MediaTime {
        value: 0,
        timescale: 0,
    };

    pub fn new(value: i64, timescale: i32) -> Self {
        Self { value, timescale }
    }

    /// A timestamp already expressed in microseconds.
    pub fn from_micros(micros: i64) -> Self {
        Self {
            value: micros,
            timescale: MICROS_PER_SECOND as i32,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.timescale > 0
    }

    /// Rescale to microseconds, or `None` when the timing info is unusable.
    /// The intermediate product is widened to i128 so nanosecond-scale
    /// device clocks cannot overflow.
    pub fn to_micros(self) -> Option<i64> {
        if !self.is_valid() {
            return None;
        }
        let micros = (self.value as i128 * MICROS_PER_SECOND as i128) / self.timescale as i128;
        Some(micros as i64)
    }
}
