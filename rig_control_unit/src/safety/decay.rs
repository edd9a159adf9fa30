//! Torque-decay ramp.
//!
//! After a fault the commanded torque is bled off linearly instead of cut
//! at once, so the platform settles rather than drops. The ramp runs on the
//! caller's millisecond counter and is purely a function of elapsed time.

use rig_common::time::elapsed;

/// Linear 1.0 → 0.0 torque ramp over a fixed window.
#[derive(Debug, Clone, Copy, Default)]
pub struct TorqueDecay {
    active: bool,
    start_ms: u32,
    duration_ms: u32,
}

impl TorqueDecay {
    /// Create an inactive decay with the configured window length.
    ///
    /// `duration_ms == 0` disables decay entirely.
    pub const fn new(duration_ms: u32) -> Self {
        Self {
            active: false,
            start_ms: 0,
            duration_ms,
        }
    }

    /// Start the ramp at `now_ms`. No-op when decay is disabled.
    pub fn start(&mut self, now_ms: u32) {
        if self.duration_ms == 0 {
            return;
        }
        self.active = true;
        self.start_ms = now_ms;
    }

    /// Cancel the ramp (e.g. on recovery to Active).
    pub fn cancel(&mut self) {
        self.active = false;
    }

    /// Returns true while the ramp is running and not yet expired.
    #[inline]
    pub fn is_active(&self, now_ms: u32) -> bool {
        self.active && elapsed(now_ms, self.start_ms) < self.duration_ms
    }

    /// Current scale: monotonically non-increasing from 1.0, exactly 0.0
    /// at/after the window end or when not active.
    pub fn scale(&self, now_ms: u32) -> f32 {
        if !self.active || self.duration_ms == 0 {
            return 0.0;
        }
        let run = elapsed(now_ms, self.start_ms);
        if run >= self.duration_ms {
            return 0.0;
        }
        1.0 - (run as f32 / self.duration_ms as f32)
    }
}
