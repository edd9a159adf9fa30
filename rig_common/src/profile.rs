//! Per-car-type tuning parameters.
//!
//! Both parameters are dimensionless scale factors with hard documented
//! ranges; anything outside is clamped, never rejected.

use serde::{Deserialize, Serialize};

/// Maximum number of car-type entries in the profile table.
pub const MAX_CAR_TYPES: usize = 8;

/// Car type selected when storage is empty or the stored selection is bad.
pub const DEFAULT_CAR_TYPE: u8 = 0;

/// Lower bound for `force_intensity`.
pub const FORCE_INTENSITY_MIN: f32 = 0.10;
/// Upper bound for `force_intensity`.
pub const FORCE_INTENSITY_MAX: f32 = 1.00;
/// Lower bound for `motion_range`.
pub const MOTION_RANGE_MIN: f32 = 0.20;
/// Upper bound for `motion_range`.
pub const MOTION_RANGE_MAX: f32 = 1.00;

/// Tuning parameters for one car type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileParams {
    /// Torque command scale factor.
    pub force_intensity: f32,
    /// Position envelope scale factor.
    pub motion_range: f32,
}

impl ProfileParams {
    /// Return a copy with both fields clamped to their documented ranges.
    #[inline]
    pub fn clamped(self) -> Self {
        Self {
            force_intensity: self
                .force_intensity
                .clamp(FORCE_INTENSITY_MIN, FORCE_INTENSITY_MAX),
            motion_range: self.motion_range.clamp(MOTION_RANGE_MIN, MOTION_RANGE_MAX),
        }
    }
}

impl Default for ProfileParams {
    fn default() -> Self {
        Self {
            force_intensity: 1.0,
            motion_range: 1.0,
        }
    }
}
