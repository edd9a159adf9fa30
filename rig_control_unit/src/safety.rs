//! Safety/lifecycle arbitration.
//!
//! [`SafetyCore`] owns the lifecycle state machine, the torque-decay ramp,
//! and the embedded firmware-update sub-machine. It is the single authority
//! on whether the actuators may be energized and at what scale.

pub mod core;
pub mod decay;
pub mod update;

pub use self::core::SafetyCore;
