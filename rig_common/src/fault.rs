//! Fault taxonomy and telemetry flag bitmasks.
//!
//! Faults are local and recoverable: components latch a [`FaultCode`] and
//! the caller polls accessors. Nothing here panics or propagates errors.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Latched fault cause, carried in status telemetry as a `u16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum FaultCode {
    /// No fault latched.
    None = 0,
    /// USB transport dropped while operating.
    UsbDisconnect = 1,
    /// Emergency-stop input asserted.
    Estop = 2,
    /// Host heartbeat age exceeded the configured timeout.
    HeartbeatTimeout = 3,
    /// A measured axis position left the configured envelope.
    SensorRange = 4,
    /// Homing did not complete within the configured timeout.
    HomingTimeout = 5,
    /// Inbound command frame malformed (size/magic).
    CommandInvalid = 6,
}

impl FaultCode {
    /// Convert from the raw wire value. Returns `None` for unknown codes.
    #[inline]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::UsbDisconnect),
            2 => Some(Self::Estop),
            3 => Some(Self::HeartbeatTimeout),
            4 => Some(Self::SensorRange),
            5 => Some(Self::HomingTimeout),
            6 => Some(Self::CommandInvalid),
            _ => None,
        }
    }

    /// Returns true if a fault is latched.
    #[inline]
    pub const fn is_fault(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl Default for FaultCode {
    fn default() -> Self {
        Self::None
    }
}

bitflags! {
    /// Status-frame flag bitmask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u8 {
        /// USB transport configured and present.
        const USB       = 1 << 0;
        /// E-stop input currently asserted.
        const ESTOP     = 1 << 1;
        /// Actuator power stage enabled this tick.
        const PWM       = 1 << 2;
        /// Torque-decay ramp in progress.
        const DECAY     = 1 << 3;
        /// Homing sequence active.
        const HOMING    = 1 << 4;
        /// Both position sensors inside the configured envelope.
        const SENSOR_OK = 1 << 5;
    }
}

impl Default for StatusFlags {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Profile-manager flag bitmask, carried in status telemetry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ProfileFlags: u8 {
        /// Persisted blob was loaded successfully at boot.
        const STORAGE_LOADED = 1 << 0;
        /// The active car-type entry is valid.
        const ACTIVE_VALID   = 1 << 1;
    }
}

impl Default for ProfileFlags {
    fn default() -> Self {
        Self::empty()
    }
}
