//! State machine enums for the actuator controller.
//!
//! All enums use `#[repr(u8)]` for compact layout and direct use in wire
//! telemetry. The lifecycle and update sub-machine are modelled as two
//! separate enums; the externally visible [`ReportedState`] is computed from
//! both, never stored, so the two can't drift apart.

use serde::{Deserialize, Serialize};

// ─── Lifecycle ──────────────────────────────────────────────────────

/// Safety/lifecycle state of the controller.
///
/// `Fault` exits only through the explicit recovery path: e-stop clear,
/// USB present, and a heartbeat newer than the fault timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LifecycleState {
    /// Initial state after boot, before USB enumeration.
    Init = 0,
    /// USB present, e-stop clear, no fresh heartbeat yet.
    Idle = 1,
    /// Heartbeat fresh — closed-loop actuation permitted.
    Active = 2,
    /// Latched fault — actuation blocked (modulo torque decay).
    Fault = 3,
}

impl LifecycleState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Init),
            1 => Some(Self::Idle),
            2 => Some(Self::Active),
            3 => Some(Self::Fault),
            _ => None,
        }
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::Init
    }
}

/// Externally reported state — the lifecycle state, with `Maintenance`
/// synthesized whenever the firmware-update sub-machine is not idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReportedState {
    /// Initial state after boot.
    Init = 0,
    /// Ready, waiting for a heartbeat.
    Idle = 1,
    /// Closed-loop actuation permitted.
    Active = 2,
    /// Latched fault.
    Fault = 3,
    /// Firmware-update flow in progress — actuation suppressed.
    Maintenance = 4,
}

impl ReportedState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Init),
            1 => Some(Self::Idle),
            2 => Some(Self::Active),
            3 => Some(Self::Fault),
            4 => Some(Self::Maintenance),
            _ => None,
        }
    }

    /// Compute the reported state from the two sub-machines.
    #[inline]
    pub const fn from_parts(lifecycle: LifecycleState, update: UpdateState) -> Self {
        if !matches!(update, UpdateState::Idle) {
            return Self::Maintenance;
        }
        match lifecycle {
            LifecycleState::Init => Self::Init,
            LifecycleState::Idle => Self::Idle,
            LifecycleState::Active => Self::Active,
            LifecycleState::Fault => Self::Fault,
        }
    }
}

impl Default for ReportedState {
    fn default() -> Self {
        Self::Init
    }
}

// ─── Firmware-Update Sub-Machine ────────────────────────────────────

/// Firmware-update handshake state.
///
/// Any state other than `Idle` suppresses actuation and PTT events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum UpdateState {
    /// No update in flight.
    Idle = 0,
    /// Host requested an update; waiting for the arm command.
    Requested = 1,
    /// Armed with a matching token; DFU handoff after the post-arm delay.
    Armed = 2,
}

impl UpdateState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Requested),
            2 => Some(Self::Armed),
            _ => None,
        }
    }
}

impl Default for UpdateState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Outcome of the most recent firmware-update flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum UpdateResult {
    /// No completed flow yet.
    None = 0,
    /// Request or arm deadline expired.
    AbortTimeout = 1,
    /// E-stop asserted mid-flow.
    AbortEstop = 2,
    /// USB dropped mid-flow.
    AbortUsb = 3,
    /// Arm token did not match the request token.
    AbortBadToken = 4,
    /// Host sent an explicit abort.
    AbortHost = 5,
}

impl UpdateResult {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::AbortTimeout),
            2 => Some(Self::AbortEstop),
            3 => Some(Self::AbortUsb),
            4 => Some(Self::AbortBadToken),
            5 => Some(Self::AbortHost),
            _ => None,
        }
    }
}

impl Default for UpdateResult {
    fn default() -> Self {
        Self::None
    }
}

// ─── Momentary-Button Events ────────────────────────────────────────

/// Debounced PTT edge event. Wire values match the input-event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PttEvent {
    /// No edge this update.
    None = 0,
    /// Button transitioned to pressed.
    Down = 1,
    /// Button transitioned to released.
    Up = 2,
}

impl PttEvent {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Down),
            2 => Some(Self::Up),
            _ => None,
        }
    }
}

/// Source of a PTT input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PttSource {
    /// Momentary button on the steering wheel.
    SteeringWheel = 1,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_state_roundtrip() {
        for v in 0..=3u8 {
            let state = LifecycleState::from_u8(v).unwrap();
            assert_eq!(state as u8, v);
        }
        assert!(LifecycleState::from_u8(4).is_none());
        assert!(LifecycleState::from_u8(255).is_none());
    }

    #[test]
    fn reported_state_roundtrip() {
        for v in 0..=4u8 {
            let state = ReportedState::from_u8(v).unwrap();
            assert_eq!(state as u8, v);
        }
        assert!(ReportedState::from_u8(5).is_none());
    }

    #[test]
    fn reported_state_synthesizes_maintenance() {
        assert_eq!(
            ReportedState::from_parts(LifecycleState::Idle, UpdateState::Requested),
            ReportedState::Maintenance
        );
        assert_eq!(
            ReportedState::from_parts(LifecycleState::Active, UpdateState::Armed),
            ReportedState::Maintenance
        );
        assert_eq!(
            ReportedState::from_parts(LifecycleState::Active, UpdateState::Idle),
            ReportedState::Active
        );
        assert_eq!(
            ReportedState::from_parts(LifecycleState::Fault, UpdateState::Idle),
            ReportedState::Fault
        );
    }

    #[test]
    fn update_state_roundtrip() {
        for v in 0..=2u8 {
            let state = UpdateState::from_u8(v).unwrap();
            assert_eq!(state as u8, v);
        }
        assert!(UpdateState::from_u8(3).is_none());
    }

    #[test]
    fn update_result_roundtrip() {
        for v in 0..=5u8 {
            let result = UpdateResult::from_u8(v).unwrap();
            assert_eq!(result as u8, v);
        }
        assert!(UpdateResult::from_u8(6).is_none());
    }

    #[test]
    fn ptt_event_roundtrip() {
        for v in 0..=2u8 {
            let event = PttEvent::from_u8(v).unwrap();
            assert_eq!(event as u8, v);
        }
        assert!(PttEvent::from_u8(3).is_none());
    }
}
