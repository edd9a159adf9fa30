//! Payload codecs for every frame type.
//!
//! Explicit byte-level encode/decode, little-endian throughout. Decoders
//! return `Option` and never panic on short or malformed input; what a
//! rejected payload means (ignore vs. `CommandInvalid`) is the cycle's
//! decision.

use static_assertions::const_assert;

use super::frame::MAX_PAYLOAD;

// ─── Little-endian helpers ──────────────────────────────────────────

#[inline]
fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

#[inline]
fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[inline]
fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(raw)
}

#[inline]
fn read_f32(bytes: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

// ─── Command ────────────────────────────────────────────────────────

/// Encoded size of a setpoint command.
pub const COMMAND_LEN: usize = 16;

/// Axis setpoint command from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandPayload {
    /// Left axis setpoint [m].
    pub left_m: f32,
    /// Right axis setpoint [m].
    pub right_m: f32,
    /// Host-side capture timestamp [ns].
    pub host_timestamp_ns: u64,
}

impl CommandPayload {
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != COMMAND_LEN {
            return None;
        }
        Some(Self {
            left_m: read_f32(bytes, 0),
            right_m: read_f32(bytes, 4),
            host_timestamp_ns: read_u64(bytes, 8),
        })
    }

    pub fn encode(&self) -> [u8; COMMAND_LEN] {
        let mut out = [0u8; COMMAND_LEN];
        out[0..4].copy_from_slice(&self.left_m.to_le_bytes());
        out[4..8].copy_from_slice(&self.right_m.to_le_bytes());
        out[8..16].copy_from_slice(&self.host_timestamp_ns.to_le_bytes());
        out
    }
}

// ─── Jog ────────────────────────────────────────────────────────────

/// Jog payload marker.
pub const JOG_MAGIC: u16 = 0xC0D3;
/// Encoded size of a jog command.
pub const JOG_LEN: usize = 16;

/// Jog override modes. Only torque mode exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JogMode {
    /// Direct torque override.
    Torque = 0,
}

impl JogMode {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Torque),
            _ => None,
        }
    }
}

/// Manual jog command. The magic and mode bytes are carried through and
/// validated by the jog override, mirroring the command's defensive layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JogCommand {
    pub magic: u16,
    pub mode: u8,
    /// Left axis torque fraction.
    pub left_torque: f32,
    /// Right axis torque fraction.
    pub right_torque: f32,
    /// Requested duration [ms]; 0 selects the configured default.
    pub duration_ms: u32,
}

impl JogCommand {
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != JOG_LEN {
            return None;
        }
        Some(Self {
            magic: read_u16(bytes, 0),
            mode: bytes[2],
            left_torque: read_f32(bytes, 4),
            right_torque: read_f32(bytes, 8),
            duration_ms: read_u32(bytes, 12),
        })
    }

    pub fn encode(&self) -> [u8; JOG_LEN] {
        let mut out = [0u8; JOG_LEN];
        out[0..2].copy_from_slice(&self.magic.to_le_bytes());
        out[2] = self.mode;
        out[4..8].copy_from_slice(&self.left_torque.to_le_bytes());
        out[8..12].copy_from_slice(&self.right_torque.to_le_bytes());
        out[12..16].copy_from_slice(&self.duration_ms.to_le_bytes());
        out
    }
}

// ─── Maintenance ────────────────────────────────────────────────────

/// Maintenance payload marker.
pub const MAINTENANCE_MAGIC: u16 = 0xB007;
/// Encoded size without tuning values.
pub const MAINTENANCE_LEN: usize = 8;
/// Encoded size with tuning values (`SetTuning`).
pub const MAINTENANCE_TUNING_LEN: usize = 16;

/// Maintenance operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MaintenanceOp {
    UpdateRequest = 1,
    UpdateArm = 2,
    UpdateAbort = 3,
    SetTuning = 0x10,
    SaveProfile = 0x11,
    SwitchProfile = 0x12,
    LoadProfile = 0x13,
}

impl MaintenanceOp {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::UpdateRequest),
            2 => Some(Self::UpdateArm),
            3 => Some(Self::UpdateAbort),
            0x10 => Some(Self::SetTuning),
            0x11 => Some(Self::SaveProfile),
            0x12 => Some(Self::SwitchProfile),
            0x13 => Some(Self::LoadProfile),
            _ => None,
        }
    }
}

/// Decoded maintenance command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaintenanceCommand {
    pub opcode: MaintenanceOp,
    /// Car-type argument for profile operations.
    pub car_type: u8,
    /// Update-flow token.
    pub token: u32,
    /// `(force_intensity, motion_range)` for `SetTuning`.
    pub tuning: Option<(f32, f32)>,
}

impl MaintenanceCommand {
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < MAINTENANCE_LEN {
            return None;
        }
        if read_u16(bytes, 0) != MAINTENANCE_MAGIC {
            return None;
        }
        let opcode = MaintenanceOp::from_u8(bytes[2])?;
        let car_type = bytes[3];
        let token = read_u32(bytes, 4);

        let tuning = if opcode == MaintenanceOp::SetTuning {
            if bytes.len() < MAINTENANCE_TUNING_LEN {
                return None;
            }
            Some((read_f32(bytes, 8), read_f32(bytes, 12)))
        } else {
            None
        };

        Some(Self {
            opcode,
            car_type,
            token,
            tuning,
        })
    }

    /// Encode the 8-byte form (no tuning values).
    pub fn encode_basic(opcode: MaintenanceOp, arg0: u8, token: u32) -> [u8; MAINTENANCE_LEN] {
        let mut out = [0u8; MAINTENANCE_LEN];
        out[0..2].copy_from_slice(&MAINTENANCE_MAGIC.to_le_bytes());
        out[2] = opcode as u8;
        out[3] = arg0;
        out[4..8].copy_from_slice(&token.to_le_bytes());
        out
    }

    /// Encode the 16-byte `SetTuning` form.
    pub fn encode_tuning(
        car_type: u8,
        token: u32,
        force_intensity: f32,
        motion_range: f32,
    ) -> [u8; MAINTENANCE_TUNING_LEN] {
        let mut out = [0u8; MAINTENANCE_TUNING_LEN];
        out[0..8].copy_from_slice(&Self::encode_basic(MaintenanceOp::SetTuning, car_type, token));
        out[8..12].copy_from_slice(&force_intensity.to_le_bytes());
        out[12..16].copy_from_slice(&motion_range.to_le_bytes());
        out
    }
}

// ─── Diagnostics ────────────────────────────────────────────────────

/// Diagnostic payload marker.
pub const DIAG_MAGIC: u16 = 0xD1A6;
/// Request opcode.
pub const DIAG_OP_REQUEST: u8 = 0x01;
/// Response opcode.
pub const DIAG_OP_RESPONSE: u8 = 0x81;
/// Encoded request size.
pub const DIAG_REQUEST_LEN: usize = 8;
/// Encoded response size.
pub const DIAG_RESPONSE_LEN: usize = 38;

/// Host diagnostic request; the token is echoed in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagRequest {
    pub token: u32,
}

impl DiagRequest {
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < DIAG_REQUEST_LEN {
            return None;
        }
        if read_u16(bytes, 0) != DIAG_MAGIC || bytes[2] != DIAG_OP_REQUEST {
            return None;
        }
        Some(Self {
            token: read_u32(bytes, 4),
        })
    }

    pub fn encode(&self) -> [u8; DIAG_REQUEST_LEN] {
        let mut out = [0u8; DIAG_REQUEST_LEN];
        out[0..2].copy_from_slice(&DIAG_MAGIC.to_le_bytes());
        out[2] = DIAG_OP_REQUEST;
        out[4..8].copy_from_slice(&self.token.to_le_bytes());
        out
    }
}

/// Diagnostic snapshot returned to the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagResponse {
    pub token: u32,
    pub uptime_ms: u32,
    pub left_pos_m: f32,
    pub right_pos_m: f32,
    pub left_adc_raw: u16,
    pub right_adc_raw: u16,
    pub left_limit: bool,
    pub right_limit: bool,
    pub left_cmd: f32,
    pub right_cmd: f32,
    pub torque_scale: f32,
}

impl DiagResponse {
    pub fn encode(&self) -> [u8; DIAG_RESPONSE_LEN] {
        let mut out = [0u8; DIAG_RESPONSE_LEN];
        out[0..2].copy_from_slice(&DIAG_MAGIC.to_le_bytes());
        out[2] = DIAG_OP_RESPONSE;
        out[4..8].copy_from_slice(&self.token.to_le_bytes());
        out[8..12].copy_from_slice(&self.uptime_ms.to_le_bytes());
        out[12..16].copy_from_slice(&self.left_pos_m.to_le_bytes());
        out[16..20].copy_from_slice(&self.right_pos_m.to_le_bytes());
        out[20..22].copy_from_slice(&self.left_adc_raw.to_le_bytes());
        out[22..24].copy_from_slice(&self.right_adc_raw.to_le_bytes());
        out[24] = self.left_limit as u8;
        out[25] = self.right_limit as u8;
        out[26..30].copy_from_slice(&self.left_cmd.to_le_bytes());
        out[30..34].copy_from_slice(&self.right_cmd.to_le_bytes());
        out[34..38].copy_from_slice(&self.torque_scale.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < DIAG_RESPONSE_LEN {
            return None;
        }
        if read_u16(bytes, 0) != DIAG_MAGIC || bytes[2] != DIAG_OP_RESPONSE {
            return None;
        }
        Some(Self {
            token: read_u32(bytes, 4),
            uptime_ms: read_u32(bytes, 8),
            left_pos_m: read_f32(bytes, 12),
            right_pos_m: read_f32(bytes, 16),
            left_adc_raw: read_u16(bytes, 20),
            right_adc_raw: read_u16(bytes, 22),
            left_limit: bytes[24] != 0,
            right_limit: bytes[25] != 0,
            left_cmd: read_f32(bytes, 26),
            right_cmd: read_f32(bytes, 30),
            torque_scale: read_f32(bytes, 34),
        })
    }
}

// ─── Input events ───────────────────────────────────────────────────

/// Input-event payload marker.
pub const INPUT_EVENT_MAGIC: u16 = 0x5054;
/// Encoded input-event size.
pub const INPUT_EVENT_LEN: usize = 12;

/// Debounced input event (PTT down/up).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEventPayload {
    /// Wire value of [`rig_common::state::PttEvent`].
    pub event: u8,
    /// Wire value of [`rig_common::state::PttSource`].
    pub source: u8,
    pub uptime_ms: u32,
    pub pressed: bool,
}

impl InputEventPayload {
    pub fn encode(&self) -> [u8; INPUT_EVENT_LEN] {
        let mut out = [0u8; INPUT_EVENT_LEN];
        out[0..2].copy_from_slice(&INPUT_EVENT_MAGIC.to_le_bytes());
        out[2] = self.event;
        out[3] = self.source;
        out[4..8].copy_from_slice(&self.uptime_ms.to_le_bytes());
        out[8] = self.pressed as u8;
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < INPUT_EVENT_LEN {
            return None;
        }
        if read_u16(bytes, 0) != INPUT_EVENT_MAGIC {
            return None;
        }
        Some(Self {
            event: bytes[2],
            source: bytes[3],
            uptime_ms: read_u32(bytes, 4),
            pressed: bytes[8] != 0,
        })
    }
}

// ─── Status ─────────────────────────────────────────────────────────

/// Encoded status size.
pub const STATUS_LEN: usize = 60;

/// Periodic controller status snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusPayload {
    pub uptime_ms: u32,
    pub last_heartbeat_ms: u32,
    pub last_cmd_rx_ms: u32,
    pub last_cmd_host_ns: u64,
    pub left_setpoint_m: f32,
    pub right_setpoint_m: f32,
    pub left_pos_m: f32,
    pub right_pos_m: f32,
    pub left_cmd: f32,
    pub right_cmd: f32,
    /// Reported state byte.
    pub state: u8,
    /// Status flag bitmask.
    pub flags: u8,
    pub fault_code: u16,
    pub fw_version: u32,
    pub fw_build: u32,
    pub update_state: u8,
    pub update_result: u8,
    pub active_car_type: u8,
    /// Profile flag bitmask.
    pub profile_flags: u8,
}

impl StatusPayload {
    pub fn encode(&self) -> [u8; STATUS_LEN] {
        let mut out = [0u8; STATUS_LEN];
        out[0..4].copy_from_slice(&self.uptime_ms.to_le_bytes());
        out[4..8].copy_from_slice(&self.last_heartbeat_ms.to_le_bytes());
        out[8..12].copy_from_slice(&self.last_cmd_rx_ms.to_le_bytes());
        out[12..20].copy_from_slice(&self.last_cmd_host_ns.to_le_bytes());
        out[20..24].copy_from_slice(&self.left_setpoint_m.to_le_bytes());
        out[24..28].copy_from_slice(&self.right_setpoint_m.to_le_bytes());
        out[28..32].copy_from_slice(&self.left_pos_m.to_le_bytes());
        out[32..36].copy_from_slice(&self.right_pos_m.to_le_bytes());
        out[36..40].copy_from_slice(&self.left_cmd.to_le_bytes());
        out[40..44].copy_from_slice(&self.right_cmd.to_le_bytes());
        out[44] = self.state;
        out[45] = self.flags;
        out[46..48].copy_from_slice(&self.fault_code.to_le_bytes());
        out[48..52].copy_from_slice(&self.fw_version.to_le_bytes());
        out[52..56].copy_from_slice(&self.fw_build.to_le_bytes());
        out[56] = self.update_state;
        out[57] = self.update_result;
        out[58] = self.active_car_type;
        out[59] = self.profile_flags;
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != STATUS_LEN {
            return None;
        }
        Some(Self {
            uptime_ms: read_u32(bytes, 0),
            last_heartbeat_ms: read_u32(bytes, 4),
            last_cmd_rx_ms: read_u32(bytes, 8),
            last_cmd_host_ns: read_u64(bytes, 12),
            left_setpoint_m: read_f32(bytes, 20),
            right_setpoint_m: read_f32(bytes, 24),
            left_pos_m: read_f32(bytes, 28),
            right_pos_m: read_f32(bytes, 32),
            left_cmd: read_f32(bytes, 36),
            right_cmd: read_f32(bytes, 40),
            state: bytes[44],
            flags: bytes[45],
            fault_code: read_u16(bytes, 46),
            fw_version: read_u32(bytes, 48),
            fw_build: read_u32(bytes, 52),
            update_state: bytes[56],
            update_result: bytes[57],
            active_car_type: bytes[58],
            profile_flags: bytes[59],
        })
    }
}

// Payload budget checks against the frame format.
const_assert!(COMMAND_LEN <= MAX_PAYLOAD);
const_assert!(JOG_LEN <= MAX_PAYLOAD);
const_assert!(MAINTENANCE_TUNING_LEN <= MAX_PAYLOAD);
const_assert!(DIAG_RESPONSE_LEN <= MAX_PAYLOAD);
const_assert!(INPUT_EVENT_LEN <= MAX_PAYLOAD);
const_assert!(STATUS_LEN <= MAX_PAYLOAD);
