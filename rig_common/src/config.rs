//! Configuration types for the actuator controller.
//!
//! Every field has a serde default matching the shipped firmware tuning, so
//! a partial TOML file is always valid. `validate()` catches the mistakes
//! that would make the control loop unsafe rather than merely mistuned:
//! inverted clamp ranges, inverted position envelopes, zero timeouts.

use serde::{Deserialize, Serialize};

// ─── Safety / Lifecycle ─────────────────────────────────────────────

/// Firmware-update handshake timing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Deadline for the arm command after a request [ms].
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u32,
    /// Deadline for the DFU handoff after arming [ms].
    #[serde(default = "default_arm_timeout_ms")]
    pub arm_timeout_ms: u32,
    /// Settle delay between arming and reporting ready [ms].
    #[serde(default = "default_dfu_delay_ms")]
    pub dfu_delay_ms: u32,
}

fn default_request_timeout_ms() -> u32 {
    1000
}
fn default_arm_timeout_ms() -> u32 {
    1000
}
fn default_dfu_delay_ms() -> u32 {
    50
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 1000,
            arm_timeout_ms: 1000,
            dfu_delay_ms: 50,
        }
    }
}

/// Safety core timing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Maximum heartbeat age before a fault [ms].
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u32,
    /// Torque-decay ramp length after a fault [ms]. 0 disables decay.
    #[serde(default)]
    pub decay_duration_ms: u32,
    /// Firmware-update handshake timing.
    #[serde(default)]
    pub update: UpdateConfig,
}

fn default_heartbeat_timeout_ms() -> u32 {
    100
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout_ms: 100,
            decay_duration_ms: 0,
            update: UpdateConfig::default(),
        }
    }
}

impl SafetyConfig {
    /// Validate timing parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.heartbeat_timeout_ms == 0 {
            return Err("heartbeat_timeout_ms must be nonzero".into());
        }
        if self.update.request_timeout_ms == 0 || self.update.arm_timeout_ms == 0 {
            return Err("update request/arm timeouts must be nonzero".into());
        }
        Ok(())
    }
}

// ─── Control Loop ───────────────────────────────────────────────────

/// Per-axis PID gains and clamps. Both axes share one tuning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PidConfig {
    /// Proportional gain.
    #[serde(default = "default_kp")]
    pub kp: f32,
    /// Integral gain.
    #[serde(default)]
    pub ki: f32,
    /// Derivative gain.
    #[serde(default)]
    pub kd: f32,
    /// Output clamp, lower bound.
    #[serde(default = "default_out_min")]
    pub out_min: f32,
    /// Output clamp, upper bound.
    #[serde(default = "default_out_max")]
    pub out_max: f32,
    /// Integrator clamp, lower bound (anti-windup).
    #[serde(default = "default_integrator_min")]
    pub integrator_min: f32,
    /// Integrator clamp, upper bound (anti-windup).
    #[serde(default = "default_integrator_max")]
    pub integrator_max: f32,
}

fn default_kp() -> f32 {
    8.0
}
fn default_out_min() -> f32 {
    -1.0
}
fn default_out_max() -> f32 {
    1.0
}
fn default_integrator_min() -> f32 {
    -0.5
}
fn default_integrator_max() -> f32 {
    0.5
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 8.0,
            ki: 0.0,
            kd: 0.0,
            out_min: -1.0,
            out_max: 1.0,
            integrator_min: -0.5,
            integrator_max: 0.5,
        }
    }
}

/// Dual-axis control loop configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Shared PID tuning.
    #[serde(default)]
    pub pid: PidConfig,
    /// Symmetric clamp on the final torque command.
    #[serde(default = "default_torque_limit")]
    pub torque_limit: f32,
    /// Position envelope, lower bound [m].
    #[serde(default = "default_pos_min_m")]
    pub pos_min_m: f32,
    /// Position envelope, upper bound [m].
    #[serde(default = "default_pos_max_m")]
    pub pos_max_m: f32,
    /// Target driven during homing until the limit switch trips [m].
    #[serde(default = "default_homing_target_m")]
    pub homing_target_m: f32,
    /// Homing deadline [ms].
    #[serde(default = "default_homing_timeout_ms")]
    pub homing_timeout_ms: u32,
    /// Absolute error deadband [m]. Errors below this are zeroed.
    #[serde(default = "default_setpoint_deadband_m")]
    pub setpoint_deadband_m: f32,
}

fn default_torque_limit() -> f32 {
    1.0
}
fn default_pos_min_m() -> f32 {
    -0.1
}
fn default_pos_max_m() -> f32 {
    0.1
}
fn default_homing_target_m() -> f32 {
    -0.1
}
fn default_homing_timeout_ms() -> u32 {
    5000
}
fn default_setpoint_deadband_m() -> f32 {
    0.001
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            pid: PidConfig::default(),
            torque_limit: 1.0,
            pos_min_m: -0.1,
            pos_max_m: 0.1,
            homing_target_m: -0.1,
            homing_timeout_ms: 5000,
            setpoint_deadband_m: 0.001,
        }
    }
}

impl ControlConfig {
    /// Validate clamp ranges, envelope, and homing parameters.
    pub fn validate(&self) -> Result<(), String> {
        if self.pid.out_min >= self.pid.out_max {
            return Err("pid.out_min must be below pid.out_max".into());
        }
        if self.pid.integrator_min >= self.pid.integrator_max {
            return Err("pid.integrator_min must be below pid.integrator_max".into());
        }
        if self.pos_min_m >= self.pos_max_m {
            return Err("pos_min_m must be below pos_max_m".into());
        }
        if self.torque_limit <= 0.0 {
            return Err("torque_limit must be positive".into());
        }
        if self.homing_timeout_ms == 0 {
            return Err("homing_timeout_ms must be nonzero".into());
        }
        if self.homing_target_m < self.pos_min_m || self.homing_target_m > self.pos_max_m {
            return Err("homing_target_m must lie inside the position envelope".into());
        }
        if self.setpoint_deadband_m < 0.0 {
            return Err("setpoint_deadband_m must not be negative".into());
        }
        Ok(())
    }
}

// ─── Jog / PTT / Status ─────────────────────────────────────────────

/// Manual jog override limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JogConfig {
    /// Duration applied when a jog command carries none [ms].
    #[serde(default = "default_jog_default_duration_ms")]
    pub default_duration_ms: u32,
    /// Hard cap on any jog duration [ms]. 0 disables the cap.
    #[serde(default = "default_jog_max_duration_ms")]
    pub max_duration_ms: u32,
    /// Symmetric clamp on jog torque.
    #[serde(default = "default_jog_torque_limit")]
    pub torque_limit: f32,
}

fn default_jog_default_duration_ms() -> u32 {
    200
}
fn default_jog_max_duration_ms() -> u32 {
    1000
}
fn default_jog_torque_limit() -> f32 {
    0.5
}

impl Default for JogConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: 200,
            max_duration_ms: 1000,
            torque_limit: 0.5,
        }
    }
}

impl JogConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.default_duration_ms == 0 {
            return Err("jog default_duration_ms must be nonzero".into());
        }
        if self.torque_limit <= 0.0 {
            return Err("jog torque_limit must be positive".into());
        }
        Ok(())
    }
}

/// Momentary-button debounce window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PttConfig {
    /// Stability window before an edge is accepted [ms].
    #[serde(default = "default_ptt_debounce_ms")]
    pub debounce_ms: u32,
}

fn default_ptt_debounce_ms() -> u32 {
    20
}

impl Default for PttConfig {
    fn default() -> Self {
        Self { debounce_ms: 20 }
    }
}

/// Status telemetry cadence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Interval between unsolicited status frames [ms].
    #[serde(default = "default_status_period_ms")]
    pub period_ms: u32,
}

fn default_status_period_ms() -> u32 {
    20
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self { period_ms: 20 }
    }
}

// ─── Aggregate ──────────────────────────────────────────────────────

/// Complete controller configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub jog: JogConfig,
    #[serde(default)]
    pub ptt: PttConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

impl ControllerConfig {
    /// Run all section validators.
    pub fn validate(&self) -> Result<(), String> {
        self.safety.validate()?;
        self.control.validate()?;
        self.jog.validate()?;
        if self.status.period_ms == 0 {
            return Err("status period_ms must be nonzero".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(ControllerConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_envelope_rejected() {
        let mut cfg = ControllerConfig::default();
        cfg.control.pos_min_m = 0.1;
        cfg.control.pos_max_m = -0.1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_pid_clamp_rejected() {
        let mut cfg = ControllerConfig::default();
        cfg.control.pid.out_min = 1.0;
        cfg.control.pid.out_max = -1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_heartbeat_timeout_rejected() {
        let mut cfg = ControllerConfig::default();
        cfg.safety.heartbeat_timeout_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn homing_target_outside_envelope_rejected() {
        let mut cfg = ControllerConfig::default();
        cfg.control.homing_target_m = 0.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: ControllerConfig = toml::from_str(
            r#"
            [safety]
            heartbeat_timeout_ms = 250
            decay_duration_ms = 400
            "#,
        )
        .unwrap();
        assert_eq!(cfg.safety.heartbeat_timeout_ms, 250);
        assert_eq!(cfg.safety.decay_duration_ms, 400);
        assert_eq!(cfg.safety.update.dfu_delay_ms, 50);
        assert_eq!(cfg.control.homing_timeout_ms, 5000);
        assert_eq!(cfg.ptt.debounce_ms, 20);
    }
}
