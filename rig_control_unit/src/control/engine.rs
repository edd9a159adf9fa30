//! Dual-axis control loop: homing, position safety, deadband, torque scaling.
//!
//! Runs both axes through a shared PID tuning each tick. A latched fault
//! (sensor range, homing timeout) forces both commands to zero until the
//! host clears it; homing state survives a sensor-range fault so a
//! transient glitch does not force a re-home.

use rig_common::config::ControlConfig;
use rig_common::fault::FaultCode;
use rig_common::time::elapsed;
use tracing::warn;

use super::pid::{PidState, pid_step};

/// One linear axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlAxis {
    pid: PidState,
    setpoint_m: f32,
    command: f32,
    homed: bool,
}

impl ControlAxis {
    /// Last computed torque command (dimensionless fraction).
    #[inline]
    pub const fn command(&self) -> f32 {
        self.command
    }

    /// Current setpoint [m].
    #[inline]
    pub const fn setpoint_m(&self) -> f32 {
        self.setpoint_m
    }

    /// Whether this axis has been referenced against its limit switch.
    #[inline]
    pub const fn homed(&self) -> bool {
        self.homed
    }
}

/// Measurements fed into one control tick.
#[derive(Debug, Clone, Copy)]
pub struct AxisFeedback {
    /// Measured position, left axis [m].
    pub left_pos_m: f32,
    /// Measured position, right axis [m].
    pub right_pos_m: f32,
    /// Left limit switch engaged.
    pub left_limit: bool,
    /// Right limit switch engaged.
    pub right_limit: bool,
}

/// Dual-axis closed-loop position controller.
#[derive(Debug, Clone)]
pub struct ControlLoop {
    cfg: ControlConfig,
    left: ControlAxis,
    right: ControlAxis,
    homing_active: bool,
    homing_start_ms: u32,
    last_update_ms: Option<u32>,
    fault_code: FaultCode,
    left_pos_m: f32,
    right_pos_m: f32,
}

impl ControlLoop {
    pub fn new(cfg: ControlConfig) -> Self {
        Self {
            cfg,
            left: ControlAxis::default(),
            right: ControlAxis::default(),
            homing_active: false,
            homing_start_ms: 0,
            last_update_ms: None,
            fault_code: FaultCode::None,
            left_pos_m: 0.0,
            right_pos_m: 0.0,
        }
    }

    /// Set both setpoints [m]. Clamping to the envelope happens at tick.
    pub fn set_setpoints(&mut self, left_m: f32, right_m: f32) {
        self.left.setpoint_m = left_m;
        self.right.setpoint_m = right_m;
    }

    /// Begin the homing sequence: both axes drive toward the homing target
    /// until their limit switches trip.
    pub fn start_homing(&mut self, now_ms: u32) {
        self.homing_active = true;
        self.homing_start_ms = now_ms;
        self.left.homed = false;
        self.right.homed = false;
        self.left.pid.reset();
        self.right.pid.reset();
    }

    /// Clear a latched fault so closed-loop output can resume.
    pub fn clear_fault(&mut self) {
        self.fault_code = FaultCode::None;
    }

    /// Run one control tick.
    ///
    /// `torque_scale` comes from the safety core; 0 forces zero output and
    /// resets both integrators.
    pub fn tick(&mut self, feedback: AxisFeedback, now_ms: u32, torque_scale: f32) {
        self.left_pos_m = feedback.left_pos_m;
        self.right_pos_m = feedback.right_pos_m;

        if !self.position_in_envelope(feedback.left_pos_m)
            || !self.position_in_envelope(feedback.right_pos_m)
        {
            if self.fault_code != FaultCode::SensorRange {
                warn!(
                    left = feedback.left_pos_m,
                    right = feedback.right_pos_m,
                    "position outside envelope"
                );
            }
            self.fault_code = FaultCode::SensorRange;
        }

        if self.fault_code.is_fault() {
            self.left.command = 0.0;
            self.right.command = 0.0;
            return;
        }

        if self.homing_active {
            self.run_homing(&feedback, now_ms);
        }

        let dt_s = self.step_dt_s(now_ms);

        let left_sp = self
            .left
            .setpoint_m
            .clamp(self.cfg.pos_min_m, self.cfg.pos_max_m);
        let right_sp = self
            .right
            .setpoint_m
            .clamp(self.cfg.pos_min_m, self.cfg.pos_max_m);

        let left_err = apply_deadband(left_sp - feedback.left_pos_m, self.cfg.setpoint_deadband_m);
        let right_err =
            apply_deadband(right_sp - feedback.right_pos_m, self.cfg.setpoint_deadband_m);

        let left_cmd = pid_step(&self.cfg.pid, &mut self.left.pid, left_err, dt_s)
            .clamp(-self.cfg.torque_limit, self.cfg.torque_limit);
        let right_cmd = pid_step(&self.cfg.pid, &mut self.right.pid, right_err, dt_s)
            .clamp(-self.cfg.torque_limit, self.cfg.torque_limit);

        if torque_scale <= 0.0 {
            self.left.command = 0.0;
            self.right.command = 0.0;
            self.left.pid.reset();
            self.right.pid.reset();
            return;
        }

        self.left.command = left_cmd * torque_scale;
        self.right.command = right_cmd * torque_scale;
    }

    // ── Accessors ───────────────────────────────────────────────────

    #[inline]
    pub const fn fault_code(&self) -> FaultCode {
        self.fault_code
    }

    /// True once both axes are referenced.
    #[inline]
    pub const fn is_homed(&self) -> bool {
        self.left.homed && self.right.homed
    }

    #[inline]
    pub const fn homing_active(&self) -> bool {
        self.homing_active
    }

    #[inline]
    pub const fn left(&self) -> &ControlAxis {
        &self.left
    }

    #[inline]
    pub const fn right(&self) -> &ControlAxis {
        &self.right
    }

    /// Last measured positions [m].
    #[inline]
    pub const fn measured(&self) -> (f32, f32) {
        (self.left_pos_m, self.right_pos_m)
    }

    // ── Internals ───────────────────────────────────────────────────

    fn position_in_envelope(&self, pos_m: f32) -> bool {
        pos_m >= self.cfg.pos_min_m && pos_m <= self.cfg.pos_max_m
    }

    fn run_homing(&mut self, feedback: &AxisFeedback, now_ms: u32) {
        if feedback.left_limit && !self.left.homed {
            self.left.homed = true;
            self.left.setpoint_m = feedback.left_pos_m;
            self.left.pid.reset();
        }
        if feedback.right_limit && !self.right.homed {
            self.right.homed = true;
            self.right.setpoint_m = feedback.right_pos_m;
            self.right.pid.reset();
        }

        if !self.left.homed {
            self.left.setpoint_m = self.cfg.homing_target_m;
        }
        if !self.right.homed {
            self.right.setpoint_m = self.cfg.homing_target_m;
        }

        if elapsed(now_ms, self.homing_start_ms) >= self.cfg.homing_timeout_ms {
            warn!("homing timed out");
            self.fault_code = FaultCode::HomingTimeout;
            self.homing_active = false;
        }

        if self.left.homed && self.right.homed {
            self.homing_active = false;
        }
    }

    fn step_dt_s(&mut self, now_ms: u32) -> f32 {
        let dt_ms = match self.last_update_ms {
            None => 1,
            Some(last) => elapsed(now_ms, last).max(1),
        };
        self.last_update_ms = Some(now_ms);
        dt_ms as f32 / 1000.0
    }
}

/// Zero sub-threshold error before it reaches the PID.
#[inline]
fn apply_deadband(error: f32, deadband: f32) -> f32 {
    if error > -deadband && error < deadband {
        0.0
    } else {
        error
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rig_common::config::PidConfig;

    fn cfg() -> ControlConfig {
        ControlConfig {
            pid: PidConfig {
                kp: 15.0,
                ki: 0.0,
                kd: 0.0,
                out_min: -1.0,
                out_max: 1.0,
                integrator_min: -1.0,
                integrator_max: 1.0,
            },
            torque_limit: 1.0,
            pos_min_m: -0.1,
            pos_max_m: 0.1,
            homing_target_m: -0.1,
            homing_timeout_ms: 1000,
            setpoint_deadband_m: 0.0,
        }
    }

    fn feedback(left: f32, right: f32) -> AxisFeedback {
        AxisFeedback {
            left_pos_m: left,
            right_pos_m: right,
            left_limit: false,
            right_limit: false,
        }
    }

    #[test]
    fn commands_clamped_to_torque_limit() {
        let mut cl = ControlLoop::new(cfg());
        cl.set_setpoints(0.1, 0.1);
        cl.tick(feedback(0.0, 0.0), 1, 1.0);
        assert!((cl.left().command() - 1.0).abs() < 1e-3);
        assert!((cl.right().command() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn setpoints_beyond_envelope_are_clamped() {
        let mut cl = ControlLoop::new(cfg());
        cl.set_setpoints(5.0, -5.0);
        cl.tick(feedback(0.0, 0.0), 1, 1.0);
        // Clamped setpoints are ±0.1 → error ±0.1 → kp*err = ±1.5 → clamp ±1.0.
        assert!(cl.left().command() <= 1.0);
        assert!(cl.right().command() >= -1.0);
    }

    #[test]
    fn homing_completes_when_both_limits_trip() {
        let mut cl = ControlLoop::new(cfg());
        cl.start_homing(0);
        assert!(cl.homing_active());
        cl.tick(
            AxisFeedback {
                left_pos_m: -0.09,
                right_pos_m: -0.09,
                left_limit: true,
                right_limit: true,
            },
            10,
            1.0,
        );
        assert!(cl.is_homed());
        assert!(!cl.homing_active());
        // Setpoints frozen at the measured positions.
        assert_eq!(cl.left().setpoint_m(), -0.09);
        assert_eq!(cl.right().setpoint_m(), -0.09);
    }

    #[test]
    fn homing_drives_unhomed_axes_to_target() {
        let mut cl = ControlLoop::new(cfg());
        cl.start_homing(0);
        cl.tick(
            AxisFeedback {
                left_pos_m: 0.0,
                right_pos_m: -0.09,
                left_limit: false,
                right_limit: true,
            },
            10,
            1.0,
        );
        assert!(!cl.is_homed());
        assert!(cl.homing_active());
        assert!(cl.right().homed());
        assert_eq!(cl.left().setpoint_m(), -0.1);
        // Left axis commanded downward toward the target.
        assert!(cl.left().command() < 0.0);
    }

    #[test]
    fn homing_timeout_faults_and_cancels() {
        let mut cl = ControlLoop::new(cfg());
        cl.start_homing(0);
        cl.tick(feedback(0.0, 0.0), 500, 1.0);
        assert!(cl.homing_active());
        cl.tick(feedback(0.0, 0.0), 1001, 1.0);
        assert_eq!(cl.fault_code(), FaultCode::HomingTimeout);
        assert!(!cl.homing_active());
        assert!(!cl.is_homed());
    }

    #[test]
    fn sensor_range_fault_zeroes_commands() {
        let mut cl = ControlLoop::new(cfg());
        cl.set_setpoints(0.0, 0.0);
        cl.tick(feedback(0.2, 0.0), 5, 1.0);
        assert_eq!(cl.fault_code(), FaultCode::SensorRange);
        assert_eq!(cl.left().command(), 0.0);
        assert_eq!(cl.right().command(), 0.0);
        // Latched: in-range feedback alone does not resume output.
        cl.tick(feedback(0.0, 0.0), 10, 1.0);
        assert_eq!(cl.left().command(), 0.0);
        // Explicit clear does.
        cl.clear_fault();
        cl.set_setpoints(0.05, 0.0);
        cl.tick(feedback(0.0, 0.0), 15, 1.0);
        assert!(cl.left().command() > 0.0);
    }

    #[test]
    fn sensor_range_fault_preserves_homing_state() {
        let mut cl = ControlLoop::new(cfg());
        cl.start_homing(0);
        cl.tick(
            AxisFeedback {
                left_pos_m: -0.09,
                right_pos_m: -0.09,
                left_limit: true,
                right_limit: true,
            },
            5,
            1.0,
        );
        assert!(cl.is_homed());
        cl.tick(feedback(0.2, 0.0), 10, 1.0);
        assert_eq!(cl.fault_code(), FaultCode::SensorRange);
        assert!(cl.is_homed());
    }

    #[test]
    fn zero_torque_scale_zeroes_output_and_resets_integrators() {
        let mut cl = ControlLoop::new(ControlConfig {
            pid: PidConfig {
                kp: 1.0,
                ki: 10.0,
                ..cfg().pid
            },
            ..cfg()
        });
        cl.set_setpoints(0.1, 0.1);
        cl.tick(feedback(0.0, 0.0), 1, 1.0);
        assert!(cl.left().pid.integrator().abs() > 0.0);
        cl.tick(feedback(0.0, 0.0), 2, 0.0);
        assert_eq!(cl.left().command(), 0.0);
        assert_eq!(cl.right().command(), 0.0);
        assert_eq!(cl.left().pid.integrator(), 0.0);
        assert_eq!(cl.right().pid.integrator(), 0.0);
    }

    #[test]
    fn deadband_suppresses_micro_dither() {
        let mut cl = ControlLoop::new(ControlConfig {
            setpoint_deadband_m: 0.002,
            ..cfg()
        });
        cl.set_setpoints(0.001, -0.001);
        cl.tick(feedback(0.0, 0.0), 1, 1.0);
        assert_eq!(cl.left().command(), 0.0);
        assert_eq!(cl.right().command(), 0.0);
    }

    #[test]
    fn torque_scale_halves_output() {
        let mut cl = ControlLoop::new(cfg());
        cl.set_setpoints(0.1, 0.1);
        cl.tick(feedback(0.0, 0.0), 1, 0.5);
        assert!((cl.left().command() - 0.5).abs() < 1e-3);
    }
}
