//! PID step function with output and integrator clamps.
//!
//! The integrator is clamped every step (anti-windup); the derivative seeds
//! its previous-error term on the first step so a cold start never produces
//! a derivative kick.

use rig_common::config::PidConfig;

/// Internal per-axis PID state. Reset on homing, torque cutoff, and axis
/// re-reference.
#[derive(Debug, Clone, Copy)]
pub struct PidState {
    /// Integral accumulator.
    integrator: f32,
    /// Previous error (for derivative).
    prev_error: f32,
    /// Whether `prev_error` has been seeded.
    initialized: bool,
}

impl Default for PidState {
    fn default() -> Self {
        Self {
            integrator: 0.0,
            prev_error: 0.0,
            initialized: false,
        }
    }
}

impl PidState {
    /// Reset all internal state to zero.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Current integrator value (exposed for tests and telemetry).
    #[inline]
    pub const fn integrator(&self) -> f32 {
        self.integrator
    }
}

/// Compute one PID step.
///
/// `error` is the (deadband-filtered) position error [m]; `dt_s` is the
/// tick period [s], floored to 1 ms when non-positive. Returns the command
/// clamped to `[out_min, out_max]`.
pub fn pid_step(cfg: &PidConfig, state: &mut PidState, error: f32, dt_s: f32) -> f32 {
    let dt_s = if dt_s <= 0.0 { 1e-3 } else { dt_s };

    if !state.initialized {
        state.prev_error = error;
        state.initialized = true;
    }

    state.integrator += error * dt_s;
    state.integrator = state.integrator.clamp(cfg.integrator_min, cfg.integrator_max);

    let derivative = (error - state.prev_error) / dt_s;
    state.prev_error = error;

    let output = cfg.kp * error + cfg.ki * state.integrator + cfg.kd * derivative;
    output.clamp(cfg.out_min, cfg.out_max)
}

// ─── Tests ──────────────────────────────────────────────────────────
