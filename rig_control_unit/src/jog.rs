//! Timed manual torque override.
//!
//! A jog command preempts the closed-loop output for a bounded window.
//! Zero requested torque on both axes is an explicit stop. The override
//! never outlives its expiry and is force-stopped by the cycle whenever
//! actuation is disallowed.

use rig_common::config::JogConfig;
use rig_common::time::deadline_reached;
use tracing::debug;

use crate::protocol::messages::{JOG_MAGIC, JogCommand, JogMode};

/// Manual override state.
#[derive(Debug, Clone, Copy, Default)]
pub struct JogOverride {
    active: bool,
    left_torque: f32,
    right_torque: f32,
    expires_at_ms: u32,
}

impl JogOverride {
    pub const fn new() -> Self {
        Self {
            active: false,
            left_torque: 0.0,
            right_torque: 0.0,
            expires_at_ms: 0,
        }
    }

    /// Start (or explicitly stop) a jog from a decoded command.
    ///
    /// Rejects wrong magic or unknown mode. A zero-torque command stops any
    /// running jog and reports success. Torques are clamped to the
    /// configured limit; the duration falls back to the default when the
    /// command carries none and is capped at the configured maximum.
    pub fn start(&mut self, cmd: &JogCommand, now_ms: u32, cfg: &JogConfig) -> bool {
        if cmd.magic != JOG_MAGIC {
            return false;
        }
        if JogMode::from_u8(cmd.mode) != Some(JogMode::Torque) {
            return false;
        }
        if cmd.left_torque == 0.0 && cmd.right_torque == 0.0 {
            self.stop();
            return true;
        }

        let mut duration = cmd.duration_ms;
        if duration == 0 {
            duration = cfg.default_duration_ms;
        }
        if cfg.max_duration_ms > 0 && duration > cfg.max_duration_ms {
            duration = cfg.max_duration_ms;
        }

        self.active = true;
        self.left_torque = cmd.left_torque.clamp(-cfg.torque_limit, cfg.torque_limit);
        self.right_torque = cmd.right_torque.clamp(-cfg.torque_limit, cfg.torque_limit);
        self.expires_at_ms = now_ms.wrapping_add(duration);
        debug!(
            left = self.left_torque,
            right = self.right_torque,
            duration, "jog started"
        );
        true
    }

    /// Stop the override immediately.
    pub fn stop(&mut self) {
        self.active = false;
        self.left_torque = 0.0;
        self.right_torque = 0.0;
        self.expires_at_ms = 0;
    }

    /// Expire-check for this tick; returns whether the jog is still active.
    pub fn update(&mut self, now_ms: u32) -> bool {
        if !self.active {
            return false;
        }
        if deadline_reached(now_ms, self.expires_at_ms) {
            self.stop();
            return false;
        }
        true
    }

    #[inline]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub const fn left_torque(&self) -> f32 {
        self.left_torque
    }

    #[inline]
    pub const fn right_torque(&self) -> f32 {
        self.right_torque
    }
}
