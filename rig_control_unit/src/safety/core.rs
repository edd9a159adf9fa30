//! Safety/lifecycle core.
//!
//! Consumes USB-present, e-stop, heartbeat, and update events and decides
//! whether the actuators may be energized and at what torque scale. The
//! lifecycle enum and the update sub-machine are stored separately; the
//! externally visible state is computed in [`SafetyCore::reported_state`].
//!
//! Ordering contract: within one tick, apply input events (`on_usb`,
//! `on_estop`, `on_heartbeat`, inbound maintenance frames) before calling
//! [`SafetyCore::tick`], so the energize decision reflects this tick's
//! inputs.

use rig_common::config::SafetyConfig;
use rig_common::fault::FaultCode;
use rig_common::state::{LifecycleState, ReportedState, UpdateResult, UpdateState};
use rig_common::time::elapsed;
use tracing::{info, warn};

use super::decay::TorqueDecay;
use super::update::UpdateMachine;

/// Single-instance safety context, owned by the host loop and mutated only
/// through its own operations.
#[derive(Debug, Clone)]
pub struct SafetyCore {
    cfg: SafetyConfig,
    lifecycle: LifecycleState,
    usb_connected: bool,
    estop_active: bool,
    heartbeat_seen: bool,
    last_heartbeat_ms: u32,
    last_fault_ms: u32,
    fault_code: FaultCode,
    decay: TorqueDecay,
    update: UpdateMachine,
}

impl SafetyCore {
    pub fn new(cfg: SafetyConfig) -> Self {
        Self {
            cfg,
            lifecycle: LifecycleState::Init,
            usb_connected: false,
            estop_active: false,
            heartbeat_seen: false,
            last_heartbeat_ms: 0,
            last_fault_ms: 0,
            fault_code: FaultCode::None,
            decay: TorqueDecay::new(cfg.decay_duration_ms),
            update: UpdateMachine::new(cfg.update),
        }
    }

    // ── Input events ────────────────────────────────────────────────

    /// Apply the USB-present sample for this tick.
    pub fn on_usb(&mut self, connected: bool, now_ms: u32) {
        self.usb_connected = connected;
        if !connected {
            self.enter_fault(FaultCode::UsbDisconnect, now_ms);
        } else if self.lifecycle == LifecycleState::Init && !self.estop_active {
            self.lifecycle = LifecycleState::Idle;
        }
    }

    /// Apply the e-stop sample for this tick.
    pub fn on_estop(&mut self, active: bool, now_ms: u32) {
        self.estop_active = active;
        if active {
            self.enter_fault(FaultCode::Estop, now_ms);
        } else if self.lifecycle == LifecycleState::Init && self.usb_connected {
            self.lifecycle = LifecycleState::Idle;
        }
    }

    /// Record a host heartbeat frame.
    pub fn on_heartbeat(&mut self, now_ms: u32) {
        self.heartbeat_seen = true;
        self.last_heartbeat_ms = now_ms;
        if self.lifecycle == LifecycleState::Idle && self.usb_connected && !self.estop_active {
            self.enter_active();
        }
    }

    /// Latch a fault explicitly (host-driven or derived elsewhere).
    pub fn set_fault(&mut self, code: FaultCode, now_ms: u32) {
        self.enter_fault(code, now_ms);
    }

    // ── Per-tick evaluation ─────────────────────────────────────────

    /// Evaluate lifecycle transitions for this tick. Input events must have
    /// been applied already.
    pub fn tick(&mut self, now_ms: u32) {
        self.update
            .tick(now_ms, self.usb_connected, self.estop_active);

        if self.estop_active || !self.usb_connected {
            if self.lifecycle != LifecycleState::Fault {
                let code = if self.estop_active {
                    FaultCode::Estop
                } else {
                    FaultCode::UsbDisconnect
                };
                self.enter_fault(code, now_ms);
            }
            return;
        }

        match self.lifecycle {
            LifecycleState::Active => {
                if !self.heartbeat_fresh(now_ms) {
                    self.enter_fault(FaultCode::HeartbeatTimeout, now_ms);
                }
            }
            LifecycleState::Fault => {
                // Recovery needs a heartbeat newer than the fault instant;
                // otherwise fall back to Idle and wait for one.
                if self.heartbeat_fresh(now_ms) && self.heartbeat_after_fault() {
                    self.enter_active();
                } else {
                    self.lifecycle = LifecycleState::Idle;
                }
            }
            LifecycleState::Init => {
                self.lifecycle = LifecycleState::Idle;
            }
            LifecycleState::Idle => {}
        }
    }

    // ── Update flow ─────────────────────────────────────────────────

    /// Begin the firmware-update handshake.
    pub fn request_update(&mut self, token: u32, now_ms: u32) {
        self.update
            .request(token, now_ms, self.usb_connected, self.estop_active);
    }

    /// Arm a requested update; see [`UpdateMachine::arm`].
    pub fn arm_update(&mut self, token: u32, now_ms: u32) -> bool {
        self.update.arm(token, now_ms)
    }

    /// Abort the update flow with the given reason.
    pub fn abort_update(&mut self, reason: UpdateResult) {
        self.update.abort(reason);
    }

    /// True once the DFU handoff may be triggered by the host.
    pub fn update_ready(&self, now_ms: u32) -> bool {
        self.update.ready(now_ms)
    }

    // ── Decisions ───────────────────────────────────────────────────

    /// Whether the actuators may be energized this tick.
    pub fn should_energize(&self, now_ms: u32) -> bool {
        if !self.update.is_idle() {
            return false;
        }
        if !self.usb_connected || self.estop_active {
            return false;
        }
        if self.lifecycle == LifecycleState::Active && self.heartbeat_fresh(now_ms) {
            return true;
        }
        self.decay.is_active(now_ms)
    }

    /// Torque scale for this tick: 1.0 in normal operation, the decay ramp
    /// value while bleeding off after a fault, 0.0 otherwise.
    pub fn torque_scale(&self, now_ms: u32) -> f32 {
        if !self.update.is_idle() {
            return 0.0;
        }
        if self.decay.is_active(now_ms) {
            return self.decay.scale(now_ms);
        }
        if self.lifecycle == LifecycleState::Active
            && self.usb_connected
            && !self.estop_active
            && self.heartbeat_fresh(now_ms)
        {
            return 1.0;
        }
        0.0
    }

    /// Whether PTT events may be emitted: mirrors the fault/e-stop/update
    /// gating of the energize decision.
    pub fn allow_ptt(&self) -> bool {
        self.lifecycle == LifecycleState::Active && !self.estop_active && self.update.is_idle()
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// Stored lifecycle state (never `Maintenance`).
    #[inline]
    pub const fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    /// Externally visible state with `Maintenance` synthesized.
    #[inline]
    pub fn reported_state(&self) -> ReportedState {
        ReportedState::from_parts(self.lifecycle, self.update.state())
    }

    #[inline]
    pub const fn fault_code(&self) -> FaultCode {
        self.fault_code
    }

    #[inline]
    pub fn update_state(&self) -> UpdateState {
        self.update.state()
    }

    #[inline]
    pub fn update_result(&self) -> UpdateResult {
        self.update.result()
    }

    #[inline]
    pub const fn last_heartbeat_ms(&self) -> u32 {
        self.last_heartbeat_ms
    }

    #[inline]
    pub const fn usb_connected(&self) -> bool {
        self.usb_connected
    }

    #[inline]
    pub const fn estop_active(&self) -> bool {
        self.estop_active
    }

    /// True while the torque-decay ramp is running.
    #[inline]
    pub fn decay_active(&self, now_ms: u32) -> bool {
        self.decay.is_active(now_ms)
    }

    // ── Internals ───────────────────────────────────────────────────

    fn heartbeat_fresh(&self, now_ms: u32) -> bool {
        self.heartbeat_seen
            && elapsed(now_ms, self.last_heartbeat_ms) <= self.cfg.heartbeat_timeout_ms
    }

    fn heartbeat_after_fault(&self) -> bool {
        let age = self.last_heartbeat_ms.wrapping_sub(self.last_fault_ms);
        age > 0 && age < u32::MAX / 2
    }

    fn enter_fault(&mut self, code: FaultCode, now_ms: u32) {
        if self.lifecycle == LifecycleState::Active {
            self.decay.start(now_ms);
        }
        if self.lifecycle != LifecycleState::Fault {
            warn!(?code, "entering fault");
        }
        self.lifecycle = LifecycleState::Fault;
        self.fault_code = code;
        self.last_fault_ms = now_ms;
    }

    fn enter_active(&mut self) {
        info!("entering active");
        self.lifecycle = LifecycleState::Active;
        self.fault_code = FaultCode::None;
        self.decay.cancel();
    }
}
