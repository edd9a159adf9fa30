//! Firmware-update handshake sub-machine.
//!
//! Two-phase token handshake: the host *requests* an update with a token,
//! then *arms* it by repeating the same token before the request deadline.
//! Once armed, the DFU handoff is reported ready after a settle delay so
//! in-flight traffic can drain. Every exit path back to `Idle` records a
//! distinct [`UpdateResult`] for telemetry.
//!
//! While this machine is anywhere but `Idle`, the safety core suppresses
//! actuation and PTT events.

use rig_common::config::UpdateConfig;
use rig_common::state::{UpdateResult, UpdateState};
use rig_common::time::{deadline_reached, elapsed};
use tracing::{debug, warn};

/// Token-gated request/arm machine with per-phase deadlines.
#[derive(Debug, Clone, Copy)]
pub struct UpdateMachine {
    cfg: UpdateConfig,
    state: UpdateState,
    result: UpdateResult,
    token: u32,
    /// Deadline of the current phase (request or arm).
    deadline_ms: u32,
    /// Instant the machine entered `Armed`.
    armed_at_ms: u32,
}

impl UpdateMachine {
    pub const fn new(cfg: UpdateConfig) -> Self {
        Self {
            cfg,
            state: UpdateState::Idle,
            result: UpdateResult::None,
            token: 0,
            deadline_ms: 0,
            armed_at_ms: 0,
        }
    }

    /// Current sub-machine state.
    #[inline]
    pub const fn state(&self) -> UpdateState {
        self.state
    }

    /// Outcome of the most recent flow.
    #[inline]
    pub const fn result(&self) -> UpdateResult {
        self.result
    }

    /// Returns true when no update flow is in flight.
    #[inline]
    pub const fn is_idle(&self) -> bool {
        matches!(self.state, UpdateState::Idle)
    }

    /// Begin an update flow.
    ///
    /// Rejected without leaving `Idle` when USB is absent or e-stop is
    /// asserted; the rejection reason is recorded as the flow result.
    pub fn request(&mut self, token: u32, now_ms: u32, usb_connected: bool, estop_active: bool) {
        if estop_active {
            self.result = UpdateResult::AbortEstop;
            return;
        }
        if !usb_connected {
            self.result = UpdateResult::AbortUsb;
            return;
        }
        self.state = UpdateState::Requested;
        self.result = UpdateResult::None;
        self.token = token;
        self.deadline_ms = now_ms.wrapping_add(self.cfg.request_timeout_ms);
        debug!(token, "update requested");
    }

    /// Arm a previously requested update.
    ///
    /// Succeeds only from `Requested`, within the request deadline, with a
    /// matching token; any violation aborts the flow.
    pub fn arm(&mut self, token: u32, now_ms: u32) -> bool {
        if self.state != UpdateState::Requested {
            return false;
        }
        if deadline_reached(now_ms, self.deadline_ms) {
            self.abort(UpdateResult::AbortTimeout);
            return false;
        }
        if token != self.token {
            self.abort(UpdateResult::AbortBadToken);
            return false;
        }
        self.state = UpdateState::Armed;
        self.armed_at_ms = now_ms;
        self.deadline_ms = now_ms.wrapping_add(self.cfg.arm_timeout_ms);
        debug!(token, "update armed");
        true
    }

    /// Abort the flow and record the reason. Always available, including
    /// mid-arm; a no-op when already idle.
    pub fn abort(&mut self, reason: UpdateResult) {
        if self.is_idle() {
            return;
        }
        warn!(?reason, state = ?self.state, "update aborted");
        self.state = UpdateState::Idle;
        self.result = reason;
        self.token = 0;
    }

    /// Per-tick supervision: abort on e-stop, USB loss, or phase deadline,
    /// in that priority order.
    pub fn tick(&mut self, now_ms: u32, usb_connected: bool, estop_active: bool) {
        if self.is_idle() {
            return;
        }
        if estop_active {
            self.abort(UpdateResult::AbortEstop);
        } else if !usb_connected {
            self.abort(UpdateResult::AbortUsb);
        } else if deadline_reached(now_ms, self.deadline_ms) {
            self.abort(UpdateResult::AbortTimeout);
        }
    }

    /// True once the machine is armed and the post-arm settle delay has
    /// elapsed — the host's cue to trigger the device-reset handoff.
    pub fn ready(&self, now_ms: u32) -> bool {
        self.state == UpdateState::Armed && elapsed(now_ms, self.armed_at_ms) >= self.cfg.dfu_delay_ms
    }
}
