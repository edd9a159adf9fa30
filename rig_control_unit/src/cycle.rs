//! Per-tick controller pipeline.
//!
//! [`Controller`] wires the safety core, control loop, jog override, PTT
//! debouncer, and profile manager into one deterministic tick: apply input
//! signals, drain and dispatch inbound frames, evaluate safety, then
//! compute axis commands and emit telemetry. Input events are applied to
//! the safety core before `tick` so the energize decision reflects this
//! tick's inputs.
//!
//! Transport and storage stay external: received bytes arrive through the
//! ring buffer, outbound frames leave through an injected [`FrameSink`].

use rig_common::config::ControllerConfig;
use rig_common::fault::{FaultCode, StatusFlags};
use rig_common::state::{PttEvent, PttSource, ReportedState, UpdateResult};
use rig_common::time::elapsed;
use rig_common::version::{FW_BUILD_ID, FW_VERSION};
use tracing::debug;

use crate::control::ControlLoop;
use crate::control::engine::AxisFeedback;
use crate::jog::JogOverride;
use crate::profile::{ProfileManager, ProfileStorage};
use crate::protocol::frame::{Frame, FrameType, build_frame};
use crate::protocol::messages::{
    CommandPayload, DiagRequest, DiagResponse, InputEventPayload, JogCommand, MaintenanceCommand,
    MaintenanceOp, StatusPayload,
};
use crate::protocol::parser::try_parse;
use crate::protocol::ring::RingBuffer;
use crate::ptt::PttDebouncer;
use crate::safety::SafetyCore;

/// Outbound frame transport. A failed write drops the frame; it is never
/// fatal to the cycle.
pub trait FrameSink {
    fn write(&mut self, frame: &[u8]) -> bool;
}

/// Collecting sink for tests and host-side simulation.
#[derive(Debug, Default)]
pub struct BufferSink {
    pub frames: Vec<Vec<u8>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for BufferSink {
    fn write(&mut self, frame: &[u8]) -> bool {
        self.frames.push(frame.to_vec());
        true
    }
}

/// Signals sampled by the host layer for one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickInputs {
    /// Monotonic millisecond counter.
    pub now_ms: u32,
    /// USB transport configured and present.
    pub usb_connected: bool,
    /// E-stop input asserted.
    pub estop_active: bool,
    /// Measured position, left axis [m].
    pub left_pos_m: f32,
    /// Measured position, right axis [m].
    pub right_pos_m: f32,
    /// Left limit switch engaged.
    pub left_limit: bool,
    /// Right limit switch engaged.
    pub right_limit: bool,
    /// Raw PTT level.
    pub ptt_pressed: bool,
    /// Raw left position ADC count (diagnostics only).
    pub left_adc_raw: u16,
    /// Raw right position ADC count (diagnostics only).
    pub right_adc_raw: u16,
}

/// Decisions produced by one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickOutputs {
    /// Whether the power stage may be enabled.
    pub energize: bool,
    /// Torque scale applied to the commands.
    pub torque_scale: f32,
    /// Final left torque command.
    pub left_command: f32,
    /// Final right torque command.
    pub right_command: f32,
    /// Externally visible controller state.
    pub state: ReportedState,
    /// True once the DFU handoff may be triggered.
    pub update_ready: bool,
}

/// The complete decision core, one instance per device.
#[derive(Debug)]
pub struct Controller<S: ProfileStorage> {
    cfg: ControllerConfig,
    safety: SafetyCore,
    control: ControlLoop,
    jog: JogOverride,
    ptt: PttDebouncer,
    profiles: ProfileManager<S>,
    tx_seq: u32,
    last_status_ms: u32,
    last_cmd_rx_ms: u32,
    last_cmd_host_ns: u64,
    command_invalid: bool,
    pending_diag: Option<u32>,
    left_command: f32,
    right_command: f32,
}

impl<S: ProfileStorage> Controller<S> {
    pub fn new(cfg: ControllerConfig, storage: S) -> Self {
        Self {
            cfg,
            safety: SafetyCore::new(cfg.safety),
            control: ControlLoop::new(cfg.control),
            jog: JogOverride::new(),
            ptt: PttDebouncer::new(cfg.ptt.debounce_ms, false),
            profiles: ProfileManager::new(storage),
            tx_seq: 0,
            last_status_ms: 0,
            last_cmd_rx_ms: 0,
            last_cmd_host_ns: 0,
            command_invalid: false,
            pending_diag: None,
            left_command: 0.0,
            right_command: 0.0,
        }
    }

    /// Run one full tick.
    pub fn tick<const N: usize>(
        &mut self,
        inputs: &TickInputs,
        rx: &mut RingBuffer<N>,
        sink: &mut dyn FrameSink,
    ) -> TickOutputs {
        let now = inputs.now_ms;

        // Input events before safety evaluation.
        self.safety.on_usb(inputs.usb_connected, now);
        self.safety.on_estop(inputs.estop_active, now);
        while let Some(frame) = try_parse(rx) {
            self.dispatch_frame(&frame, now);
        }

        self.safety.tick(now);

        let energize = self.safety.should_energize(now);
        let torque_scale = if energize {
            self.safety.torque_scale(now)
        } else {
            0.0
        };

        // Jog must never survive a no-actuation tick or a latched fault.
        if !energize || self.safety.reported_state() == ReportedState::Fault {
            self.jog.stop();
        } else {
            self.jog.update(now);
        }

        self.run_ptt(inputs, now, sink);

        self.control.tick(
            AxisFeedback {
                left_pos_m: inputs.left_pos_m,
                right_pos_m: inputs.right_pos_m,
                left_limit: inputs.left_limit,
                right_limit: inputs.right_limit,
            },
            now,
            torque_scale,
        );

        if self.jog.is_active() {
            self.left_command = self.jog.left_torque() * torque_scale;
            self.right_command = self.jog.right_torque() * torque_scale;
        } else {
            let force = self.profiles.active_params().force_intensity;
            self.left_command = self.control.left().command() * force;
            self.right_command = self.control.right().command() * force;
        }

        let outputs = TickOutputs {
            energize,
            torque_scale,
            left_command: self.left_command,
            right_command: self.right_command,
            state: self.safety.reported_state(),
            update_ready: self.safety.update_ready(now),
        };

        if let Some(token) = self.pending_diag.take() {
            self.send_diag_response(token, inputs, torque_scale, sink);
        }

        if inputs.usb_connected && elapsed(now, self.last_status_ms) >= self.cfg.status.period_ms {
            self.last_status_ms = now;
            self.send_status(inputs, &outputs, sink);
        }

        outputs
    }

    /// Begin homing both axes.
    pub fn start_homing(&mut self, now_ms: u32) {
        self.control.start_homing(now_ms);
    }

    /// Clear a latched control fault.
    pub fn clear_control_fault(&mut self) {
        self.control.clear_fault();
        self.command_invalid = false;
    }

    /// Latch a safety fault explicitly (host-driven).
    pub fn set_fault(&mut self, code: FaultCode, now_ms: u32) {
        self.safety.set_fault(code, now_ms);
    }

    // ── Accessors ───────────────────────────────────────────────────

    #[inline]
    pub fn safety(&self) -> &SafetyCore {
        &self.safety
    }

    #[inline]
    pub fn control(&self) -> &ControlLoop {
        &self.control
    }

    #[inline]
    pub fn profiles(&self) -> &ProfileManager<S> {
        &self.profiles
    }

    /// Fault code reported in telemetry: safety faults first, then control
    /// faults, then a latched invalid-command marker.
    pub fn fault_code(&self) -> FaultCode {
        if self.safety.fault_code().is_fault() {
            self.safety.fault_code()
        } else if self.control.fault_code().is_fault() {
            self.control.fault_code()
        } else if self.command_invalid {
            FaultCode::CommandInvalid
        } else {
            FaultCode::None
        }
    }

    // ── Frame dispatch ──────────────────────────────────────────────

    fn dispatch_frame(&mut self, frame: &Frame, now_ms: u32) {
        match frame.frame_type() {
            Some(FrameType::Heartbeat) => self.safety.on_heartbeat(now_ms),
            Some(FrameType::Command) => match CommandPayload::decode(&frame.payload) {
                Some(cmd) => {
                    let range = self.profiles.active_params().motion_range;
                    self.control
                        .set_setpoints(cmd.left_m * range, cmd.right_m * range);
                    self.last_cmd_rx_ms = now_ms;
                    self.last_cmd_host_ns = cmd.host_timestamp_ns;
                    self.command_invalid = false;
                }
                None => {
                    debug!(len = frame.payload.len(), "malformed command payload");
                    self.command_invalid = true;
                }
            },
            Some(FrameType::Jog) => match JogCommand::decode(&frame.payload) {
                Some(cmd) => {
                    if !self.jog.start(&cmd, now_ms, &self.cfg.jog) {
                        self.command_invalid = true;
                    }
                }
                None => {
                    self.command_invalid = true;
                }
            },
            Some(FrameType::Maintenance) => {
                if let Some(cmd) = MaintenanceCommand::decode(&frame.payload) {
                    self.dispatch_maintenance(&cmd, now_ms);
                }
            }
            Some(FrameType::Diagnostic) => {
                if let Some(req) = DiagRequest::decode(&frame.payload) {
                    self.pending_diag = Some(req.token);
                }
            }
            // Outbound-only types looping back, or unknown type bytes.
            Some(FrameType::Status) | Some(FrameType::InputEvent) | None => {}
        }
    }

    fn dispatch_maintenance(&mut self, cmd: &MaintenanceCommand, now_ms: u32) {
        match cmd.opcode {
            MaintenanceOp::UpdateRequest => self.safety.request_update(cmd.token, now_ms),
            MaintenanceOp::UpdateArm => {
                let _ = self.safety.arm_update(cmd.token, now_ms);
            }
            MaintenanceOp::UpdateAbort => self.safety.abort_update(UpdateResult::AbortHost),
            MaintenanceOp::SetTuning => {
                if let Some((force_intensity, motion_range)) = cmd.tuning {
                    let _ = self
                        .profiles
                        .set_tuning(cmd.car_type, force_intensity, motion_range);
                }
            }
            MaintenanceOp::SaveProfile => {
                let _ = self.profiles.save(cmd.car_type);
            }
            MaintenanceOp::SwitchProfile => {
                let _ = self.profiles.switch_active(cmd.car_type);
            }
            MaintenanceOp::LoadProfile => {
                let _ = self.profiles.load();
            }
        }
    }

    // ── PTT ─────────────────────────────────────────────────────────

    fn run_ptt(&mut self, inputs: &TickInputs, now_ms: u32, sink: &mut dyn FrameSink) {
        if !self.safety.allow_ptt() {
            self.ptt.resync(inputs.ptt_pressed, now_ms);
            return;
        }
        let event = self.ptt.update(inputs.ptt_pressed, now_ms);
        if event == PttEvent::None {
            return;
        }
        let payload = InputEventPayload {
            event: event as u8,
            source: PttSource::SteeringWheel as u8,
            uptime_ms: now_ms,
            pressed: self.ptt.is_pressed(),
        }
        .encode();
        self.send_frame(FrameType::InputEvent, &payload, sink);
    }

    // ── Telemetry ───────────────────────────────────────────────────

    fn send_status(&mut self, inputs: &TickInputs, outputs: &TickOutputs, sink: &mut dyn FrameSink) {
        let sensor_ok = self.position_ok(inputs.left_pos_m) && self.position_ok(inputs.right_pos_m);

        let mut flags = StatusFlags::empty();
        if self.safety.usb_connected() {
            flags |= StatusFlags::USB;
        }
        if self.safety.estop_active() {
            flags |= StatusFlags::ESTOP;
        }
        if outputs.energize {
            flags |= StatusFlags::PWM;
        }
        if self.safety.decay_active(inputs.now_ms) {
            flags |= StatusFlags::DECAY;
        }
        if self.control.homing_active() {
            flags |= StatusFlags::HOMING;
        }
        if sensor_ok {
            flags |= StatusFlags::SENSOR_OK;
        }

        let payload = StatusPayload {
            uptime_ms: inputs.now_ms,
            last_heartbeat_ms: self.safety.last_heartbeat_ms(),
            last_cmd_rx_ms: self.last_cmd_rx_ms,
            last_cmd_host_ns: self.last_cmd_host_ns,
            left_setpoint_m: self.control.left().setpoint_m(),
            right_setpoint_m: self.control.right().setpoint_m(),
            left_pos_m: inputs.left_pos_m,
            right_pos_m: inputs.right_pos_m,
            left_cmd: outputs.left_command,
            right_cmd: outputs.right_command,
            state: outputs.state as u8,
            flags: flags.bits(),
            fault_code: self.fault_code() as u16,
            fw_version: FW_VERSION,
            fw_build: FW_BUILD_ID,
            update_state: self.safety.update_state() as u8,
            update_result: self.safety.update_result() as u8,
            active_car_type: self.profiles.active_car_type(),
            profile_flags: self.profiles.flags().bits(),
        }
        .encode();
        self.send_frame(FrameType::Status, &payload, sink);
    }

    fn send_diag_response(
        &mut self,
        token: u32,
        inputs: &TickInputs,
        torque_scale: f32,
        sink: &mut dyn FrameSink,
    ) {
        let payload = DiagResponse {
            token,
            uptime_ms: inputs.now_ms,
            left_pos_m: inputs.left_pos_m,
            right_pos_m: inputs.right_pos_m,
            left_adc_raw: inputs.left_adc_raw,
            right_adc_raw: inputs.right_adc_raw,
            left_limit: inputs.left_limit,
            right_limit: inputs.right_limit,
            left_cmd: self.left_command,
            right_cmd: self.right_command,
            torque_scale,
        }
        .encode();
        self.send_frame(FrameType::Diagnostic, &payload, sink);
    }

    fn send_frame(&mut self, frame_type: FrameType, payload: &[u8], sink: &mut dyn FrameSink) {
        if let Some(bytes) = build_frame(frame_type, self.tx_seq, payload) {
            self.tx_seq = self.tx_seq.wrapping_add(1);
            if !sink.write(&bytes) {
                debug!(?frame_type, "frame sink write failed");
            }
        }
    }

    fn position_ok(&self, pos_m: f32) -> bool {
        pos_m >= self.cfg.control.pos_min_m && pos_m <= self.cfg.control.pos_max_m
    }
}
