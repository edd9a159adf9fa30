//! Integration tests for the controller cycle.
//!
//! Exercise the full per-tick pipeline through wire frames: activation,
//! setpoint commands, jog override, PTT gating, diagnostics, the
//! firmware-update flow, and profile maintenance.

use rig_common::config::ControllerConfig;
use rig_common::fault::{FaultCode, StatusFlags};
use rig_common::state::{ReportedState, UpdateResult, UpdateState};

use rig_control_unit::cycle::{BufferSink, Controller, TickInputs};
use rig_control_unit::profile::storage::InMemoryStorage;
use rig_control_unit::protocol::frame::{FrameHeader, FrameType, HEADER_LEN, build_frame};
use rig_control_unit::protocol::messages::{
    CommandPayload, DiagRequest, DiagResponse, InputEventPayload, JOG_MAGIC, JogCommand, JogMode,
    MaintenanceCommand, MaintenanceOp, StatusPayload,
};
use rig_control_unit::protocol::ring::RxBuffer;

// ── Helpers ─────────────────────────────────────────────────────────

fn test_config() -> ControllerConfig {
    let mut cfg = ControllerConfig::default();
    cfg.safety.heartbeat_timeout_ms = 100;
    cfg.safety.update.request_timeout_ms = 200;
    cfg.safety.update.arm_timeout_ms = 200;
    cfg.safety.update.dfu_delay_ms = 50;
    cfg.jog.torque_limit = 1.0;
    cfg
}

fn controller() -> Controller<InMemoryStorage> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Controller::new(test_config(), InMemoryStorage::new())
}

fn inputs(now_ms: u32) -> TickInputs {
    TickInputs {
        now_ms,
        usb_connected: true,
        estop_active: false,
        left_pos_m: 0.0,
        right_pos_m: 0.0,
        left_limit: false,
        right_limit: false,
        ptt_pressed: false,
        left_adc_raw: 0,
        right_adc_raw: 0,
    }
}

fn push(rb: &mut RxBuffer, frame_type: FrameType, seq: u32, payload: &[u8]) {
    let bytes = build_frame(frame_type, seq, payload).unwrap();
    assert_eq!(rb.write(&bytes), bytes.len());
}

fn push_heartbeat(rb: &mut RxBuffer, seq: u32) {
    push(rb, FrameType::Heartbeat, seq, &[]);
}

fn push_command(rb: &mut RxBuffer, seq: u32, left_m: f32, right_m: f32) {
    let payload = CommandPayload {
        left_m,
        right_m,
        host_timestamp_ns: 42,
    }
    .encode();
    push(rb, FrameType::Command, seq, &payload);
}

/// Frames of one type, decoded from the sink.
fn frames_of(sink: &BufferSink, frame_type: FrameType) -> Vec<Vec<u8>> {
    sink.frames
        .iter()
        .filter(|bytes| {
            let header = FrameHeader::decode(bytes[..HEADER_LEN].try_into().unwrap());
            header.frame_type == frame_type as u8
        })
        .map(|bytes| bytes[HEADER_LEN..bytes.len() - 2].to_vec())
        .collect()
}

/// Drive the controller to Active.
fn activate(ctrl: &mut Controller<InMemoryStorage>, rb: &mut RxBuffer, sink: &mut BufferSink) {
    push_heartbeat(rb, 0);
    let out = ctrl.tick(&inputs(1), rb, sink);
    assert_eq!(out.state, ReportedState::Active);
    assert!(out.energize);
}

// ── Activation & commands ───────────────────────────────────────────

#[test]
fn heartbeat_activates_and_energizes() {
    let mut ctrl = controller();
    let mut rb = RxBuffer::new();
    let mut sink = BufferSink::new();

    let out = ctrl.tick(&inputs(0), &mut rb, &mut sink);
    assert_eq!(out.state, ReportedState::Idle);
    assert!(!out.energize);

    activate(&mut ctrl, &mut rb, &mut sink);
    let out = ctrl.tick(&inputs(2), &mut rb, &mut sink);
    assert!(out.energize);
    assert_eq!(out.torque_scale, 1.0);
}

#[test]
fn command_frame_drives_axes() {
    let mut ctrl = controller();
    let mut rb = RxBuffer::new();
    let mut sink = BufferSink::new();
    activate(&mut ctrl, &mut rb, &mut sink);

    push_command(&mut rb, 1, 0.05, -0.05);
    let out = ctrl.tick(&inputs(2), &mut rb, &mut sink);
    assert!(out.left_command > 0.0);
    assert!(out.right_command < 0.0);
    assert_eq!(ctrl.control().left().setpoint_m(), 0.05);
}

#[test]
fn malformed_command_latches_invalid_but_does_not_stop() {
    let mut ctrl = controller();
    let mut rb = RxBuffer::new();
    let mut sink = BufferSink::new();
    activate(&mut ctrl, &mut rb, &mut sink);

    push(&mut rb, FrameType::Command, 1, &[0u8; 10]);
    let out = ctrl.tick(&inputs(2), &mut rb, &mut sink);
    assert_eq!(ctrl.fault_code(), FaultCode::CommandInvalid);
    assert!(out.energize, "invalid command must not stop the loop");

    // A valid command clears the marker.
    push_command(&mut rb, 2, 0.01, 0.01);
    ctrl.tick(&inputs(3), &mut rb, &mut sink);
    assert_eq!(ctrl.fault_code(), FaultCode::None);
}

#[test]
fn heartbeat_loss_faults_then_recovers() {
    let mut ctrl = controller();
    let mut rb = RxBuffer::new();
    let mut sink = BufferSink::new();
    activate(&mut ctrl, &mut rb, &mut sink);

    let out = ctrl.tick(&inputs(200), &mut rb, &mut sink);
    assert_eq!(out.state, ReportedState::Fault);
    assert_eq!(ctrl.fault_code(), FaultCode::HeartbeatTimeout);
    assert!(!out.energize);

    // Next tick falls back to Idle, and a fresh heartbeat re-activates.
    ctrl.tick(&inputs(210), &mut rb, &mut sink);
    push_heartbeat(&mut rb, 1);
    let out = ctrl.tick(&inputs(220), &mut rb, &mut sink);
    assert_eq!(out.state, ReportedState::Active);
    assert_eq!(ctrl.fault_code(), FaultCode::None);
}

// ── Jog override ────────────────────────────────────────────────────

#[test]
fn jog_replaces_closed_loop_output_until_expiry() {
    let mut ctrl = controller();
    let mut rb = RxBuffer::new();
    let mut sink = BufferSink::new();
    activate(&mut ctrl, &mut rb, &mut sink);

    push_command(&mut rb, 1, 0.05, 0.05);
    ctrl.tick(&inputs(2), &mut rb, &mut sink);

    let jog = JogCommand {
        magic: JOG_MAGIC,
        mode: JogMode::Torque as u8,
        left_torque: 0.3,
        right_torque: -0.3,
        duration_ms: 100,
    };
    push(&mut rb, FrameType::Jog, 2, &jog.encode());
    push_heartbeat(&mut rb, 3);
    let out = ctrl.tick(&inputs(10), &mut rb, &mut sink);
    assert_eq!(out.left_command, 0.3);
    assert_eq!(out.right_command, -0.3);

    // Past expiry the PID output resumes.
    push_heartbeat(&mut rb, 4);
    let out = ctrl.tick(&inputs(120), &mut rb, &mut sink);
    assert!(out.left_command > 0.0);
    assert_ne!(out.left_command, 0.3);
}

#[test]
fn estop_force_stops_jog() {
    let mut ctrl = controller();
    let mut rb = RxBuffer::new();
    let mut sink = BufferSink::new();
    activate(&mut ctrl, &mut rb, &mut sink);

    let jog = JogCommand {
        magic: JOG_MAGIC,
        mode: JogMode::Torque as u8,
        left_torque: 0.3,
        right_torque: 0.3,
        duration_ms: 500,
    };
    push(&mut rb, FrameType::Jog, 1, &jog.encode());
    ctrl.tick(&inputs(2), &mut rb, &mut sink);

    let mut stop = inputs(3);
    stop.estop_active = true;
    let out = ctrl.tick(&stop, &mut rb, &mut sink);
    assert!(!out.energize);
    assert_eq!(out.left_command, 0.0);
    assert_eq!(out.right_command, 0.0);
    assert_eq!(out.state, ReportedState::Fault);
}

// ── PTT ─────────────────────────────────────────────────────────────

#[test]
fn ptt_event_emitted_when_allowed() {
    let mut ctrl = controller();
    let mut rb = RxBuffer::new();
    let mut sink = BufferSink::new();
    activate(&mut ctrl, &mut rb, &mut sink);

    let mut pressed = inputs(10);
    pressed.ptt_pressed = true;
    push_heartbeat(&mut rb, 1);
    ctrl.tick(&pressed, &mut rb, &mut sink); // edge recorded

    let mut held = inputs(40);
    held.ptt_pressed = true;
    push_heartbeat(&mut rb, 2);
    ctrl.tick(&held, &mut rb, &mut sink); // debounce window passed

    let events = frames_of(&sink, FrameType::InputEvent);
    assert_eq!(events.len(), 1);
    let event = InputEventPayload::decode(&events[0]).unwrap();
    assert_eq!(event.event, 1); // down
    assert!(event.pressed);
}

#[test]
fn ptt_edges_during_estop_never_surface() {
    let mut ctrl = controller();
    let mut rb = RxBuffer::new();
    let mut sink = BufferSink::new();
    activate(&mut ctrl, &mut rb, &mut sink);

    // Press while e-stop is held: resync only.
    let mut held = inputs(10);
    held.estop_active = true;
    held.ptt_pressed = true;
    ctrl.tick(&held, &mut rb, &mut sink);
    let mut held = inputs(60);
    held.estop_active = true;
    held.ptt_pressed = true;
    ctrl.tick(&held, &mut rb, &mut sink);

    // Recover with the button still pressed — no stale Down event.
    push_heartbeat(&mut rb, 1);
    let mut recovered = inputs(70);
    recovered.ptt_pressed = true;
    ctrl.tick(&recovered, &mut rb, &mut sink);
    push_heartbeat(&mut rb, 2);
    let mut recovered = inputs(120);
    recovered.ptt_pressed = true;
    ctrl.tick(&recovered, &mut rb, &mut sink);

    assert!(frames_of(&sink, FrameType::InputEvent).is_empty());
}

// ── Firmware-update flow ────────────────────────────────────────────

#[test]
fn update_flow_over_maintenance_frames() {
    let mut ctrl = controller();
    let mut rb = RxBuffer::new();
    let mut sink = BufferSink::new();
    activate(&mut ctrl, &mut rb, &mut sink);

    let request = MaintenanceCommand::encode_basic(MaintenanceOp::UpdateRequest, 0, 0x77);
    push(&mut rb, FrameType::Maintenance, 1, &request);
    let out = ctrl.tick(&inputs(10), &mut rb, &mut sink);
    assert_eq!(out.state, ReportedState::Maintenance);
    assert!(!out.energize);
    assert_eq!(ctrl.safety().update_state(), UpdateState::Requested);

    let arm = MaintenanceCommand::encode_basic(MaintenanceOp::UpdateArm, 0, 0x77);
    push(&mut rb, FrameType::Maintenance, 2, &arm);
    let out = ctrl.tick(&inputs(20), &mut rb, &mut sink);
    assert_eq!(ctrl.safety().update_state(), UpdateState::Armed);
    assert!(!out.update_ready);

    let out = ctrl.tick(&inputs(80), &mut rb, &mut sink);
    assert!(out.update_ready, "ready after the DFU settle delay");
}

#[test]
fn host_abort_returns_to_idle() {
    let mut ctrl = controller();
    let mut rb = RxBuffer::new();
    let mut sink = BufferSink::new();
    activate(&mut ctrl, &mut rb, &mut sink);

    let request = MaintenanceCommand::encode_basic(MaintenanceOp::UpdateRequest, 0, 0x11);
    push(&mut rb, FrameType::Maintenance, 1, &request);
    ctrl.tick(&inputs(10), &mut rb, &mut sink);

    let abort = MaintenanceCommand::encode_basic(MaintenanceOp::UpdateAbort, 0, 0);
    push(&mut rb, FrameType::Maintenance, 2, &abort);
    push_heartbeat(&mut rb, 3);
    let out = ctrl.tick(&inputs(20), &mut rb, &mut sink);
    assert_eq!(ctrl.safety().update_state(), UpdateState::Idle);
    assert_eq!(ctrl.safety().update_result(), UpdateResult::AbortHost);
    assert_ne!(out.state, ReportedState::Maintenance);
}

#[test]
fn bad_arm_token_aborts_flow() {
    let mut ctrl = controller();
    let mut rb = RxBuffer::new();
    let mut sink = BufferSink::new();
    activate(&mut ctrl, &mut rb, &mut sink);

    let request = MaintenanceCommand::encode_basic(MaintenanceOp::UpdateRequest, 0, 0xAAAA);
    push(&mut rb, FrameType::Maintenance, 1, &request);
    ctrl.tick(&inputs(10), &mut rb, &mut sink);

    let arm = MaintenanceCommand::encode_basic(MaintenanceOp::UpdateArm, 0, 0xBBBB);
    push(&mut rb, FrameType::Maintenance, 2, &arm);
    ctrl.tick(&inputs(20), &mut rb, &mut sink);
    assert_eq!(ctrl.safety().update_state(), UpdateState::Idle);
    assert_eq!(ctrl.safety().update_result(), UpdateResult::AbortBadToken);
}

// ── Profiles over maintenance frames ────────────────────────────────

#[test]
fn set_tuning_clamps_and_switch_scales_setpoints() {
    let mut ctrl = controller();
    let mut rb = RxBuffer::new();
    let mut sink = BufferSink::new();
    activate(&mut ctrl, &mut rb, &mut sink);

    let tuning = MaintenanceCommand::encode_tuning(3, 0, 4.0, 0.01);
    push(&mut rb, FrameType::Maintenance, 1, &tuning);
    let switch = MaintenanceCommand::encode_basic(MaintenanceOp::SwitchProfile, 3, 0);
    push(&mut rb, FrameType::Maintenance, 2, &switch);
    ctrl.tick(&inputs(2), &mut rb, &mut sink);

    let params = ctrl.profiles().get_params(3).unwrap();
    assert_eq!(params.force_intensity, 1.0); // clamped to max
    assert_eq!(params.motion_range, 0.2); // clamped to min
    assert_eq!(ctrl.profiles().active_car_type(), 3);

    // Setpoints are scaled by the active motion range.
    push_command(&mut rb, 3, 0.05, 0.05);
    push_heartbeat(&mut rb, 4);
    ctrl.tick(&inputs(3), &mut rb, &mut sink);
    assert!((ctrl.control().left().setpoint_m() - 0.01).abs() < 1e-6);
}

// ── Diagnostics & status ────────────────────────────────────────────

#[test]
fn diag_request_gets_echoed_response() {
    let mut ctrl = controller();
    let mut rb = RxBuffer::new();
    let mut sink = BufferSink::new();
    activate(&mut ctrl, &mut rb, &mut sink);

    push(
        &mut rb,
        FrameType::Diagnostic,
        1,
        &DiagRequest { token: 0xFEED }.encode(),
    );
    let mut with_adc = inputs(5);
    with_adc.left_adc_raw = 2048;
    with_adc.right_adc_raw = 1024;
    ctrl.tick(&with_adc, &mut rb, &mut sink);

    let responses = frames_of(&sink, FrameType::Diagnostic);
    assert_eq!(responses.len(), 1);
    let resp = DiagResponse::decode(&responses[0]).unwrap();
    assert_eq!(resp.token, 0xFEED);
    assert_eq!(resp.left_adc_raw, 2048);
    assert_eq!(resp.torque_scale, 1.0);
}

#[test]
fn status_frames_are_periodic_and_carry_state() {
    let mut ctrl = controller();
    let mut rb = RxBuffer::new();
    let mut sink = BufferSink::new();
    activate(&mut ctrl, &mut rb, &mut sink);

    for t in (10..=100).step_by(10) {
        push_heartbeat(&mut rb, t);
        ctrl.tick(&inputs(t), &mut rb, &mut sink);
    }

    let statuses = frames_of(&sink, FrameType::Status);
    assert!(statuses.len() >= 4, "expected periodic status frames");
    let status = StatusPayload::decode(statuses.last().unwrap()).unwrap();
    assert_eq!(status.state, ReportedState::Active as u8);
    let flags = StatusFlags::from_bits_truncate(status.flags);
    assert!(flags.contains(StatusFlags::USB));
    assert!(flags.contains(StatusFlags::PWM));
    assert!(flags.contains(StatusFlags::SENSOR_OK));
    assert!(!flags.contains(StatusFlags::ESTOP));
    assert_eq!(status.fault_code, 0);
    assert_eq!(status.active_car_type, 0);
}

// ── Corrupt input streams ───────────────────────────────────────────

#[test]
fn garbage_bytes_between_frames_are_survivable() {
    let mut ctrl = controller();
    let mut rb = RxBuffer::new();
    let mut sink = BufferSink::new();

    rb.write(&[0xDE, 0xAD, 0xBE, 0xEF]);
    push_heartbeat(&mut rb, 0);
    rb.write(&[0x00, 0xFF]);
    push_command(&mut rb, 1, 0.02, 0.02);

    let out = ctrl.tick(&inputs(1), &mut rb, &mut sink);
    assert_eq!(out.state, ReportedState::Active);
    assert_eq!(ctrl.control().left().setpoint_m(), 0.02);
}
