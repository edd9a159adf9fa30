//! # Rig Control Unit
//!
//! Decision core of the motion-platform actuator controller. Arbitrates
//! safety state, runs a closed-loop position controller for two linear
//! axes, frames and parses the binary command/telemetry protocol, and
//! manages the in-field firmware-update handshake and per-profile tuning
//! store.
//!
//! ## Structure
//!
//! 1. **`safety`** — lifecycle state machine, torque decay, update sub-machine
//! 2. **`control`** — per-axis PID and the dual-axis control loop
//! 3. **`protocol`** — ring buffer, frame codec, resumable parser, payloads
//! 4. **`jog` / `ptt`** — manual override and debounced momentary input
//! 5. **`profile`** — per-car-type tuning store with persisted blob
//! 6. **`cycle`** — the per-tick pipeline wiring everything together
//!
//! ## Hosting contract
//!
//! Single cooperative loop, no blocking, no background threads. The caller
//! supplies a monotonically increasing `u32` millisecond counter each tick
//! and owns all transport/storage I/O through injected traits. Nothing in
//! this crate panics on bad input: operations return values or latch fault
//! codes the host polls.

pub mod config;
pub mod control;
pub mod cycle;
pub mod jog;
pub mod profile;
pub mod protocol;
pub mod ptt;
pub mod safety;
