//! Rig Common Library
//!
//! Shared types for the rig-core workspace: state machine enums, the fault
//! taxonomy, status flag bitmasks, configuration structures, profile
//! parameters, wrap-tolerant millisecond arithmetic, and firmware version
//! constants.
//!
//! Everything here is plain data — no I/O, no hardware access. The decision
//! logic lives in `rig_control_unit`.

pub mod config;
pub mod fault;
pub mod profile;
pub mod state;
pub mod time;
pub mod version;
