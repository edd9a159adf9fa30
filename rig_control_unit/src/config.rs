//! TOML configuration loader with validation.
//!
//! Thin wrapper over the shared config types: parse, then run the section
//! validators so a bad envelope or zero timeout is caught at startup, not
//! mid-motion.

use std::path::Path;

use rig_common::config::ControllerConfig;
use thiserror::Error;

/// Configuration loading/validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("config I/O error: {0}")]
    Io(String),
    /// TOML parse error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Parameter validation error.
    #[error("config validation: {0}")]
    Validation(String),
}

/// Load and validate the controller configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ControllerConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("failed to read {}: {e}", path.display())))?;
    from_toml_str(&text)
}

/// Load and validate from a TOML string (for testing and embedding).
pub fn from_toml_str(text: &str) -> Result<ControllerConfig, ConfigError> {
    let cfg: ControllerConfig =
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    cfg.validate().map_err(ConfigError::Validation)?;
    Ok(cfg)
}
