/*
 * This file is part of sa120fan.
 *
 * Copyright (C) 2025 sa120fan contributors
 *
 * sa120fan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * sa120fan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with sa120fan. If not, see <https://www.gnu.org/licenses/>.
 */

//! Error type shared by every sa120fan module.

use std::io;
use std::path::PathBuf;

/// Result type alias using SesError
pub type Result<T> = std::result::Result<T, SesError>;

#[derive(thiserror::Error, Debug)]
pub enum SesError {
    // ============================================================================
    // I/O and process errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: io::Error,
    },

    #[error("Command `{command}` failed with {}: {stderr}", exit_label(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    // ============================================================================
    // Device discovery errors
    // ============================================================================
    #[error("Invalid device pattern {pattern}: {reason}")]
    InvalidPattern {
        pattern: String,
        reason: String,
    },

    #[error("Failed to stat {path}: {source}")]
    Stat {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Enclosure data errors
    // ============================================================================
    #[error("Unexpected fan speed output for {device} fan #{fan}: {output:?}")]
    ParseFanSpeed {
        device: PathBuf,
        fan: usize,
        output: String,
    },

    #[error("Invalid hex byte {token:?} at offset {offset} in control page")]
    InvalidHexByte {
        offset: usize,
        token: String,
    },

    #[error("Control page too short: {len} bytes, need at least {required}")]
    ControlPageTooShort {
        len: usize,
        required: usize,
    },

    #[error("Invalid speed level: {0} (must be 1-7)")]
    InvalidSpeedLevel(u8),

    // ============================================================================
    // Configuration errors
    // ============================================================================
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {}", c),
        None => "signal".to_string(),
    }
}

impl SesError {
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True when the external tool ran but reported failure, as opposed to
    /// the tool being missing or the host failing.
    pub fn is_command_failure(&self) -> bool {
        matches!(self, Self::CommandFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display_with_code() {
        let err = SesError::CommandFailed {
            command: "sg_ses --status /dev/sg0".to_string(),
            code: Some(5),
            stderr: "illegal request".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Command `sg_ses --status /dev/sg0` failed with exit code 5: illegal request"
        );
        assert!(err.is_command_failure());
    }

    #[test]
    fn test_command_failed_display_signal() {
        let err = SesError::CommandFailed {
            command: "sg_ses".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("signal"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: SesError = io_err.into();
        assert!(matches!(err, SesError::Io(_)));
        assert!(!err.is_command_failure());
    }

    #[test]
    fn test_invalid_config_helper() {
        let err = SesError::invalid_config("fan_count", "must be between 1 and 16");
        assert_eq!(
            err.to_string(),
            "Invalid configuration value for fan_count: must be between 1 and 16"
        );
    }

    #[test]
    fn test_speed_level_display() {
        assert_eq!(
            SesError::InvalidSpeedLevel(9).to_string(),
            "Invalid speed level: 9 (must be 1-7)"
        );
    }
}
