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

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::discovery::DEFAULT_ENCLOSURE_MODEL;
use crate::error::{Result, SesError};
use crate::fans::DEFAULT_FAN_COUNT;
use crate::sg_ses::{DEFAULT_MAX_RESPONSE_LEN, DEFAULT_SG_SES_PATH};

pub const CONFIG_ENV: &str = "SA120FAN_CONFIG";
pub const DEFAULT_EVENT_LOG_PATH: &str = "/var/log/sa120fan/events.json";
pub const MAX_FAN_COUNT: usize = 16;

/// On-disk settings. Every field is optional; absent fields fall back to the
/// built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SavedConfig {
    #[serde(default)]
    pub sg_ses_path: Option<String>,
    #[serde(default)]
    pub max_response_len: Option<u32>,
    #[serde(default)]
    pub enclosure_model: Option<String>,
    #[serde(default)]
    pub fan_count: Option<usize>,
    #[serde(default)]
    pub extra_device_patterns: Vec<String>,
    #[serde(default)]
    pub event_log_path: Option<PathBuf>,
}

/// Effective settings after applying defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub sg_ses_path: String,
    pub max_response_len: u32,
    pub enclosure_model: String,
    pub fan_count: usize,
    pub extra_device_patterns: Vec<String>,
    pub event_log_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sg_ses_path: DEFAULT_SG_SES_PATH.to_string(),
            max_response_len: DEFAULT_MAX_RESPONSE_LEN,
            enclosure_model: DEFAULT_ENCLOSURE_MODEL.to_string(),
            fan_count: DEFAULT_FAN_COUNT,
            extra_device_patterns: Vec::new(),
            event_log_path: PathBuf::from(DEFAULT_EVENT_LOG_PATH),
        }
    }
}

impl Settings {
    pub fn from_saved(saved: SavedConfig) -> Result<Self> {
        validate_saved_config(&saved)?;
        let defaults = Settings::default();
        Ok(Self {
            sg_ses_path: saved.sg_ses_path.unwrap_or(defaults.sg_ses_path),
            max_response_len: saved.max_response_len.unwrap_or(defaults.max_response_len),
            enclosure_model: saved.enclosure_model.unwrap_or(defaults.enclosure_model),
            fan_count: saved.fan_count.unwrap_or(defaults.fan_count),
            extra_device_patterns: saved.extra_device_patterns,
            event_log_path: saved.event_log_path.unwrap_or(defaults.event_log_path),
        })
    }
}

/// Candidate config files in lookup order: XDG, then $HOME, then /etc.
/// Unset or empty variables contribute nothing.
pub fn config_candidates() -> Vec<PathBuf> {
    let var = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());
    let mut candidates = Vec::with_capacity(3);
    if let Some(xdg) = var("XDG_CONFIG_HOME") {
        candidates.push(Path::new(&xdg).join("sa120fan").join("config.json"));
    }
    if let Some(home) = var("HOME") {
        candidates.push(
            Path::new(&home)
                .join(".config")
                .join("sa120fan")
                .join("config.json"),
        );
    }
    candidates.push(system_config_path());
    candidates
}

/// Implicit config location. $SA120FAN_CONFIG is taken as given; otherwise
/// the first candidate that exists, falling back to the /etc path.
pub fn config_path() -> PathBuf {
    if let Ok(explicit) = env::var(CONFIG_ENV) {
        if !explicit.is_empty() {
            return PathBuf::from(explicit);
        }
    }
    config_candidates()
        .into_iter()
        .find(|p| p.exists())
        .unwrap_or_else(system_config_path)
}

pub fn system_config_path() -> PathBuf {
    PathBuf::from("/etc/sa120fan/config.json")
}

pub fn validate_saved_config(cfg: &SavedConfig) -> Result<()> {
    if let Some(path) = &cfg.sg_ses_path {
        if path.trim().is_empty() {
            return Err(SesError::invalid_config("sg_ses_path", "must not be empty"));
        }
    }
    if let Some(len) = cfg.max_response_len {
        if len == 0 || len > 65535 {
            return Err(SesError::invalid_config(
                "max_response_len",
                format!("{} is outside 1..=65535", len),
            ));
        }
    }
    if let Some(model) = &cfg.enclosure_model {
        if model.trim().is_empty() {
            return Err(SesError::invalid_config("enclosure_model", "must not be empty"));
        }
    }
    if let Some(count) = cfg.fan_count {
        if count == 0 || count > MAX_FAN_COUNT {
            return Err(SesError::invalid_config(
                "fan_count",
                format!("{} is outside 1..={}", count, MAX_FAN_COUNT),
            ));
        }
    }
    if cfg.extra_device_patterns.iter().any(|p| p.trim().is_empty()) {
        return Err(SesError::invalid_config("extra_device_patterns", "contains an empty pattern"));
    }
    Ok(())
}

pub fn load_config_file(path: &Path) -> Result<SavedConfig> {
    let data = fs::read_to_string(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            SesError::ConfigNotFound(path.to_path_buf())
        } else {
            SesError::Io(e)
        }
    })?;
    Ok(serde_json::from_str(&data)?)
}

/// Resolve settings. An explicit path must exist; the implicit location is
/// optional.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let saved = match explicit {
        Some(path) => load_config_file(path)?,
        None => {
            let path = config_path();
            match load_config_file(&path) {
                Ok(saved) => {
                    tracing::debug!("Loaded config from {}", path.display());
                    saved
                }
                Err(SesError::ConfigNotFound(_)) => SavedConfig::default(),
                Err(e) => return Err(e),
            }
        }
    };
    Settings::from_saved(saved)
}
