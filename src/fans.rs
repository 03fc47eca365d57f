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

//! Cooling fan tachometer readings.

use std::path::Path;

use serde::Serialize;

use crate::error::{Result, SesError};
use crate::sg_ses::SesRunner;

pub const DEFAULT_FAN_COUNT: usize = 6;

/// The actual fan speed field counts in units of 10 RPM.
pub const RPM_PER_UNIT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FanReading {
    pub index: usize,
    pub raw: u32,
    pub rpm: u32,
}

impl FanReading {
    pub fn from_raw(index: usize, raw: u32) -> Self {
        Self {
            index,
            raw,
            rpm: raw.saturating_mul(RPM_PER_UNIT),
        }
    }
}

fn fan_speed_args(device: &Path, fan_idx: usize) -> Vec<String> {
    vec![
        device.to_string_lossy().into_owned(),
        format!("--index=coo,{}", fan_idx),
        // byte 1, bits 2..0 plus byte 2: actual fan speed
        "--get=1:2:11".to_string(),
    ]
}

pub fn get_fan_speed(runner: &dyn SesRunner, device: &Path, fan_idx: usize) -> Result<FanReading> {
    let out = runner.query(&fan_speed_args(device, fan_idx))?;
    let raw = out.trim().parse::<u32>().map_err(|_| SesError::ParseFanSpeed {
        device: device.to_path_buf(),
        fan: fan_idx,
        output: out.clone(),
    })?;
    Ok(FanReading::from_raw(fan_idx, raw))
}

pub fn get_fan_speeds(runner: &dyn SesRunner, device: &Path, fan_count: usize) -> Result<Vec<FanReading>> {
    (0..fan_count)
        .map(|fan_idx| get_fan_speed(runner, device, fan_idx))
        .collect()
}
