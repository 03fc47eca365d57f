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

//! Enclosure discovery: enumerate SCSI generic / SES / bsg nodes, collapse
//! aliases of the same device and keep the ones reporting the wanted model.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Result, SesError};
use crate::sg_ses::SesRunner;

pub const DEFAULT_DEVICE_PATTERNS: &[&str] = &["/dev/sg*", "/dev/ses*", "/dev/bsg/*"];
pub const DEFAULT_ENCLOSURE_MODEL: &str = "ThinkServerSA120";

/// Major/minor pair of a character device node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceId {
    pub major: u32,
    pub minor: u32,
}

impl DeviceId {
    pub fn from_rdev(rdev: u64) -> Self {
        let rdev = rdev as libc::dev_t;
        Self {
            major: libc::major(rdev) as u32,
            minor: libc::minor(rdev) as u32,
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceNode {
    pub path: PathBuf,
    pub id: DeviceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enclosure {
    pub path: PathBuf,
    pub id: DeviceId,
    pub name: String,
}

/// Default patterns followed by `extra`, in order.
pub fn device_patterns<S: AsRef<str>>(extra: &[S]) -> Vec<String> {
    DEFAULT_DEVICE_PATTERNS
        .iter()
        .map(|p| p.to_string())
        .chain(extra.iter().map(|p| p.as_ref().to_string()))
        .collect()
}

/// Identity of a character device, following symlinks. `Ok(None)` for
/// anything that is not a character device.
pub fn char_device_id(path: &Path) -> Result<Option<DeviceId>> {
    let meta = fs::metadata(path).map_err(|source| SesError::Stat {
        path: path.to_path_buf(),
        source,
    })?;
    if !meta.file_type().is_char_device() {
        return Ok(None);
    }
    Ok(Some(DeviceId::from_rdev(meta.rdev())))
}

/// Expand every pattern and keep existing character devices.
pub fn enumerate_devices<S: AsRef<str>>(patterns: &[S]) -> Vec<DeviceNode> {
    let mut nodes = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(e) => {
                let err = SesError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                };
                tracing::warn!("{}", err);
                continue;
            }
        };

        for entry in paths {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::debug!("Skipping unreadable glob entry: {}", e);
                    continue;
                }
            };
            match char_device_id(&path) {
                Ok(Some(id)) => nodes.push(DeviceNode { path, id }),
                Ok(None) => {}
                Err(e) => tracing::debug!("{}", e),
            }
        }
    }
    nodes
}

/// Collapse nodes sharing a device id. Ids keep the order in which they were
/// first seen; the path kept for each id is the last one enumerated.
pub fn dedupe_by_id(nodes: Vec<DeviceNode>) -> Vec<DeviceNode> {
    let mut slot_for: HashMap<DeviceId, usize> = HashMap::new();
    let mut unique: Vec<DeviceNode> = Vec::new();
    for node in nodes {
        match slot_for.get(&node.id) {
            Some(&slot) => unique[slot].path = node.path,
            None => {
                slot_for.insert(node.id, unique.len());
                unique.push(node);
            }
        }
    }
    unique
}

/// Enclosure name from `sg_ses --status` output: the first line, trimmed.
/// `None` when the output is blank.
pub fn enclosure_name(status: &str) -> Option<String> {
    if status.trim().is_empty() {
        return None;
    }
    status.lines().next().map(|line| line.trim().to_string())
}

/// Ask one node for its enclosure name. Nodes that sg_ses cannot talk to
/// yield `None`.
pub fn query_enclosure_name(runner: &dyn SesRunner, node: &DeviceNode) -> Option<String> {
    tracing::info!("Checking device: {} ({})", node.path.display(), node.id);
    let args = vec![node.path.to_string_lossy().into_owned(), "--status".to_string()];
    let out = match runner.query(&args) {
        Ok(out) => out,
        // Most nodes under /dev/sg* are disks, so a refused --status is routine
        Err(e) if e.is_command_failure() => {
            tracing::debug!("{}", e);
            return None;
        }
        Err(e) => {
            tracing::warn!("Skipping {}: {}", node.path.display(), e);
            return None;
        }
    };

    let name = enclosure_name(&out)?;
    tracing::info!("Found enclosure on {}: {}", node.path.display(), name);
    Some(name)
}

pub fn filter_enclosures(runner: &dyn SesRunner, nodes: &[DeviceNode], model: &str) -> Vec<Enclosure> {
    nodes
        .iter()
        .filter_map(|node| {
            let name = query_enclosure_name(runner, node)?;
            name.contains(model).then(|| Enclosure {
                path: node.path.clone(),
                id: node.id,
                name,
            })
        })
        .collect()
}

/// Full discovery pass over `patterns`.
pub fn find_enclosures<S: AsRef<str>>(runner: &dyn SesRunner, patterns: &[S], model: &str) -> Vec<Enclosure> {
    let unique = dedupe_by_id(enumerate_devices(patterns));
    tracing::debug!(
        "Found existing devices: {}",
        unique
            .iter()
            .map(|n| n.path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    filter_enclosures(runner, &unique, model)
}
