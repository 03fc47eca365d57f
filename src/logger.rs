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

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;
use serde_json::{json, Value};

pub const FALLBACK_EVENT_LOG_PATH: &str = "/tmp/sa120fan_events.json";

lazy_static! {
    static ref EVENT_LOG: Mutex<Option<File>> = Mutex::new(None);
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Filter directive for the stderr diagnostics. `RUST_LOG` wins when set.
pub fn filter_directive(verbose: u8, rust_log: Option<&str>) -> String {
    if let Some(directive) = rust_log.filter(|s| !s.trim().is_empty()) {
        return directive.to_string();
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
    .to_string()
}

pub fn init_tracing(verbose: u8) {
    let directive = filter_directive(verbose, std::env::var("RUST_LOG").ok().as_deref());
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_env_filter(tracing_subscriber::EnvFilter::new(directive))
        .init();
}

fn open_append(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

/// Start appending JSON events to `path`, or to the /tmp fallback when `path`
/// cannot be opened. Returns the file actually in use.
pub fn init_event_log(path: &Path) -> Option<PathBuf> {
    let (file, used) = match open_append(path) {
        Some(f) => (f, path.to_path_buf()),
        None => {
            let fallback = PathBuf::from(FALLBACK_EVENT_LOG_PATH);
            tracing::warn!(
                "Cannot open event log {}, using {}",
                path.display(),
                fallback.display()
            );
            (open_append(&fallback)?, fallback)
        }
    };
    if let Ok(mut guard) = EVENT_LOG.lock() {
        *guard = Some(file);
    }
    Some(used)
}

pub fn event_line(event: &str, data: Value) -> String {
    json!({
        "ts_ms": now_millis(),
        "event": event,
        "data": data,
    })
    .to_string()
}

/// Append one event. A no-op until `init_event_log` has run.
pub fn log_event(event: &str, data: Value) {
    if let Ok(mut guard) = EVENT_LOG.lock() {
        if let Some(f) = guard.as_mut() {
            let _ = writeln!(f, "{}", event_line(event, data));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_filter_directive_verbosity() {
        assert_eq!(filter_directive(0, None), "info");
        assert_eq!(filter_directive(1, None), "debug");
        assert_eq!(filter_directive(5, None), "trace");
    }

    #[test]
    fn test_filter_directive_rust_log_wins() {
        assert_eq!(filter_directive(2, Some("warn")), "warn");
        assert_eq!(filter_directive(1, Some("  ")), "debug");
    }

    #[test]
    fn test_event_line_shape() {
        let line = event_line("fan_speed_set", json!({ "level": 3 }));
        let v: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["event"], "fan_speed_set");
        assert_eq!(v["data"]["level"], 3);
        assert!(v["ts_ms"].as_u64().unwrap() > 0);
    }

    #[test]
    #[serial]
    fn test_event_log_appends_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("events.json");
        let used = init_event_log(&path).unwrap();
        assert_eq!(used, path);

        log_event("startup", json!({ "args": ["sa120fan"] }));
        log_event("enclosure_found", json!({ "path": "/dev/sg3" }));

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "startup");
        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["data"]["path"], "/dev/sg3");

        if let Ok(mut guard) = EVENT_LOG.lock() {
            *guard = None;
        }
    }
}
