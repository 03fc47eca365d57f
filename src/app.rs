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

//! One discovery-and-control pass over every matching enclosure.

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::json;

use crate::config::Settings;
use crate::control_page::{self, SpeedLevel};
use crate::discovery::{self, Enclosure};
use crate::error::Result;
use crate::fans::{self, FanReading};
use crate::logger;
use crate::sg_ses::SesRunner;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub extra_patterns: Vec<String>,
    pub set_speed: Option<SpeedLevel>,
    pub dry_run: bool,
    pub json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnclosureReport {
    pub path: PathBuf,
    pub device_id: String,
    pub name: String,
    pub fans: Vec<FanReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_set: Option<SpeedLevel>,
    /// Patched page 0x2 in `sg_ses --data` form, filled by a JSON dry run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run_page: Option<String>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<EnclosureReport>,
    pub failures: Vec<(PathBuf, String)>,
}

impl RunSummary {
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct App<'a> {
    runner: &'a dyn SesRunner,
    settings: &'a Settings,
    options: RunOptions,
}

impl<'a> App<'a> {
    pub fn new(runner: &'a dyn SesRunner, settings: &'a Settings, options: RunOptions) -> Self {
        Self {
            runner,
            settings,
            options,
        }
    }

    pub fn patterns(&self) -> Vec<String> {
        let extra: Vec<&String> = self
            .settings
            .extra_device_patterns
            .iter()
            .chain(self.options.extra_patterns.iter())
            .collect();
        discovery::device_patterns(&extra)
    }

    /// Discover enclosures and handle each one. Human and JSON output goes to
    /// `out`; diagnostics go through tracing.
    pub fn run(&self, out: &mut dyn Write) -> Result<RunSummary> {
        let enclosures =
            discovery::find_enclosures(self.runner, &self.patterns(), &self.settings.enclosure_model);
        if enclosures.is_empty() {
            tracing::warn!("No {} enclosures found", self.settings.enclosure_model);
        }

        let mut summary = RunSummary::default();
        for enclosure in &enclosures {
            logger::log_event(
                "enclosure_found",
                json!({ "path": enclosure.path, "id": enclosure.id.to_string(), "name": enclosure.name }),
            );
            match self.handle_enclosure(enclosure, out) {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    tracing::error!("{}: {}", enclosure.path.display(), e);
                    summary.failures.push((enclosure.path.clone(), e.to_string()));
                }
            }
        }

        if self.options.json {
            serde_json::to_writer_pretty(&mut *out, &summary.reports)?;
            writeln!(out)?;
        }
        Ok(summary)
    }

    fn handle_enclosure(&self, enclosure: &Enclosure, out: &mut dyn Write) -> Result<EnclosureReport> {
        let fans = fans::get_fan_speeds(self.runner, &enclosure.path, self.settings.fan_count)?;
        for fan in &fans {
            // stdout carries the JSON report, keep stderr quiet at the default level
            if self.options.json {
                tracing::debug!("Fan #{}: {} RPM", fan.index, fan.rpm);
            } else {
                tracing::info!("Fan #{}: {} RPM", fan.index, fan.rpm);
            }
        }
        logger::log_event(
            "fan_speeds",
            json!({ "path": enclosure.path, "rpm": fans.iter().map(|f| f.rpm).collect::<Vec<_>>() }),
        );

        let mut speed_set = None;
        let mut dry_run_page = None;
        if let Some(level) = self.options.set_speed {
            if self.options.dry_run {
                let page = control_page::prepare_fan_speed_page(
                    self.runner,
                    &enclosure.path,
                    self.settings.fan_count,
                    level,
                )?;
                tracing::info!("Dry run, not writing fan speed {} to {}", level, enclosure.path.display());
                if self.options.json {
                    dry_run_page = Some(page.to_hex());
                } else {
                    writeln!(out, "# {} ({})", enclosure.path.display(), enclosure.name)?;
                    out.write_all(page.to_hex().as_bytes())?;
                }
            } else {
                tracing::info!("Setting fan speed to: {}", level);
                control_page::set_fan_speeds(self.runner, &enclosure.path, self.settings.fan_count, level)?;
                logger::log_event(
                    "fan_speed_set",
                    json!({ "path": enclosure.path, "level": level.get() }),
                );
                speed_set = Some(level);
            }
        }

        Ok(EnclosureReport {
            path: enclosure.path.clone(),
            device_id: enclosure.id.to_string(),
            name: enclosure.name.clone(),
            fans,
            speed_set,
            dry_run_page,
        })
    }
}
