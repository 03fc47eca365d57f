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

use std::io::stdout;

use anyhow::Context;
use clap::Parser;
use serde_json::json;

use sa120fan::app::{App, RunOptions};
use sa120fan::cli::Cli;
use sa120fan::config::load_settings;
use sa120fan::logger;
use sa120fan::sg_ses::SgSes;

fn main() {
    let cli = Cli::parse();
    logger::init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            tracing::error!("{:#}", err);
            logger::log_event("fatal_error", json!({ "error": format!("{:#}", err) }));
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let settings = load_settings(cli.config.as_deref()).context("loading configuration")?;

    if cli.logging {
        if let Some(path) = logger::init_event_log(&settings.event_log_path) {
            tracing::debug!("Event log: {}", path.display());
        }
        logger::log_event("startup", json!({ "args": std::env::args().collect::<Vec<_>>() }));
    }

    // /dev/sg* is root-only on most systems
    if unsafe { libc::geteuid() } != 0 {
        tracing::warn!("Not running as root; enclosure nodes may be unreadable");
    }

    let runner = SgSes::new(settings.sg_ses_path.clone(), settings.max_response_len);
    tracing::debug!("Using {} with --maxlen={}", runner.program(), settings.max_response_len);
    let options = RunOptions {
        extra_patterns: cli.devices,
        set_speed: cli.set_speed,
        dry_run: cli.dry_run,
        json: cli.json,
    };
    let app = App::new(&runner, &settings, options);

    let mut out = stdout().lock();
    let summary = app.run(&mut out)?;
    Ok(summary.success())
}
