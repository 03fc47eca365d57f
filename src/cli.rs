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

//! Command line interface

use std::path::PathBuf;

use clap::Parser;

use crate::control_page::SpeedLevel;

#[derive(Parser, Debug)]
#[command(name = "sa120fan")]
#[command(version)]
#[command(about = "Read and set fan speeds on ThinkServer SA120 enclosures")]
#[command(long_about = "Read and set fan speeds on ThinkServer SA120 enclosures

Enclosures are found by querying /dev/sg*, /dev/ses* and /dev/bsg/* (plus any
DEVICE patterns given) with sg_ses from sg3_utils, which must be installed.

EXAMPLES:
    sa120fan                     Show fan speeds of every SA120 found
    sa120fan --set-speed 2       Set every fan to speed code 2 (1 = lowest, 7 = highest)
    sa120fan -n -s 2             Print the control page that would be written
    sa120fan --json /dev/sg12    Also check /dev/sg12, print readings as JSON

ENVIRONMENT VARIABLES:
    RUST_LOG=debug         Override the log filter
    SA120FAN_CONFIG=PATH   Config file location

FILES:
    $XDG_CONFIG_HOME/sa120fan/config.json    User config
    ~/.config/sa120fan/config.json           User config without XDG_CONFIG_HOME
    /etc/sa120fan/config.json                System config
The first of these that exists is used.")]
pub struct Cli {
    /// Set the fan speed code on every enclosure found (1-7)
    #[arg(short = 's', long = "set-speed", value_name = "LEVEL", value_parser = parse_speed_level)]
    pub set_speed: Option<SpeedLevel>,

    /// With --set-speed, print the patched control page instead of writing it
    #[arg(short = 'n', long, requires = "set_speed", conflicts_with = "json")]
    pub dry_run: bool,

    /// Print fan readings as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Config file to use instead of the default locations
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Append JSON events to the configured event log
    #[arg(long)]
    pub logging: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Extra paths to search for enclosures (glob patterns allowed)
    #[arg(value_name = "DEVICE")]
    pub devices: Vec<String>,
}

fn parse_speed_level(s: &str) -> Result<SpeedLevel, String> {
    let level: u8 = s
        .trim()
        .parse()
        .map_err(|_| format!("`{}` is not a number", s))?;
    SpeedLevel::try_from(level).map_err(|e| e.to_string())
}
