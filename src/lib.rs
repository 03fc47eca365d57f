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

//! sa120fan - fan speed control for ThinkServer SA120 SAS enclosures
//!
//! Discovers SA120 enclosures among the host's SCSI generic, SES and bsg
//! nodes, reads cooling fan speeds and writes speed requests to the SES
//! Enclosure Control page. All SES traffic goes through `sg_ses`.

pub mod app;
pub mod cli;
pub mod config;
pub mod control_page;
pub mod discovery;
pub mod error;
pub mod fans;
pub mod logger;
pub mod sg_ses;

pub use error::{Result, SesError};

#[cfg(test)]
pub mod test_utils;
