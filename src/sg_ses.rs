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

//! Thin wrapper around the `sg_ses` binary from sg3_utils.
//!
//! All SES traffic goes through [`SesRunner`] so discovery and fan control can
//! be exercised without an enclosure attached.

use std::io::Write;
use std::process::{Command, Stdio};

use crate::error::{Result, SesError};

pub const DEFAULT_SG_SES_PATH: &str = "sg_ses";
// sg_ses uses a default of 65532, but not everything supports that
pub const DEFAULT_MAX_RESPONSE_LEN: u32 = 32768;

#[cfg_attr(test, mockall::automock)]
pub trait SesRunner {
    /// Run sg_ses with `args` and return its stdout.
    fn query(&self, args: &[String]) -> Result<String>;

    /// Run sg_ses with `args`, feeding `input` on stdin, and return its stdout.
    fn submit(&self, args: &[String], input: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct SgSes {
    program: String,
    max_response_len: u32,
}

impl Default for SgSes {
    fn default() -> Self {
        Self::new(DEFAULT_SG_SES_PATH, DEFAULT_MAX_RESPONSE_LEN)
    }
}

impl SgSes {
    pub fn new(program: impl Into<String>, max_response_len: u32) -> Self {
        Self {
            program: program.into(),
            max_response_len,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument vector, including the leading `--maxlen` flag.
    pub fn command_args(&self, args: &[String]) -> Vec<String> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(format!("--maxlen={}", self.max_response_len));
        full.extend(args.iter().cloned());
        full
    }

    fn run(&self, args: &[String], input: Option<&str>) -> Result<String> {
        let full = self.command_args(args);
        let cmdline = command_line(&self.program, &full);
        tracing::debug!("Running command: {}", cmdline);

        let mut child = Command::new(&self.program)
            .args(&full)
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SesError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // A write error (EPIPE when sg_ses exits early) is only reported if
        // the child itself succeeded; otherwise its stderr says more.
        let mut write_err = None;
        if let Some(data) = input {
            // Dropping the handle closes the pipe so sg_ses sees EOF.
            if let Some(mut stdin) = child.stdin.take() {
                if let Err(e) = stdin.write_all(data.as_bytes()) {
                    tracing::debug!("Writing to {} stdin failed: {}", self.program, e);
                    write_err = Some(e);
                }
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(SesError::CommandFailed {
                command: cmdline,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if let Some(e) = write_err {
            return Err(SesError::Io(e));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl SesRunner for SgSes {
    fn query(&self, args: &[String]) -> Result<String> {
        self.run(args, None)
    }

    fn submit(&self, args: &[String], input: &str) -> Result<String> {
        self.run(args, Some(input))
    }
}

/// Render a command line for logs, quoting arguments the way a POSIX shell
/// would need them.
pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(shell_quote)
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '=' | '/' | '.' | ',' | ':' | '@' | '%' | '+'));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\"'\"'"))
    }
}
