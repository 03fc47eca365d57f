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

//! SES Enclosure Control diagnostic page (page 0x2) handling.
//!
//! The page is fetched as hex text with `sg_ses -p 0x2 --raw`, patched in
//! place, and written back with `sg_ses -p 0x2 --control --data -`.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::{Result, SesError};
use crate::sg_ses::SesRunner;

/// Byte offset of the first individual cooling element on an SA120.
pub const COOLING_ELEMENT_OFFSET: usize = 88;
pub const ELEMENT_LEN: usize = 4;

const SELECT: u8 = 0x80;
const RQST_ON: u8 = 1 << 5;
const SPEED_CODE_MASK: u8 = 0x07;

/// SES requested speed code for a cooling element, 1 (lowest) to 7 (highest).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SpeedLevel(u8);

impl SpeedLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 7;

    pub fn new(level: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(SesError::InvalidSpeedLevel(level))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Byte 3 of a cooling control element requesting this speed.
    pub fn control_byte(self) -> u8 {
        RQST_ON | (self.0 & SPEED_CODE_MASK)
    }
}

impl TryFrom<u8> for SpeedLevel {
    type Error = SesError;

    fn try_from(level: u8) -> Result<Self> {
        Self::new(level)
    }
}

impl fmt::Display for SpeedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPage {
    bytes: Vec<u8>,
}

impl ControlPage {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Parse whitespace separated hex bytes as printed by `sg_ses --raw`.
    pub fn parse(text: &str) -> Result<Self> {
        let bytes = text
            .split_whitespace()
            .enumerate()
            .map(|(offset, token)| {
                u8::from_str_radix(token, 16).map_err(|_| SesError::InvalidHexByte {
                    offset,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<u8>>>()?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Point every cooling element at `level`. Fails without touching the
    /// buffer if it does not hold `fan_count` elements.
    pub fn set_fan_speeds(&mut self, fan_count: usize, level: SpeedLevel) -> Result<()> {
        let required = COOLING_ELEMENT_OFFSET + ELEMENT_LEN * fan_count;
        if self.bytes.len() < required {
            return Err(SesError::ControlPageTooShort {
                len: self.bytes.len(),
                required,
            });
        }

        for fan_idx in 0..fan_count {
            let idx = COOLING_ELEMENT_OFFSET + ELEMENT_LEN * fan_idx;
            self.bytes[idx..idx + ELEMENT_LEN]
                .copy_from_slice(&[SELECT, 0x00, 0x00, level.control_byte()]);
        }
        Ok(())
    }

    /// Hex dump in the layout sg_ses accepts for `--data -`: sixteen bytes per
    /// line, with a wider gap after the eighth.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(self.bytes.len() * 3 + self.bytes.len() / 8 + 1);
        for (offset, byte) in self.bytes.iter().enumerate() {
            if offset > 0 {
                if offset % 16 == 0 {
                    out.push('\n');
                } else if offset % 8 == 0 {
                    out.push_str("  ");
                } else {
                    out.push(' ');
                }
            }
            out.push_str(&format!("{:02x}", byte));
        }
        out.push('\n');
        out
    }
}

fn page_args(device: &Path, extra: &[&str]) -> Vec<String> {
    let mut args = vec![
        device.to_string_lossy().into_owned(),
        "-p".to_string(),
        "0x2".to_string(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    args
}

pub fn read_control_page(runner: &dyn SesRunner, device: &Path) -> Result<ControlPage> {
    let out = runner.query(&page_args(device, &["--raw"]))?;
    ControlPage::parse(&out)
}

pub fn write_control_page(runner: &dyn SesRunner, device: &Path, page: &ControlPage) -> Result<()> {
    let out = runner.submit(&page_args(device, &["--control", "--data", "-"]), &page.to_hex())?;
    tracing::debug!("Fan control cmd output: {}", out.trim_end());
    Ok(())
}

/// Read page 0x2 and return it with every fan element set to `level`.
pub fn prepare_fan_speed_page(
    runner: &dyn SesRunner,
    device: &Path,
    fan_count: usize,
    level: SpeedLevel,
) -> Result<ControlPage> {
    let mut page = read_control_page(runner, device)?;
    page.set_fan_speeds(fan_count, level)?;
    Ok(page)
}

pub fn set_fan_speeds(
    runner: &dyn SesRunner,
    device: &Path,
    fan_count: usize,
    level: SpeedLevel,
) -> Result<ControlPage> {
    let page = prepare_fan_speed_page(runner, device, fan_count, level)?;
    write_control_page(runner, device, &page)?;
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sg_ses::MockSesRunner;
    use crate::test_utils::test_utils::{sample_control_page, sample_control_page_text};
    use std::path::PathBuf;

    #[test]
    fn test_speed_level_bounds() {
        assert!(SpeedLevel::new(0).is_err());
        assert_eq!(SpeedLevel::new(1).unwrap().get(), 1);
        assert_eq!(SpeedLevel::new(7).unwrap().get(), 7);
        assert!(matches!(SpeedLevel::new(8), Err(SesError::InvalidSpeedLevel(8))));
        assert!(SpeedLevel::try_from(4u8).is_ok());
    }

    #[test]
    fn test_speed_level_control_byte() {
        assert_eq!(SpeedLevel::new(1).unwrap().control_byte(), 0x21);
        assert_eq!(SpeedLevel::new(7).unwrap().control_byte(), 0x27);
    }

    #[test]
    fn test_parse_raw_output() {
        let page = ControlPage::parse(" 02 00 00 70  00 00 00 00\n 11 00\n").unwrap();
        assert_eq!(page.as_bytes(), &[0x02, 0x00, 0x00, 0x70, 0, 0, 0, 0, 0x11, 0x00]);
    }

    #[test]
    fn test_parse_rejects_bad_token() {
        match ControlPage::parse("02 00 zz 01") {
            Err(SesError::InvalidHexByte { offset, token }) => {
                assert_eq!(offset, 2);
                assert_eq!(token, "zz");
            }
            other => panic!("expected InvalidHexByte, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_output() {
        let page = ControlPage::parse("   \n").unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_set_fan_speeds_patches_cooling_elements() {
        let mut page = sample_control_page();
        let before = page.clone();
        page.set_fan_speeds(6, SpeedLevel::new(3).unwrap()).unwrap();

        for fan in 0..6 {
            let idx = COOLING_ELEMENT_OFFSET + ELEMENT_LEN * fan;
            assert_eq!(&page.as_bytes()[idx..idx + 4], &[0x80, 0x00, 0x00, 0x23]);
        }
        // Everything outside the cooling elements is untouched
        assert_eq!(&page.as_bytes()[..88], &before.as_bytes()[..88]);
        assert_eq!(&page.as_bytes()[112..], &before.as_bytes()[112..]);
    }

    #[test]
    fn test_set_fan_speeds_short_page() {
        let mut page = ControlPage::from_bytes(vec![0u8; 100]);
        let err = page.set_fan_speeds(6, SpeedLevel::new(2).unwrap()).unwrap_err();
        assert!(matches!(err, SesError::ControlPageTooShort { len: 100, required: 112 }));
        assert!(page.as_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_set_fan_speeds_exact_length() {
        let mut page = ControlPage::from_bytes(vec![0u8; 112]);
        page.set_fan_speeds(6, SpeedLevel::new(7).unwrap()).unwrap();
        assert_eq!(&page.as_bytes()[108..], &[0x80, 0x00, 0x00, 0x27]);
    }

    #[test]
    fn test_to_hex_layout() {
        let page = ControlPage::from_bytes((0u8..18).collect());
        assert_eq!(
            page.to_hex(),
            "00 01 02 03 04 05 06 07  08 09 0a 0b 0c 0d 0e 0f\n10 11\n"
        );
    }

    #[test]
    fn test_to_hex_empty() {
        assert_eq!(ControlPage::from_bytes(Vec::new()).to_hex(), "\n");
    }

    #[test]
    fn test_hex_text_parses_back() {
        let page = sample_control_page();
        assert_eq!(ControlPage::parse(&page.to_hex()).unwrap(), page);
    }

    #[test]
    fn test_set_fan_speeds_reads_then_writes() {
        let device = PathBuf::from("/dev/sg4");
        let mut runner = MockSesRunner::new();
        runner
            .expect_query()
            .withf(|args: &[String]| args == ["/dev/sg4", "-p", "0x2", "--raw"])
            .times(1)
            .returning(|_| Ok(sample_control_page_text()));
        runner
            .expect_submit()
            .withf(|args: &[String], input: &str| {
                args == ["/dev/sg4", "-p", "0x2", "--control", "--data", "-"]
                    && input.ends_with('\n')
                    && ControlPage::parse(input)
                        .map(|p| p.as_bytes()[88..92] == [0x80, 0x00, 0x00, 0x25])
                        .unwrap_or(false)
            })
            .times(1)
            .returning(|_, _| Ok(String::new()));

        let page = set_fan_speeds(&runner, &device, 6, SpeedLevel::new(5).unwrap()).unwrap();
        assert_eq!(page.as_bytes()[111], 0x25);
    }

    #[test]
    fn test_prepare_does_not_write() {
        let device = PathBuf::from("/dev/sg4");
        let mut runner = MockSesRunner::new();
        runner
            .expect_query()
            .times(1)
            .returning(|_| Ok(sample_control_page_text()));
        runner.expect_submit().never();

        let page = prepare_fan_speed_page(&runner, &device, 6, SpeedLevel::new(1).unwrap()).unwrap();
        assert_eq!(page.as_bytes()[91], 0x21);
    }

    #[test]
    fn test_short_page_is_never_written() {
        let device = PathBuf::from("/dev/sg4");
        let mut runner = MockSesRunner::new();
        runner
            .expect_query()
            .returning(|_| Ok("02 00 00 10\n".to_string()));
        runner.expect_submit().never();

        let err = set_fan_speeds(&runner, &device, 6, SpeedLevel::new(1).unwrap()).unwrap_err();
        assert!(matches!(err, SesError::ControlPageTooShort { .. }));
    }
}
