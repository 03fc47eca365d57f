/*
 * Test utilities and fixtures for sa120fan
 *
 * Canned sg_ses output and small constructors shared by the unit tests.
 */

#[cfg(test)]
pub mod test_utils {
    use std::path::PathBuf;

    use crate::control_page::ControlPage;
    use crate::discovery::{DeviceId, DeviceNode};
    use crate::error::SesError;

    /// First lines of `sg_ses --status` on an SA120.
    pub const SA120_STATUS: &str = "  LENOVO    ThinkServerSA120  1007
  Primary enclosure logical identifier (hex): 500605b0000272bf
Configuration diagnostic page:
  number of secondary subenclosures: 0
";

    pub fn node(path: &str, major: u32, minor: u32) -> DeviceNode {
        DeviceNode {
            path: PathBuf::from(path),
            id: DeviceId { major, minor },
        }
    }

    pub fn command_failed(stderr: &str) -> SesError {
        SesError::CommandFailed {
            command: "sg_ses".to_string(),
            code: Some(1),
            stderr: stderr.to_string(),
        }
    }

    /// A 136 byte control page with a recognisable value in every byte.
    pub fn sample_control_page() -> ControlPage {
        let mut bytes: Vec<u8> = (0..136u32).map(|i| (i * 7 % 251) as u8).collect();
        // page code 0x02, page length 132
        bytes[0] = 0x02;
        bytes[1] = 0x00;
        bytes[2] = 0x00;
        bytes[3] = 0x84;
        ControlPage::from_bytes(bytes)
    }

    /// `sample_control_page` as sg_ses --raw prints it.
    pub fn sample_control_page_text() -> String {
        sample_control_page().to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use crate::discovery::enclosure_name;

    #[test]
    fn test_sample_control_page_shape() {
        let page = sample_control_page();
        assert_eq!(page.len(), 136);
        assert_eq!(page.as_bytes()[0], 0x02);
        assert_eq!(sample_control_page_text().lines().count(), 9);
    }

    #[test]
    fn test_sa120_status_fixture() {
        assert_eq!(
            enclosure_name(SA120_STATUS).as_deref(),
            Some("LENOVO    ThinkServerSA120  1007")
        );
    }

    #[test]
    fn test_node_helper() {
        let n = node("/dev/sg1", 21, 1);
        assert_eq!(n.id.to_string(), "21,1");
    }
}
