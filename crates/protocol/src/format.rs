//! Presentation helpers shared by every front-end.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::constants::{INCOMING_PATH, MAX_DEVICE_NAME_LEN};

/// Characters left untouched by a URI component encoder.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encodes a single query value.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Builds `<origin>/incoming?id=<transferId>&token=<token>`.
pub fn transfer_url(origin: &str, transfer_id: &str, token: &str) -> String {
    format!(
        "{}{INCOMING_PATH}?id={}&token={}",
        origin.trim_end_matches('/'),
        encode_component(transfer_id),
        encode_component(token),
    )
}

/// Renders a byte count as megabytes with two decimals, e.g. `"1.50 MB"`.
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Errors from device-name validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("device name cannot be empty")]
    Empty,
}

/// Trims a display name and caps it at the server's length limit.
pub fn normalize_device_name(name: &str) -> Result<String, NameError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(NameError::Empty);
    }
    Ok(trimmed.chars().take(MAX_DEVICE_NAME_LEN).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn megabytes_two_decimals() {
        assert_eq!(format_megabytes(1572864), "1.50 MB");
        assert_eq!(format_megabytes(0), "0.00 MB");
        assert_eq!(format_megabytes(1024 * 1024 * 10), "10.00 MB");
        assert_eq!(format_megabytes(5000), "0.00 MB");
    }

    #[test]
    fn transfer_url_encodes_components() {
        let url = transfer_url("http://192.168.1.4:8080", "abc123", "a b/c");
        assert_eq!(
            url,
            "http://192.168.1.4:8080/incoming?id=abc123&token=a%20b%2Fc"
        );
    }

    #[test]
    fn transfer_url_trims_trailing_slash() {
        let url = transfer_url("http://host/", "t", "k");
        assert_eq!(url, "http://host/incoming?id=t&token=k");
    }

    #[test]
    fn component_keeps_unreserved_marks() {
        assert_eq!(encode_component("a-b_c.d!e~f*g'h(i)"), "a-b_c.d!e~f*g'h(i)");
        assert_eq!(encode_component("x=y&z"), "x%3Dy%26z");
    }

    #[test]
    fn name_is_trimmed() {
        assert_eq!(normalize_device_name("  Kitchen iPad ").unwrap(), "Kitchen iPad");
    }

    #[test]
    fn empty_name_rejected() {
        assert_eq!(normalize_device_name("   "), Err(NameError::Empty));
        assert_eq!(normalize_device_name(""), Err(NameError::Empty));
    }

    #[test]
    fn long_name_capped() {
        let long = "é".repeat(60);
        let name = normalize_device_name(&long).unwrap();
        assert_eq!(name.chars().count(), MAX_DEVICE_NAME_LEN);
    }
}
