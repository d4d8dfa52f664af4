//! Audible activation bytes.

use std::fmt;

use super::error::ValidationError;

/// Number of hex digits in a set of activation bytes (4 bytes).
const ACTIVATION_HEX_LEN: usize = 8;

/// Normalised activation credential for AAX decryption.
///
/// Accepts the forms users usually paste (`1A2B3C4D`, `1a-2b-3c-4d`,
/// `1a 2b 3c 4d`) and stores the 8 lowercase hex digits ffmpeg expects.
/// `Debug` and `Display` only reveal the first byte.
#[derive(Clone, PartialEq, Eq)]
pub struct ActivationBytes(String);

impl ActivationBytes {
    /// Parses and normalises user input.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let cleaned: String = raw
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();

        if cleaned.is_empty() {
            return Err(ValidationError::MissingActivationBytes);
        }

        if cleaned.len() != ACTIVATION_HEX_LEN || !cleaned.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidActivationBytes);
        }

        Ok(Self(cleaned))
    }

    /// The normalised hex string, as passed to `ffmpeg -activation_bytes`.
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    fn redacted(&self) -> String {
        format!("{}******", &self.0[..2])
    }
}

impl fmt::Debug for ActivationBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActivationBytes").field(&self.redacted()).finish()
    }
}

impl fmt::Display for ActivationBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        let bytes = ActivationBytes::parse("1a2b3c4d").unwrap();
        assert_eq!(bytes.as_hex(), "1a2b3c4d");
    }

    #[test]
    fn test_parse_normalises_separators_and_case() {
        let bytes = ActivationBytes::parse(" 1A-2B 3C-4D ").unwrap();
        assert_eq!(bytes.as_hex(), "1a2b3c4d");
    }

    #[test]
    fn test_parse_empty_is_missing() {
        assert_eq!(
            ActivationBytes::parse("  - ").unwrap_err(),
            ValidationError::MissingActivationBytes
        );
    }

    #[test]
    fn test_parse_wrong_length() {
        assert_eq!(
            ActivationBytes::parse("1a2b3c").unwrap_err(),
            ValidationError::InvalidActivationBytes
        );
        assert_eq!(
            ActivationBytes::parse("1a2b3c4d5e").unwrap_err(),
            ValidationError::InvalidActivationBytes
        );
    }

    #[test]
    fn test_parse_non_hex() {
        assert_eq!(
            ActivationBytes::parse("zzzzzzzz").unwrap_err(),
            ValidationError::InvalidActivationBytes
        );
    }

    #[test]
    fn test_debug_and_display_are_redacted() {
        let bytes = ActivationBytes::parse("deadbeef").unwrap();
        assert!(!format!("{:?}", bytes).contains("deadbeef"));
        assert_eq!(bytes.to_string(), "de******");
    }
}
