//! One-time verification codes.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a string is not a six-digit code.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("verification code must be exactly {len} digits", len = OtpCode::LENGTH)]
pub struct OtpCodeError;

/// A six-digit one-time verification code, leading digit never zero.
///
/// Codes are stored and compared as strings.
///
/// ```
/// use salon_core::OtpCode;
///
/// let code = OtpCode::parse("482913").unwrap();
/// assert!(code.matches(" 482913 "));
/// assert!(!code.matches("482914"));
/// assert!(OtpCode::parse("48291").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OtpCode(String);

impl OtpCode {
    /// Number of digits in a code.
    pub const LENGTH: usize = 6;

    /// Smallest generated code.
    pub const MIN: u32 = 100_000;

    /// One past the largest generated code.
    pub const MAX_EXCLUSIVE: u32 = 1_000_000;

    /// Build a code from a number in `MIN..MAX_EXCLUSIVE`.
    ///
    /// # Errors
    ///
    /// Returns an error if the number does not have exactly six digits.
    pub fn from_number(n: u32) -> Result<Self, OtpCodeError> {
        if (Self::MIN..Self::MAX_EXCLUSIVE).contains(&n) {
            Ok(Self(n.to_string()))
        } else {
            Err(OtpCodeError)
        }
    }

    /// Parse a code typed by a user. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is not six ASCII digits.
    pub fn parse(s: &str) -> Result<Self, OtpCodeError> {
        let s = s.trim();
        if s.len() == Self::LENGTH && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_owned()))
        } else {
            Err(OtpCodeError)
        }
    }

    /// Whether a submitted code equals this one after trimming whitespace.
    #[must_use]
    pub fn matches(&self, submitted: &str) -> bool {
        self.0 == submitted.trim()
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_number_bounds() {
        assert_eq!(OtpCode::from_number(100_000).unwrap().as_str(), "100000");
        assert_eq!(OtpCode::from_number(999_999).unwrap().as_str(), "999999");
        assert!(OtpCode::from_number(99_999).is_err());
        assert!(OtpCode::from_number(1_000_000).is_err());
    }

    #[test]
    fn test_parse_rejects_non_digits() {
        assert!(OtpCode::parse("12a456").is_err());
        assert!(OtpCode::parse("1234567").is_err());
        assert!(OtpCode::parse("").is_err());
    }

    #[test]
    fn test_matches_trims_submission() {
        let code = OtpCode::parse("123456").unwrap();
        assert!(code.matches("123456"));
        assert!(code.matches("\t123456\n"));
        assert!(!code.matches("12345 6"));
        assert!(!code.matches(""));
    }
}
