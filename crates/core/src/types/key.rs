//! Store keys.
//!
//! The Realtime Database forbids `.`, `#`, `$`, `[`, `]` and `/` in keys and
//! rejects ASCII control characters. Emails routinely contain dots, so they
//! cannot be used as keys directly.
//!
//! [`StorageKey`] percent-encodes those characters (and `%` itself). Escaping
//! the escape character keeps the mapping injective: two distinct emails can
//! never share a key, so one user's pending registration can never overwrite
//! another's.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Maximum key length accepted by the store, in bytes.
pub const MAX_KEY_LENGTH: usize = 768;

/// Characters the store does not accept inside a key.
const FORBIDDEN: &[char] = &['.', '#', '$', '[', ']', '/'];

/// Errors that can occur when accepting an externally supplied key.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageKeyError {
    /// The key is empty.
    #[error("key cannot be empty")]
    Empty,
    /// The key is longer than the store allows.
    #[error("key must be at most {max} bytes")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The key contains a character the store forbids.
    #[error("key contains forbidden character {0:?}")]
    ForbiddenCharacter(char),
}

fn needs_escape(c: char) -> bool {
    c == '%' || c.is_ascii_control() || FORBIDDEN.contains(&c)
}

/// Check that `s` can be used verbatim as a single store key segment.
fn validate_segment(s: &str) -> Result<(), StorageKeyError> {
    if s.is_empty() {
        return Err(StorageKeyError::Empty);
    }
    if s.len() > MAX_KEY_LENGTH {
        return Err(StorageKeyError::TooLong {
            max: MAX_KEY_LENGTH,
        });
    }
    if let Some(c) = s
        .chars()
        .find(|c| c.is_ascii_control() || FORBIDDEN.contains(c))
    {
        return Err(StorageKeyError::ForbiddenCharacter(c));
    }
    Ok(())
}

/// A collision-safe store key derived from an email address.
///
/// ```
/// use salon_core::StorageKey;
///
/// let dotted = StorageKey::from_email("a.b@x.com");
/// let underscored = StorageKey::from_email("a_b@x.com");
///
/// assert_eq!(dotted.as_str(), "a%2Eb@x%2Ecom");
/// assert_ne!(dotted, underscored);
/// assert_eq!(dotted.decode(), "a.b@x.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    /// Encode an arbitrary string into a key.
    ///
    /// Total and deterministic. Every forbidden character, every ASCII control
    /// character and `%` become `%XX` (uppercase hex); everything else is kept.
    #[must_use]
    pub fn from_email(raw: &str) -> Self {
        let mut key = String::with_capacity(raw.len());
        for c in raw.chars() {
            if needs_escape(c) {
                // All escaped characters are ASCII, so one byte each.
                key.push_str(&format!("%{:02X}", c as u32));
            } else {
                key.push(c);
            }
        }
        Self(key)
    }

    /// Reverse [`StorageKey::from_email`].
    ///
    /// Keys that were not produced by `from_email` (for example records
    /// written by hand) are decoded leniently: malformed escapes are kept as-is.
    #[must_use]
    pub fn decode(&self) -> String {
        let mut out = String::with_capacity(self.0.len());
        let mut rest = self.0.as_str();
        while let Some(pos) = rest.find('%') {
            out.push_str(rest.get(..pos).unwrap_or_default());
            let escape = rest.get(pos + 1..pos + 3);
            match escape.and_then(|hex| u8::from_str_radix(hex, 16).ok()) {
                Some(byte) if byte.is_ascii() => {
                    out.push(char::from(byte));
                    rest = rest.get(pos + 3..).unwrap_or_default();
                }
                _ => {
                    out.push('%');
                    rest = rest.get(pos + 1..).unwrap_or_default();
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Wrap a key read back from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid store key.
    pub fn from_stored(s: &str) -> Result<Self, StorageKeyError> {
        validate_segment(s)?;
        Ok(Self(s.to_owned()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Macro to define a type-safe store key wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `parse()` that rejects strings the store would not accept as a key
/// - `as_str()` and `Display`
///
/// # Example
///
/// ```rust
/// # use salon_core::define_key;
/// define_key!(InvoiceKey);
///
/// assert!(InvoiceKey::parse("-NxA1b2").is_ok());
/// assert!(InvoiceKey::parse("../Admin").is_err());
/// ```
#[macro_export]
macro_rules! define_key {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Accept a key from an untrusted source (path parameter, CLI argument).
            ///
            /// # Errors
            ///
            /// Returns an error if the string is empty, too long, or contains
            /// characters the store forbids in keys.
            pub fn parse(s: &str) -> ::core::result::Result<Self, $crate::StorageKeyError> {
                let key = $crate::StorageKey::from_stored(s)?;
                Ok(Self(key.as_str().to_owned()))
            }

            /// Get the key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

// Auto-generated (push) keys
define_key!(ApprovalKey);
define_key!(AccountKey);

impl From<ApprovalKey> for AccountKey {
    /// Accepted registrations keep their approval key as account key.
    fn from(key: ApprovalKey) -> Self {
        Self(key.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted_and_underscored_emails_do_not_collide() {
        let a = StorageKey::from_email("a.b@x.com");
        let b = StorageKey::from_email("a_b@x.com");
        assert_ne!(a, b);
    }

    #[test]
    fn test_escape_character_is_escaped() {
        // Without escaping '%', "a%2Eb" and "a.b" would collide.
        let literal = StorageKey::from_email("a%2Eb@x.com");
        let dotted = StorageKey::from_email("a.b@x.com");
        assert_ne!(literal, dotted);
        assert_eq!(literal.as_str(), "a%252Eb@x%2Ecom");
    }

    #[test]
    fn test_every_forbidden_character_is_encoded() {
        let key = StorageKey::from_email("a.b#c$d[e]f/g@x.com");
        assert_eq!(key.as_str(), "a%2Eb%23c%24d%5Be%5Df%2Fg@x%2Ecom");
        assert!(StorageKey::from_stored(key.as_str()).is_ok());
    }

    #[test]
    fn test_control_characters_are_encoded() {
        let key = StorageKey::from_email("a\nb@x.com");
        assert_eq!(key.as_str(), "a%0Ab@x%2Ecom");
    }

    #[test]
    fn test_non_ascii_is_kept() {
        let key = StorageKey::from_email("josé@correo.es");
        assert_eq!(key.as_str(), "josé@correo%2Ees");
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(
            StorageKey::from_email("bob@gmail.com"),
            StorageKey::from_email("bob@gmail.com")
        );
    }

    #[test]
    fn test_decode_reverses_encoding() {
        for raw in [
            "bob@gmail.com",
            "a%2Eb@x.com",
            "weird#$[]/@x.com",
            "100%@x.com",
            "",
        ] {
            assert_eq!(StorageKey::from_email(raw).decode(), raw);
        }
    }

    #[test]
    fn test_decode_is_lenient_with_malformed_escapes() {
        let key = StorageKey::from_stored("50%off").unwrap();
        assert_eq!(key.decode(), "50%off");
    }

    #[test]
    fn test_from_stored_rejects_forbidden() {
        assert_eq!(StorageKey::from_stored(""), Err(StorageKeyError::Empty));
        assert_eq!(
            StorageKey::from_stored("a.b"),
            Err(StorageKeyError::ForbiddenCharacter('.'))
        );
        assert!(matches!(
            StorageKey::from_stored(&"k".repeat(MAX_KEY_LENGTH + 1)),
            Err(StorageKeyError::TooLong { .. })
        ));
    }

    #[test]
    fn test_push_key_parse() {
        let key = ApprovalKey::parse("-NxQ9v3kLm2").unwrap();
        assert_eq!(key.as_str(), "-NxQ9v3kLm2");
        assert!(ApprovalKey::parse("Admin/-Nx").is_err());
        assert!(AccountKey::parse("").is_err());
    }

    #[test]
    fn test_approval_key_becomes_account_key() {
        let approval = ApprovalKey::parse("-NxQ9v3kLm2").unwrap();
        let account: AccountKey = approval.into();
        assert_eq!(account.as_str(), "-NxQ9v3kLm2");
    }
}
