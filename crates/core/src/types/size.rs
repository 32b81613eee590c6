//! Garment sizes as carried on products, cart lines and order items.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SizeError {
    #[error("size must be at most {max} characters")]
    TooLong { max: usize },
    #[error("size may only contain letters and digits")]
    InvalidCharacter,
}

/// A size code such as `S`, `XL`, `32` or `C` (custom tailoring).
///
/// Codes are upper-cased. Lines added without a size use [`Size::FREE`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Size(String);

impl Size {
    pub const MAX_LENGTH: usize = 8;

    /// Code used for one-size products and lines submitted without a size.
    pub const FREE: &'static str = "FREE";

    /// Code meaning the garment is tailored to the customer's measurements.
    pub const CUSTOM: &'static str = "C";

    /// Parse a size code. An empty input yields [`Size::free`].
    ///
    /// # Errors
    ///
    /// Returns an error for codes that are too long or contain anything
    /// other than ASCII letters and digits.
    pub fn parse(s: &str) -> Result<Self, SizeError> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::free());
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SizeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SizeError::InvalidCharacter);
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    /// Parse an optional size, defaulting to [`Size::free`].
    ///
    /// # Errors
    ///
    /// See [`Size::parse`].
    pub fn parse_optional(s: Option<&str>) -> Result<Self, SizeError> {
        s.map_or_else(|| Ok(Self::free()), Self::parse)
    }

    #[must_use]
    pub fn free() -> Self {
        Self(Self::FREE.to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable label used in customer messages.
    #[must_use]
    pub fn label(&self) -> &str {
        match self.0.as_str() {
            Self::CUSTOM => "Custom",
            Self::FREE => "Free Size",
            other => other,
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl_text_sqlx!(Size);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uppercases() {
        assert_eq!(Size::parse(" xl ").unwrap().as_str(), "XL");
        assert_eq!(Size::parse("32").unwrap().as_str(), "32");
    }

    #[test]
    fn test_missing_size_is_free() {
        assert_eq!(Size::parse("").unwrap(), Size::free());
        assert_eq!(Size::parse_optional(None).unwrap(), Size::free());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Size::parse("c").unwrap().label(), "Custom");
        assert_eq!(Size::free().label(), "Free Size");
        assert_eq!(Size::parse("M").unwrap().label(), "M");
    }

    #[test]
    fn test_rejects_bad_codes() {
        assert_eq!(Size::parse("X L"), Err(SizeError::InvalidCharacter));
        assert!(matches!(Size::parse("XXXXXXXXXL"), Err(SizeError::TooLong { .. })));
    }
}
