//! Indian mobile numbers in E.164 form.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    #[error("phone number cannot be empty")]
    Empty,
    #[error("phone number may only contain digits")]
    InvalidCharacter,
    #[error("phone number must have 10 digits after the country code")]
    InvalidLength,
}

/// A phone number with an explicit country code.
///
/// Numbers without a `+` prefix are treated as Indian and prefixed with `+91`,
/// matching what SMS delivery expects. Spaces, dashes and parentheses are
/// dropped.
///
/// ```
/// use strives_core::Phone;
///
/// assert_eq!(Phone::parse("98765 43210").unwrap().as_str(), "+919876543210");
/// assert_eq!(Phone::parse("+91-98765-43210").unwrap().as_str(), "+919876543210");
/// assert!(Phone::parse("12345").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Default country code applied to bare numbers.
    pub const DEFAULT_COUNTRY_CODE: &'static str = "+91";

    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains anything other than
    /// digits and separators, or is not a 10-digit number (optionally
    /// preceded by `+91`, `91` or `0`).
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let compact: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
            .collect();
        if compact.is_empty() {
            return Err(PhoneError::Empty);
        }

        let (has_plus, digits) = compact
            .strip_prefix('+')
            .map_or((false, compact.as_str()), |rest| (true, rest));
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(PhoneError::InvalidCharacter);
        }

        let national = match (has_plus, digits.len()) {
            (false, 10) => Some(digits),
            (false, 11) => digits.strip_prefix('0'),
            (_, 12) => digits.strip_prefix("91"),
            _ => None,
        }
        .ok_or(PhoneError::InvalidLength)?;

        Ok(Self(format!("{}{national}", Self::DEFAULT_COUNTRY_CODE)))
    }

    /// Returns the number in E.164 form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Phone` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Phone {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl_text_sqlx!(Phone);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_number_gets_country_code() {
        assert_eq!(Phone::parse("9876543210").unwrap().as_str(), "+919876543210");
    }

    #[test]
    fn test_existing_prefix_is_kept_once() {
        assert_eq!(Phone::parse("+919876543210").unwrap().as_str(), "+919876543210");
        assert_eq!(Phone::parse("919876543210").unwrap().as_str(), "+919876543210");
        assert_eq!(Phone::parse("09876543210").unwrap().as_str(), "+919876543210");
    }

    #[test]
    fn test_separators_are_ignored() {
        assert_eq!(
            Phone::parse("(+91) 98765-43210").unwrap().as_str(),
            "+919876543210"
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(Phone::parse(""), Err(PhoneError::Empty));
        assert_eq!(Phone::parse("98765abcde"), Err(PhoneError::InvalidCharacter));
        assert_eq!(Phone::parse("+"), Err(PhoneError::InvalidCharacter));
        assert_eq!(Phone::parse("12345"), Err(PhoneError::InvalidLength));
        assert_eq!(Phone::parse("+449876543210"), Err(PhoneError::InvalidLength));
    }
}
