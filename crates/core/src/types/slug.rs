//! URL slugs for catalog entities, tags and coupon codes.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    #[error("value must contain at least one letter or digit")]
    Empty,
}

/// Lower-case `input`, keep ASCII letters and digits, and collapse every
/// other run of characters into a single `-`.
///
/// ```
/// use strives_core::slugify;
///
/// assert_eq!(slugify("  Summer Sale 2024! "), "summer-sale-2024");
/// assert_eq!(slugify("Kurta & Sets"), "kurta-sets");
/// ```
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// A non-empty slug produced by [`slugify`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Slugify `input`.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::Empty`] if nothing alphanumeric is left.
    pub fn parse(input: &str) -> Result<Self, SlugError> {
        let slug = slugify(input);
        if slug.is_empty() {
            return Err(SlugError::Empty);
        }
        Ok(Self(slug))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl_text_sqlx!(Slug);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("Cotton   Blend"), "cotton-blend");
        assert_eq!(slugify("--A--B--"), "a-b");
        assert_eq!(slugify("FLAT50"), "flat50");
    }

    #[test]
    fn test_slugify_drops_non_ascii() {
        assert_eq!(slugify("Café Noir"), "caf-noir");
    }

    #[test]
    fn test_parse_rejects_empty_result() {
        assert_eq!(Slug::parse("  !!  "), Err(SlugError::Empty));
        assert_eq!(Slug::parse("New Arrivals").unwrap().as_str(), "new-arrivals");
    }
}
