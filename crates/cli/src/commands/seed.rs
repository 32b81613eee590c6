//! Seed taxonomy reference data from YAML.
//!
//! ```yaml
//! categories:
//!   - name: Women
//!     description: Kurtas, sets and dresses
//!     sub_categories: [Kurtas, Co-ord Sets]
//! tags: [cotton, festive]
//! colours:
//!   - { name: Indigo, hex: "#3f51b5" }
//! materials: [Cotton, Linen]
//! ```
//!
//! Seeding is idempotent: rows that already exist are skipped.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use strives_core::{CategoryId, Slug};
use strives_db::{AttributeRepository, CategoryRepository, RepositoryError};

use super::ConnectError;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid name {0:?}: must contain a letter or digit")]
    InvalidName(String),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TaxonomySeed {
    pub categories: Vec<CategorySeed>,
    pub tags: Vec<String>,
    pub colours: Vec<ColourSeed>,
    pub materials: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub sub_categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ColourSeed {
    pub name: String,
    pub hex: Option<String>,
}

#[derive(Debug, Default)]
struct SeedSummary {
    inserted: usize,
    skipped: usize,
}

impl SeedSummary {
    /// Count one insert attempt. Conflicts are expected on re-runs.
    fn record<T>(&mut self, result: Result<T, RepositoryError>) -> Result<Option<T>, SeedError> {
        match result {
            Ok(row) => {
                self.inserted += 1;
                Ok(Some(row))
            }
            Err(RepositoryError::Conflict(_)) => {
                self.skipped += 1;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn slug(name: &str) -> Result<Slug, SeedError> {
    Slug::parse(name).map_err(|_| SeedError::InvalidName(name.to_owned()))
}

/// Parse a seed file without touching the database.
fn parse(content: &str) -> Result<TaxonomySeed, SeedError> {
    let seed: TaxonomySeed = serde_yaml::from_str(content)?;
    // Reject bad names before anything is written.
    for category in &seed.categories {
        slug(&category.name)?;
        for sub in &category.sub_categories {
            slug(sub)?;
        }
    }
    for tag in &seed.tags {
        slug(tag)?;
    }
    Ok(seed)
}

/// Seed categories, sub-categories, tags, colours and materials.
pub async fn taxonomy(file_path: &str) -> Result<(), SeedError> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::FileNotFound(file_path.to_owned()));
    }

    tracing::info!(path = %file_path, "Loading taxonomy from file");
    let content = tokio::fs::read_to_string(path).await?;
    let seed = parse(&content)?;
    tracing::info!(
        categories = seed.categories.len(),
        tags = seed.tags.len(),
        colours = seed.colours.len(),
        materials = seed.materials.len(),
        "Parsed seed file"
    );

    let pool = super::connect().await?;
    let categories = CategoryRepository::new(&pool);
    let attributes = AttributeRepository::new(&pool);
    let mut summary = SeedSummary::default();

    let existing = categories.list().await?;
    for category in &seed.categories {
        let name = category.name.trim();
        let category_slug = slug(name)?;
        let created = summary.record(
            categories
                .create(name, &category_slug, category.description.as_deref())
                .await,
        )?;
        let category_id: Option<CategoryId> = created.map(|c| c.id).or_else(|| {
            existing
                .iter()
                .find(|c| c.slug == category_slug)
                .map(|c| c.id)
        });
        let Some(category_id) = category_id else {
            tracing::warn!(category = %name, "category exists under another slug, sub-categories skipped");
            continue;
        };

        for sub in &category.sub_categories {
            let sub = sub.trim();
            summary.record(
                categories
                    .create_sub_category(category_id, sub, &slug(sub)?)
                    .await,
            )?;
        }
    }

    for tag in &seed.tags {
        summary.record(attributes.create_tag(&slug(tag)?).await)?;
    }
    for colour in &seed.colours {
        summary.record(
            attributes
                .create_colour(colour.name.trim(), colour.hex.as_deref())
                .await,
        )?;
    }
    for material in &seed.materials {
        summary.record(attributes.create_material(material.trim()).await)?;
    }

    tracing::info!("Seeding complete!");
    tracing::info!("  Rows inserted: {}", summary.inserted);
    tracing::info!("  Rows skipped (already exist): {}", summary.skipped);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let seed = parse(
            r##"
categories:
  - name: Women
    description: Kurtas and sets
    sub_categories: [Kurtas, Co-ord Sets]
  - name: Men
tags: [cotton, Festive Wear]
colours:
  - { name: Indigo, hex: "#3f51b5" }
  - { name: Ivory }
materials: [Cotton]
"##,
        )
        .unwrap();
        assert_eq!(seed.categories.len(), 2);
        assert_eq!(seed.categories[1].sub_categories.len(), 0);
        assert_eq!(seed.colours[1].hex, None);
        assert_eq!(seed.tags[1], "Festive Wear");
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let seed = parse("tags: [linen]\n").unwrap();
        assert!(seed.categories.is_empty());
        assert!(seed.materials.is_empty());
    }

    #[test]
    fn test_unusable_name_is_rejected() {
        let result = parse("tags: ['***']\n");
        assert!(matches!(result, Err(SeedError::InvalidName(_))));
    }

    #[test]
    fn test_conflicts_are_skipped() {
        let mut summary = SeedSummary::default();
        assert!(summary.record(Ok(1)).unwrap().is_some());
        assert!(
            summary
                .record::<i32>(Err(RepositoryError::Conflict("tag".to_owned())))
                .unwrap()
                .is_none()
        );
        assert_eq!((summary.inserted, summary.skipped), (1, 1));
    }
}
