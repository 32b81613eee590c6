//! Storefront product listing filters.
//!
//! Query parameters arrive as strings and are parsed here into a typed
//! [`ProductQuery`]. The database layer turns that into SQL.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::{CategoryId, MaterialId, Slug, slugify};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("'{param}' must be a number")]
    InvalidNumber { param: &'static str },
    #[error("'min' cannot be greater than 'max'")]
    InvertedRange,
    #[error("sort must look like 'field:1' or 'field:-1' with field one of sp, mrp, name, created_at, discount")]
    InvalidSort,
}

/// Raw query string of `GET /products`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilterParams {
    pub category: Option<String>,
    #[serde(rename = "sub-category")]
    pub sub_category: Option<String>,
    pub keyword: Option<String>,
    pub material: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    SellingPrice,
    Mrp,
    Name,
    CreatedAt,
    Discount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for ProductSort {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            direction: SortDirection::Descending,
        }
    }
}

impl std::str::FromStr for ProductSort {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, order) = s.trim().split_once(':').ok_or(QueryError::InvalidSort)?;
        let field = match field {
            "sp" => SortField::SellingPrice,
            "mrp" => SortField::Mrp,
            "name" => SortField::Name,
            "created_at" => SortField::CreatedAt,
            "discount" => SortField::Discount,
            _ => return Err(QueryError::InvalidSort),
        };
        let direction = match order {
            "1" => SortDirection::Ascending,
            "-1" => SortDirection::Descending,
            _ => return Err(QueryError::InvalidSort),
        };
        Ok(Self { field, direction })
    }
}

/// Validated product filters. Every present filter must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub category: Option<CategoryId>,
    pub sub_category: Option<Slug>,
    /// Every keyword must be one of the product's tags.
    pub keywords: Vec<String>,
    pub material: Option<MaterialId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: ProductSort,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_id(value: Option<&String>, param: &'static str) -> Result<Option<i32>, QueryError> {
    non_empty(value)
        .map(|v| v.parse().map_err(|_| QueryError::InvalidNumber { param }))
        .transpose()
}

fn parse_price(value: Option<&String>, param: &'static str) -> Result<Option<Decimal>, QueryError> {
    non_empty(value)
        .map(|v| {
            v.parse::<Decimal>()
                .map_err(|_| QueryError::InvalidNumber { param })
        })
        .transpose()
}

impl ProductQuery {
    /// Parse raw parameters. Empty values are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns an error for non-numeric ids or prices, `min > max`, or a
    /// malformed sort.
    pub fn parse(params: &ProductFilterParams) -> Result<Self, QueryError> {
        let min_price = parse_price(params.min.as_ref(), "min")?;
        let max_price = parse_price(params.max.as_ref(), "max")?;
        if let (Some(min), Some(max)) = (min_price, max_price)
            && min > max
        {
            return Err(QueryError::InvertedRange);
        }

        let keywords = non_empty(params.keyword.as_ref())
            .map(|k| {
                k.split_whitespace()
                    .map(slugify)
                    .filter(|w| !w.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            category: parse_id(params.category.as_ref(), "category")?.map(CategoryId::new),
            sub_category: non_empty(params.sub_category.as_ref()).and_then(|s| Slug::parse(s).ok()),
            keywords,
            material: parse_id(params.material.as_ref(), "material")?.map(MaterialId::new),
            min_price,
            max_price,
            sort: non_empty(params.sort.as_ref())
                .map(str::parse)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn params() -> ProductFilterParams {
        ProductFilterParams::default()
    }

    #[test]
    fn test_empty_query_lists_newest_first() {
        let query = ProductQuery::parse(&params()).unwrap();
        assert_eq!(query, ProductQuery::default());
        assert_eq!(query.sort.field, SortField::CreatedAt);
        assert_eq!(query.sort.direction, SortDirection::Descending);
    }

    #[test]
    fn test_full_query() {
        let raw = ProductFilterParams {
            category: Some("4".into()),
            sub_category: Some("Anarkali".into()),
            keyword: Some("  Red   COTTON ".into()),
            material: Some("2".into()),
            min: Some("500".into()),
            max: Some("2500.50".into()),
            sort: Some("sp:1".into()),
        };
        let query = ProductQuery::parse(&raw).unwrap();
        assert_eq!(query.category, Some(CategoryId::new(4)));
        assert_eq!(query.sub_category.unwrap().as_str(), "anarkali");
        assert_eq!(query.keywords, vec!["red", "cotton"]);
        assert_eq!(query.material, Some(MaterialId::new(2)));
        assert_eq!(query.min_price, Some(Decimal::new(500, 0)));
        assert_eq!(query.max_price, Some(Decimal::new(250_050, 2)));
        assert_eq!(
            query.sort,
            ProductSort {
                field: SortField::SellingPrice,
                direction: SortDirection::Ascending,
            }
        );
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let raw = ProductFilterParams {
            category: Some(String::new()),
            min: Some("  ".into()),
            ..params()
        };
        let query = ProductQuery::parse(&raw).unwrap();
        assert_eq!(query.category, None);
        assert_eq!(query.min_price, None);
    }

    #[test]
    fn test_invalid_numbers() {
        let raw = ProductFilterParams {
            max: Some("cheap".into()),
            ..params()
        };
        assert_eq!(
            ProductQuery::parse(&raw),
            Err(QueryError::InvalidNumber { param: "max" })
        );

        let raw = ProductFilterParams {
            category: Some("abc".into()),
            ..params()
        };
        assert_eq!(
            ProductQuery::parse(&raw),
            Err(QueryError::InvalidNumber { param: "category" })
        );
    }

    #[test]
    fn test_inverted_range() {
        let raw = ProductFilterParams {
            min: Some("900".into()),
            max: Some("100".into()),
            ..params()
        };
        assert_eq!(ProductQuery::parse(&raw), Err(QueryError::InvertedRange));
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!(
            "discount:-1".parse::<ProductSort>().unwrap().field,
            SortField::Discount
        );
        assert!("price:1".parse::<ProductSort>().is_err());
        assert!("sp:asc".parse::<ProductSort>().is_err());
        assert!("sp".parse::<ProductSort>().is_err());
    }
}
