//! Catalog Product Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::domain::value_objects::ProductId;
use crate::images::{parse_image_list, PLACEHOLDER_IMAGE};

/// A catalog SKU. Read-only from the storefront's point of view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub original_price: Option<Decimal>,
    /// First entry is the primary image.
    #[serde(default, deserialize_with = "deserialize_images")]
    pub images: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Category,
    #[serde(rename = "type", default)]
    pub product_type: ProductType,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub is_customizable: bool,
}

impl CatalogProduct {
    pub fn description_or_default(&self) -> &str {
        match self.description.as_deref() {
            Some(d) if !d.trim().is_empty() => d,
            _ => self.product_type.default_description(),
        }
    }

    pub fn primary_image(&self) -> &str {
        self.images.first().map(String::as_str).unwrap_or(PLACEHOLDER_IMAGE)
    }

    /// True when sold below the strikethrough reference price.
    pub fn is_discounted(&self) -> bool {
        self.original_price.is_some_and(|original| original > self.price)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

impl Default for Category {
    fn default() -> Self { Self { name: "Bouquets".to_string(), slug: None } }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    #[default]
    Bouquet,
    Plant,
    Composition,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Bouquet => "bouquet", Self::Plant => "plant", Self::Composition => "composition" }
    }

    pub fn default_description(&self) -> &'static str {
        match self {
            Self::Bouquet => "A beautiful bouquet for a special moment",
            Self::Plant => "A beautiful houseplant",
            Self::Composition => "A beautiful floral composition",
        }
    }
}

impl FromStr for ProductType {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bouquet" => Ok(Self::Bouquet),
            "plant" => Ok(Self::Plant),
            "composition" => Ok(Self::Composition),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Catalog listing served by `GET /products/{kind}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductListing {
    All,
    Bouquets,
    Plants,
    Compositions,
    Featured,
}

impl ProductListing {
    pub const FEATURED_LIMIT: i64 = 6;

    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Bouquets => "bouquets",
            Self::Plants => "plants",
            Self::Compositions => "compositions",
            Self::Featured => "featured",
        }
    }

    /// Product type the listing is restricted to, if any.
    pub fn product_type(&self) -> Option<ProductType> {
        match self {
            Self::Bouquets => Some(ProductType::Bouquet),
            Self::Plants => Some(ProductType::Plant),
            Self::Compositions => Some(ProductType::Composition),
            Self::All | Self::Featured => None,
        }
    }

    /// Used when a row carries no description of its own.
    pub fn fallback_description(&self) -> &'static str {
        match self.product_type() {
            Some(t) => t.default_description(),
            None if *self == Self::Featured => ProductType::Bouquet.default_description(),
            None => "A beautiful product",
        }
    }
}

impl FromStr for ProductListing {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "bouquets" => Ok(Self::Bouquets),
            "plants" => Ok(Self::Plants),
            "compositions" => Ok(Self::Compositions),
            "featured" => Ok(Self::Featured),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub struct UnknownVariant(pub String);
impl std::error::Error for UnknownVariant {}
impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Unknown value: {}", self.0) }
}

pub(crate) fn deserialize_images<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let raw = serde_json::Value::deserialize(d)?;
    Ok(parse_image_list(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_server_product() {
        let p: CatalogProduct = serde_json::from_value(json!({
            "id": 7, "name": "Peony cloud", "price": 3500, "original_price": 4200,
            "images": "[\"/img/peony.jpg\"]", "description": null,
            "category": {"name": "Bouquets", "slug": "bouquets"},
            "type": "bouquet", "in_stock": true, "is_customizable": false
        })).unwrap();
        assert_eq!(p.id, ProductId(7));
        assert_eq!(p.images, vec!["/img/peony.jpg"]);
        assert_eq!(p.description_or_default(), "A beautiful bouquet for a special moment");
        assert!(p.is_discounted());
    }

    #[test]
    fn test_minimal_product_defaults() {
        let p: CatalogProduct = serde_json::from_value(json!({"id": 1, "name": "Fern", "price": 900, "type": "plant"})).unwrap();
        assert_eq!(p.primary_image(), PLACEHOLDER_IMAGE);
        assert_eq!(p.category.name, "Bouquets");
        assert_eq!(p.description_or_default(), "A beautiful houseplant");
    }

    #[test]
    fn test_listing_parse() {
        assert_eq!("featured".parse::<ProductListing>().unwrap(), ProductListing::Featured);
        assert_eq!(ProductListing::Plants.product_type(), Some(ProductType::Plant));
        assert!("sale".parse::<ProductListing>().is_err());
    }
}
