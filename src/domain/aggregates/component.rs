//! Bouquet building blocks served by the component catalog.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use super::product::UnknownVariant;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Flower,
    Greenery,
    Packaging,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Flower => "flower", Self::Greenery => "greenery", Self::Packaging => "packaging" }
    }
}

impl FromStr for ComponentKind {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flower" => Ok(Self::Flower),
            "greenery" => Ok(Self::Greenery),
            "packaging" => Ok(Self::Packaging),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BouquetComponent {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    /// Coarse color hint, e.g. `"red"`; feeds the palette resolver.
    #[serde(default)]
    pub color: Option<String>,
}

fn active_by_default() -> bool { true }

impl BouquetComponent {
    pub fn new(id: i64, kind: ComponentKind, name: impl Into<String>, price: Decimal) -> Self {
        Self { id, kind, name: name.into(), price, image: None, description: None, is_active: true, color: None }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}
