//! Value Objects for the storefront

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Server-assigned catalog product id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Identity supplied by the auth collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Synthetic id of a custom composition, `custom-<uuid>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositionId(String);

impl CompositionId {
    pub const PREFIX: &'static str = "custom-";

    pub fn generate() -> Self { Self(format!("{}{}", Self::PREFIX, Uuid::new_v4())) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for CompositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Key of a cart line: catalog lines are keyed by product, custom lines by composition.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LineId {
    Product(ProductId),
    Custom(CompositionId),
}

impl From<ProductId> for LineId {
    fn from(id: ProductId) -> Self { Self::Product(id) }
}

impl From<CompositionId> for LineId {
    fn from(id: CompositionId) -> Self { Self::Custom(id) }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Product(id) => write!(f, "{id}"), Self::Custom(id) => write!(f, "{id}") }
    }
}

/// Quantity value object
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);
    /// Largest quantity the cart endpoints accept for a single line.
    pub const MAX_PER_LINE: u32 = 10_000;

    pub fn new(value: u32) -> Self { Self(value) }
    /// Interprets a signed request value; anything at or below zero is `None`.
    /// Values beyond `u32` saturate rather than reading as a removal.
    pub fn positive(value: i64) -> Option<Self> {
        if value <= 0 {
            return None;
        }
        Some(Self(u32::try_from(value).unwrap_or(u32::MAX)))
    }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: u32) -> Self { Self(self.0.saturating_add(other)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_composition_ids_are_unique() {
        let a = CompositionId::generate();
        let b = CompositionId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("custom-"));
    }
    #[test]
    fn test_quantity_positive() {
        assert_eq!(Quantity::positive(3), Some(Quantity::new(3)));
        assert_eq!(Quantity::positive(0), None);
        assert_eq!(Quantity::positive(-5), None);
    }
    #[test]
    fn test_quantity_positive_saturates_large_values() {
        assert_eq!(Quantity::positive(5_000_000_000), Some(Quantity::new(u32::MAX)));
        assert_eq!(Quantity::positive(i64::MAX), Some(Quantity::new(u32::MAX)));
    }
}
