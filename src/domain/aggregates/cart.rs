//! Cart Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use super::composition::CustomComposition;
use super::product::{deserialize_images, CatalogProduct, Category};
use crate::domain::value_objects::{LineId, ProductId, Quantity};
use crate::images::PLACEHOLDER_IMAGE;

/// A catalog product line; name, price and image are captured at add time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductLine {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub quantity: Quantity,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomLine {
    pub composition: CustomComposition,
    pub quantity: Quantity,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CartLine {
    Product(ProductLine),
    Custom(CustomLine),
}

impl CartLine {
    pub fn id(&self) -> LineId {
        match self {
            Self::Product(p) => LineId::Product(p.product_id),
            Self::Custom(c) => LineId::Custom(c.composition.id.clone()),
        }
    }

    pub fn name(&self) -> &str {
        match self { Self::Product(p) => &p.name, Self::Custom(c) => &c.composition.name }
    }

    pub fn image(&self) -> &str {
        match self {
            Self::Product(p) => p.image.as_deref().unwrap_or(PLACEHOLDER_IMAGE),
            Self::Custom(c) => &c.composition.image,
        }
    }

    pub fn price(&self) -> Decimal {
        match self { Self::Product(p) => p.price, Self::Custom(c) => c.composition.price }
    }

    pub fn quantity(&self) -> Quantity {
        match self { Self::Product(p) => p.quantity, Self::Custom(c) => c.quantity }
    }

    pub fn is_custom(&self) -> bool { matches!(self, Self::Custom(_)) }

    pub fn line_total(&self) -> Decimal { self.price() * Decimal::from(self.quantity().value()) }

    fn quantity_mut(&mut self) -> &mut Quantity {
        match self { Self::Product(p) => &mut p.quantity, Self::Custom(c) => &mut c.quantity }
    }
}

/// Minimal catalog reference needed to put a product in the cart.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
}

impl ProductSnapshot {
    pub fn new(id: ProductId, name: impl Into<String>, price: Decimal) -> Self {
        Self { id, name: name.into(), price, image: None }
    }
}

impl From<&CatalogProduct> for ProductSnapshot {
    fn from(p: &CatalogProduct) -> Self {
        Self { id: p.id, name: p.name.clone(), price: p.price, image: p.images.first().cloned() }
    }
}

/// Anything that can be put in the cart.
#[derive(Clone, Debug, PartialEq)]
pub enum Purchasable {
    Product(ProductSnapshot),
    Custom(CustomComposition),
}

impl Purchasable {
    pub fn is_custom(&self) -> bool { matches!(self, Self::Custom(_)) }

    pub fn line_id(&self) -> LineId {
        match self { Self::Product(p) => LineId::Product(p.id), Self::Custom(c) => LineId::Custom(c.id.clone()) }
    }

    fn into_line(self, quantity: Quantity) -> CartLine {
        match self {
            Self::Product(p) => CartLine::Product(ProductLine { product_id: p.id, name: p.name, price: p.price, image: p.image, quantity }),
            Self::Custom(composition) => CartLine::Custom(CustomLine { composition, quantity }),
        }
    }
}

impl From<ProductSnapshot> for Purchasable {
    fn from(p: ProductSnapshot) -> Self { Self::Product(p) }
}

impl From<&CatalogProduct> for Purchasable {
    fn from(p: &CatalogProduct) -> Self { Self::Product(p.into()) }
}

impl From<CustomComposition> for Purchasable {
    fn from(c: CustomComposition) -> Self { Self::Custom(c) }
}

/// Ordered cart lines with at most one line per [`LineId`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartLines(Vec<CartLine>);

impl CartLines {
    pub fn new(lines: Vec<CartLine>) -> Self { Self(lines) }

    pub fn lines(&self) -> &[CartLine] { &self.0 }
    pub fn into_lines(self) -> Vec<CartLine> { self.0 }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn get(&self, id: &LineId) -> Option<&CartLine> { self.0.iter().find(|l| l.id() == *id) }
    pub fn contains(&self, id: &LineId) -> bool { self.get(id).is_some() }
    pub fn quantity_of(&self, id: &LineId) -> u32 { self.get(id).map(|l| l.quantity().value()).unwrap_or(0) }

    /// Adds `quantity` units, accumulating onto an existing line with the same id.
    pub fn add(&mut self, item: Purchasable, quantity: Quantity) {
        let id = item.line_id();
        if let Some(existing) = self.0.iter_mut().find(|l| l.id() == id) {
            let q = existing.quantity_mut();
            *q = q.add(quantity.value());
        } else {
            self.0.push(item.into_line(quantity));
        }
    }

    /// Sets an absolute quantity; zero or less removes the line. Returns whether the line existed.
    pub fn set_quantity(&mut self, id: &LineId, quantity: i64) -> bool {
        match Quantity::positive(quantity) {
            Some(q) => match self.0.iter_mut().find(|l| l.id() == *id) {
                Some(line) => { *line.quantity_mut() = q; true }
                None => false,
            },
            None => self.remove(id),
        }
    }

    /// Returns whether a line was removed. Removing an absent id is not an error.
    pub fn remove(&mut self, id: &LineId) -> bool {
        let before = self.0.len();
        self.0.retain(|l| l.id() != *id);
        self.0.len() != before
    }

    pub fn clear(&mut self) { self.0.clear(); }

    pub fn extend(&mut self, other: CartLines) {
        for line in other.0 {
            let (item, quantity) = match line {
                CartLine::Product(p) => (Purchasable::Product(ProductSnapshot { id: p.product_id, name: p.name, price: p.price, image: p.image }), p.quantity),
                CartLine::Custom(c) => (Purchasable::Custom(c.composition), c.quantity),
            };
            self.add(item, quantity);
        }
    }

    pub fn custom_only(&self) -> CartLines { Self(self.0.iter().filter(|l| l.is_custom()).cloned().collect()) }

    pub fn product_lines(&self) -> impl Iterator<Item = &ProductLine> {
        self.0.iter().filter_map(|l| match l { CartLine::Product(p) => Some(p), CartLine::Custom(_) => None })
    }

    /// Σ price × quantity, unrounded.
    pub fn subtotal(&self) -> Decimal { self.0.iter().map(CartLine::line_total).sum() }

    /// Number of distinct lines (the cart badge), not units.
    pub fn distinct_line_count(&self) -> usize { self.0.len() }

    pub fn total_quantity(&self) -> u32 { self.0.iter().map(|l| l.quantity().value()).fold(0, u32::saturating_add) }
}

/// Cart line as returned by `GET /cart/user/:userId`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItemRecord {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub quantity: Quantity,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "deserialize_images")]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub in_stock: bool,
}

impl From<CartItemRecord> for CartLine {
    fn from(r: CartItemRecord) -> Self {
        let image = r.image.or_else(|| r.images.into_iter().next());
        CartLine::Product(ProductLine { product_id: r.id, name: r.name, price: r.price, image, quantity: r.quantity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{BouquetBuilder, BouquetComponent, ComponentKind};
    use crate::palette::resolve_shades;

    fn bouquet(id: i64, price: i64) -> Purchasable {
        ProductSnapshot::new(ProductId(id), format!("Bouquet {id}"), Decimal::new(price, 0)).into()
    }

    fn custom() -> CustomComposition {
        let rose = BouquetComponent::new(1, ComponentKind::Flower, "Rose", Decimal::new(150, 0));
        let mut b = BouquetBuilder::new();
        b.add_flower(&rose, resolve_shades(&rose).remove(0)).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_cart_operations() {
        let mut cart = CartLines::default();
        cart.add(bouquet(7, 500), Quantity::new(2));
        cart.add(bouquet(7, 500), Quantity::new(3));
        assert_eq!(cart.distinct_line_count(), 1);
        assert_eq!(cart.quantity_of(&ProductId(7).into()), 5); // Merged
        assert_eq!(cart.subtotal(), Decimal::new(2500, 0));
    }

    #[test]
    fn test_custom_compositions_never_merge() {
        let mut cart = CartLines::default();
        cart.add(custom().into(), Quantity::ONE);
        cart.add(custom().into(), Quantity::ONE);
        assert_eq!(cart.distinct_line_count(), 2);
        assert_eq!(cart.total_quantity(), 2);
    }

    #[test]
    fn test_same_composition_accumulates() {
        let c = custom();
        let mut cart = CartLines::default();
        cart.add(c.clone().into(), Quantity::ONE);
        cart.add(c.clone().into(), Quantity::new(2));
        assert_eq!(cart.quantity_of(&c.id.into()), 3);
    }

    #[test]
    fn test_quantity_floor_removes() {
        let mut cart = CartLines::default();
        cart.add(bouquet(1, 100), Quantity::ONE);
        cart.add(bouquet(2, 100), Quantity::ONE);
        assert!(cart.set_quantity(&ProductId(1).into(), 0));
        assert!(cart.set_quantity(&ProductId(2).into(), -5));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_oversized_quantity_keeps_line() {
        let mut cart = CartLines::default();
        cart.add(bouquet(1, 100), Quantity::ONE);
        assert!(cart.set_quantity(&ProductId(1).into(), 5_000_000_000));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.quantity_of(&ProductId(1).into()), u32::MAX);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = CartLines::default();
        cart.add(bouquet(1, 100), Quantity::ONE);
        let before = cart.clone();
        assert!(!cart.remove(&ProductId(99).into()));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_serde_round_trip_keeps_kinds() {
        let mut cart = CartLines::default();
        cart.add(bouquet(3, 1200), Quantity::ONE);
        cart.add(custom().into(), Quantity::ONE);
        let json = serde_json::to_string(&cart).unwrap();
        let back: CartLines = serde_json::from_str(&json).unwrap();
        assert_eq!(back.lines().iter().filter(|l| l.is_custom()).count(), 1);
        assert_eq!(back.subtotal(), cart.subtotal());
    }

    #[test]
    fn test_record_to_line() {
        let record: CartItemRecord = serde_json::from_value(serde_json::json!({
            "id": 4, "name": "Tulip mix", "price": 990, "quantity": 2, "images": ["/a.jpg", "/b.jpg"]
        })).unwrap();
        let line = CartLine::from(record);
        assert_eq!(line.image(), "/a.jpg");
        assert_eq!(line.line_total(), Decimal::new(1980, 0));
    }
}
