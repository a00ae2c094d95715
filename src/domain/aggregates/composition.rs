//! Custom Composition Aggregate
//!
//! A bouquet assembled from flowers (each in a chosen shade), greenery,
//! packaging and an optional bow, priced by [`crate::pricing`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;
use super::component::{BouquetComponent, ComponentKind};
use super::product::UnknownVariant;
use crate::domain::value_objects::{CompositionId, Quantity};
use crate::images::PLACEHOLDER_IMAGE;
use crate::palette::ColorVariant;
use crate::pricing;

pub const DEFAULT_COMPOSITION_NAME: &str = "Individual bouquet";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BouquetSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl BouquetSize {
    pub fn multiplier(&self) -> Decimal {
        match self { Self::Small => Decimal::ONE, Self::Medium => Decimal::new(15, 1), Self::Large => Decimal::TWO }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Small => "Small (5-7 stems)",
            Self::Medium => "Medium (9-11 stems)",
            Self::Large => "Large (13-15 stems)",
        }
    }
}

impl FromStr for BouquetSize {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// One flower in one shade. Keyed by `(component.id, variant.id)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectedFlowerLine {
    pub component: BouquetComponent,
    pub variant: ColorVariant,
    pub quantity: Quantity,
}

impl SelectedFlowerLine {
    fn matches(&self, component_id: i64, variant_id: &str) -> bool {
        self.component.id == component_id && self.variant.id == variant_id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectedPackaging {
    pub component: BouquetComponent,
    pub variant: Option<ColorVariant>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomDetails {
    pub flowers: Vec<SelectedFlowerLine>,
    pub greenery: Vec<BouquetComponent>,
    pub packaging: Option<SelectedPackaging>,
    pub bow: Option<ColorVariant>,
    pub size: BouquetSize,
    pub instructions: String,
}

/// A priced, cart-storable custom bouquet. Client-only; never sent to the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomComposition {
    pub id: CompositionId,
    pub name: String,
    pub price: Decimal,
    pub image: String,
    pub description: String,
    pub details: CustomDetails,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositionError {
    #[error("Select at least one flower")]
    NoFlowers,
    #[error("Expected a {expected} component, got {found}")]
    WrongKind { expected: &'static str, found: &'static str },
    #[error("{0} is not available")]
    Unavailable(String),
}

impl From<CompositionError> for crate::StorefrontError {
    fn from(e: CompositionError) -> Self { Self::Validation(e.to_string()) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardStep {
    #[default]
    Flowers = 1,
    Greenery = 2,
    Packaging = 3,
    Size = 4,
    Details = 5,
}

impl WizardStep {
    fn next(self) -> Option<Self> {
        match self {
            Self::Flowers => Some(Self::Greenery),
            Self::Greenery => Some(Self::Packaging),
            Self::Packaging => Some(Self::Size),
            Self::Size => Some(Self::Details),
            Self::Details => None,
        }
    }

    fn prev(self) -> Option<Self> {
        match self {
            Self::Flowers => None,
            Self::Greenery => Some(Self::Flowers),
            Self::Packaging => Some(Self::Greenery),
            Self::Size => Some(Self::Packaging),
            Self::Details => Some(Self::Size),
        }
    }
}

/// Five-step builder: flowers, greenery, packaging, size, details.
#[derive(Clone, Debug, Default)]
pub struct BouquetBuilder {
    flowers: Vec<SelectedFlowerLine>,
    greenery: Vec<BouquetComponent>,
    packaging: Option<SelectedPackaging>,
    bow: Option<ColorVariant>,
    size: BouquetSize,
    name: String,
    instructions: String,
    step: WizardStep,
}

fn ensure(component: &BouquetComponent, expected: ComponentKind) -> Result<(), CompositionError> {
    if component.kind != expected {
        return Err(CompositionError::WrongKind { expected: expected.as_str(), found: component.kind.as_str() });
    }
    if !component.is_active {
        return Err(CompositionError::Unavailable(component.name.clone()));
    }
    Ok(())
}

impl BouquetBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn flowers(&self) -> &[SelectedFlowerLine] { &self.flowers }
    pub fn greenery(&self) -> &[BouquetComponent] { &self.greenery }
    pub fn packaging(&self) -> Option<&SelectedPackaging> { self.packaging.as_ref() }
    pub fn bow(&self) -> Option<&ColorVariant> { self.bow.as_ref() }
    pub fn size(&self) -> BouquetSize { self.size }
    pub fn step(&self) -> WizardStep { self.step }

    /// Adds one stem; repeats of the same shade accumulate on one line.
    pub fn add_flower(&mut self, component: &BouquetComponent, variant: ColorVariant) -> Result<(), CompositionError> {
        ensure(component, ComponentKind::Flower)?;
        if let Some(existing) = self.flowers.iter_mut().find(|f| f.matches(component.id, &variant.id)) {
            existing.quantity = existing.quantity.add(1);
        } else {
            self.flowers.push(SelectedFlowerLine { component: component.clone(), variant, quantity: Quantity::ONE });
        }
        Ok(())
    }

    /// Sets an absolute stem count; zero or less drops the line.
    pub fn set_flower_quantity(&mut self, component_id: i64, variant_id: &str, quantity: i64) {
        match Quantity::positive(quantity) {
            Some(q) => {
                if let Some(line) = self.flowers.iter_mut().find(|f| f.matches(component_id, variant_id)) {
                    line.quantity = q;
                }
            }
            None => self.remove_flower(component_id, variant_id),
        }
    }

    pub fn remove_flower(&mut self, component_id: i64, variant_id: &str) {
        self.flowers.retain(|f| !f.matches(component_id, variant_id));
    }

    /// Selects the greenery item, or deselects it if already selected.
    pub fn toggle_greenery(&mut self, component: &BouquetComponent) -> Result<bool, CompositionError> {
        ensure(component, ComponentKind::Greenery)?;
        if self.greenery.iter().any(|g| g.id == component.id) {
            self.greenery.retain(|g| g.id != component.id);
            Ok(false)
        } else {
            self.greenery.push(component.clone());
            Ok(true)
        }
    }

    pub fn select_packaging(&mut self, component: &BouquetComponent, variant: Option<ColorVariant>) -> Result<(), CompositionError> {
        ensure(component, ComponentKind::Packaging)?;
        self.packaging = Some(SelectedPackaging { component: component.clone(), variant });
        Ok(())
    }

    pub fn clear_packaging(&mut self) { self.packaging = None; }
    pub fn select_bow(&mut self, bow: Option<ColorVariant>) { self.bow = bow; }
    pub fn set_size(&mut self, size: BouquetSize) { self.size = size; }
    pub fn set_name(&mut self, name: impl Into<String>) { self.name = name.into(); }
    pub fn set_instructions(&mut self, instructions: impl Into<String>) { self.instructions = instructions.into(); }

    pub fn price(&self) -> Decimal {
        pricing::price(&self.flowers, &self.greenery, self.packaging.as_ref(), self.bow.as_ref(), self.size)
    }

    pub fn is_step_valid(&self) -> bool {
        match self.step {
            WizardStep::Flowers => !self.flowers.is_empty(),
            WizardStep::Packaging => self.packaging.is_some(),
            WizardStep::Greenery | WizardStep::Size | WizardStep::Details => true,
        }
    }

    /// Advances only from a valid step. Returns whether the step changed.
    pub fn next_step(&mut self) -> bool {
        match self.step.next() {
            Some(next) if self.is_step_valid() => { self.step = next; true }
            _ => false,
        }
    }

    pub fn prev_step(&mut self) -> bool {
        match self.step.prev() {
            Some(prev) => { self.step = prev; true }
            None => false,
        }
    }

    /// Snapshots the selection into a composition with a fresh id.
    pub fn build(&self) -> Result<CustomComposition, CompositionError> {
        if self.flowers.is_empty() {
            return Err(CompositionError::NoFlowers);
        }
        let name = match self.name.trim() {
            "" => DEFAULT_COMPOSITION_NAME.to_string(),
            n => n.to_string(),
        };
        let image = self.flowers.iter().find_map(|f| f.component.image.clone()).unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());
        let parts: Vec<String> = self.flowers.iter().map(|f| format!("{} ({})", f.component.name, f.variant.name)).collect();
        let composition = CustomComposition {
            id: CompositionId::generate(),
            name,
            price: self.price(),
            image,
            description: format!("Custom composition: {}", parts.join(", ")),
            details: CustomDetails {
                flowers: self.flowers.clone(),
                greenery: self.greenery.clone(),
                packaging: self.packaging.clone(),
                bow: self.bow.clone(),
                size: self.size,
                instructions: self.instructions.clone(),
            },
        };
        debug!(id = %composition.id, price = %composition.price, "custom composition built");
        Ok(composition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{bow_shades, resolve_packaging_shades, resolve_shades};

    fn rose() -> BouquetComponent {
        BouquetComponent::new(1, ComponentKind::Flower, "Rose", Decimal::new(150, 0)).with_color("red").with_image("/img/rose.jpg")
    }

    fn kraft() -> BouquetComponent {
        BouquetComponent::new(10, ComponentKind::Packaging, "Kraft paper", Decimal::new(100, 0))
    }

    fn red(n: usize) -> ColorVariant { resolve_shades(&rose()).remove(n) }

    #[test]
    fn test_shades_are_distinct_lines() {
        let mut b = BouquetBuilder::new();
        b.add_flower(&rose(), red(0)).unwrap();
        b.add_flower(&rose(), red(0)).unwrap();
        b.add_flower(&rose(), red(1)).unwrap();
        assert_eq!(b.flowers().len(), 2);
        assert_eq!(b.flowers()[0].quantity.value(), 2);

        b.set_flower_quantity(1, "red-1", 0);
        assert_eq!(b.flowers().len(), 1);
        b.set_flower_quantity(1, "red-2", -3);
        assert!(b.flowers().is_empty());
    }

    #[test]
    fn test_greenery_toggles() {
        let fern = BouquetComponent::new(5, ComponentKind::Greenery, "Fern", Decimal::new(40, 0));
        let mut b = BouquetBuilder::new();
        assert!(b.toggle_greenery(&fern).unwrap());
        assert!(!b.toggle_greenery(&fern).unwrap());
        assert!(b.greenery().is_empty());
    }

    #[test]
    fn test_rejects_wrong_kind_and_inactive() {
        let mut b = BouquetBuilder::new();
        assert_eq!(
            b.add_flower(&kraft(), red(0)),
            Err(CompositionError::WrongKind { expected: "flower", found: "packaging" })
        );
        let mut wilted = rose();
        wilted.is_active = false;
        assert_eq!(b.add_flower(&wilted, red(0)), Err(CompositionError::Unavailable("Rose".into())));
    }

    #[test]
    fn test_wizard_gates() {
        let mut b = BouquetBuilder::new();
        assert!(!b.next_step());
        b.add_flower(&rose(), red(0)).unwrap();
        assert!(b.next_step());
        assert!(b.next_step());
        assert_eq!(b.step(), WizardStep::Packaging);
        assert!(!b.next_step());
        b.select_packaging(&kraft(), resolve_packaging_shades(&kraft()).into_iter().next()).unwrap();
        assert!(b.next_step() && b.next_step());
        assert_eq!(b.step(), WizardStep::Details);
        assert!(!b.next_step());
        assert!(b.prev_step());
    }

    #[test]
    fn test_build_requires_flowers() {
        assert_eq!(BouquetBuilder::new().build().unwrap_err(), CompositionError::NoFlowers);
    }

    #[test]
    fn test_build_composition() {
        let mut b = BouquetBuilder::new();
        for _ in 0..3 {
            b.add_flower(&rose(), red(0)).unwrap();
        }
        b.select_packaging(&kraft(), resolve_packaging_shades(&kraft()).into_iter().next()).unwrap();
        b.select_bow(bow_shades().into_iter().next());
        b.set_instructions("No card");
        let c = b.build().unwrap();
        assert_eq!(c.name, DEFAULT_COMPOSITION_NAME);
        assert_eq!(c.price, Decimal::new(855, 0));
        assert_eq!(c.image, "/img/rose.jpg");
        assert_eq!(c.description, "Custom composition: Rose (Crimson)");
        assert_eq!(c.details.size, BouquetSize::Medium);

        let again = b.build().unwrap();
        assert_ne!(c.id, again.id);
    }
}
