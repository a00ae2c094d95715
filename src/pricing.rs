//! Custom bouquet pricing.
//!
//! Flowers scale with the bouquet size; greenery, packaging and the bow are
//! flat. Totals are kept at full precision and only rounded for display.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use crate::domain::aggregates::{BouquetComponent, BouquetSize, SelectedFlowerLine, SelectedPackaging};
use crate::palette::ColorVariant;

/// Flat fee added when a bow is selected.
pub const BOW_PRICE: Decimal = Decimal::from_parts(80, 0, 0, false, 0);

/// Multiplier for a size tier name; unknown names price like `small`.
pub fn size_multiplier_named(name: &str) -> Decimal {
    name.parse::<BouquetSize>().map(|s| s.multiplier()).unwrap_or(Decimal::ONE)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    pub flowers: Decimal,
    pub greenery: Decimal,
    pub packaging: Decimal,
    pub bow: Decimal,
    pub total: Decimal,
}

pub fn breakdown(
    flowers: &[SelectedFlowerLine],
    greenery: &[BouquetComponent],
    packaging: Option<&SelectedPackaging>,
    bow: Option<&ColorVariant>,
    size: BouquetSize,
) -> PriceBreakdown {
    let multiplier = size.multiplier();
    let flowers: Decimal = flowers
        .iter()
        .map(|line| line.component.price * Decimal::from(line.quantity.value()) * multiplier)
        .sum();
    let greenery: Decimal = greenery.iter().map(|g| g.price).sum();
    let packaging = packaging.map(|p| p.component.price).unwrap_or(Decimal::ZERO);
    let bow = if bow.is_some() { BOW_PRICE } else { Decimal::ZERO };
    PriceBreakdown { flowers, greenery, packaging, bow, total: flowers + greenery + packaging + bow }
}

/// Total price of a custom bouquet.
pub fn price(
    flowers: &[SelectedFlowerLine],
    greenery: &[BouquetComponent],
    packaging: Option<&SelectedPackaging>,
    bow: Option<&ColorVariant>,
    size: BouquetSize,
) -> Decimal {
    breakdown(flowers, greenery, packaging, bow, size).total
}

/// Two decimal places, half away from zero. Display only.
pub fn display_price(amount: Decimal) -> String {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero).normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::ComponentKind;
    use crate::domain::value_objects::Quantity;
    use crate::palette::{bow_shades, find_shade, resolve_shades};

    fn rose() -> BouquetComponent {
        BouquetComponent::new(1, ComponentKind::Flower, "Rose", Decimal::new(150, 0)).with_color("red")
    }

    fn line(component: BouquetComponent, quantity: u32) -> SelectedFlowerLine {
        let variant = resolve_shades(&component).remove(0);
        SelectedFlowerLine { component, variant, quantity: Quantity::new(quantity) }
    }

    fn kraft() -> SelectedPackaging {
        let component = BouquetComponent::new(10, ComponentKind::Packaging, "Kraft paper", Decimal::new(100, 0));
        let variant = find_shade(&component, "paper-1");
        SelectedPackaging { component, variant }
    }

    #[test]
    fn test_reference_scenario() {
        let bow = bow_shades().remove(0);
        let total = price(&[line(rose(), 3)], &[], Some(&kraft()), Some(&bow), BouquetSize::Medium);
        assert_eq!(total, Decimal::new(855, 0));
    }

    #[test]
    fn test_empty_selection_is_zero() {
        assert_eq!(price(&[], &[], None, None, BouquetSize::Large), Decimal::ZERO);
    }

    #[test]
    fn test_quantity_step_adds_scaled_unit_price() {
        for size in [BouquetSize::Small, BouquetSize::Medium, BouquetSize::Large] {
            let before = price(&[line(rose(), 2)], &[], None, None, size);
            let after = price(&[line(rose(), 3)], &[], None, None, size);
            assert_eq!(after - before, Decimal::new(150, 0) * size.multiplier());
        }
    }

    #[test]
    fn test_size_scales_flowers_only() {
        let eucalyptus = BouquetComponent::new(5, ComponentKind::Greenery, "Eucalyptus", Decimal::new(50, 0));
        let bow = bow_shades().remove(0);
        let flowers = [line(rose(), 4)];
        let small = breakdown(&flowers, &[eucalyptus.clone()], Some(&kraft()), Some(&bow), BouquetSize::Small);
        let large = breakdown(&flowers, &[eucalyptus], Some(&kraft()), Some(&bow), BouquetSize::Large);
        assert_eq!(large.flowers, small.flowers * Decimal::TWO);
        assert_eq!((large.greenery, large.packaging, large.bow), (small.greenery, small.packaging, small.bow));
        assert_eq!(large.total - small.total, small.flowers);
    }

    #[test]
    fn test_unknown_size_name() {
        assert_eq!(size_multiplier_named("large"), Decimal::TWO);
        assert_eq!(size_multiplier_named("huge"), Decimal::ONE);
    }

    #[test]
    fn test_display_rounding() {
        assert_eq!(display_price(Decimal::new(85_5005, 3)), "855.01");
        assert_eq!(display_price(Decimal::new(855, 0)), "855");
    }
}
