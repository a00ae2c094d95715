//! Shade palettes for bouquet components.
//!
//! Every resolver is total: a component that matches no palette still gets a
//! single synthetic variant built from its raw color hint.

use serde::{Deserialize, Serialize};
use crate::domain::aggregates::BouquetComponent;

/// A selectable shade of a flower, packaging or bow.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorVariant {
    pub id: String,
    pub name: String,
    pub shade: String,
    pub hex: String,
}

struct Swatch {
    id: &'static str,
    name: &'static str,
    shade: &'static str,
    hex: &'static str,
}

impl Swatch {
    fn variant(&self) -> ColorVariant {
        ColorVariant { id: self.id.into(), name: self.name.into(), shade: self.shade.into(), hex: self.hex.into() }
    }
}

const fn sw(id: &'static str, name: &'static str, shade: &'static str, hex: &'static str) -> Swatch {
    Swatch { id, name, shade, hex }
}

// =============================================================================
// Palette tables
// =============================================================================

const RED: &[Swatch] = &[
    sw("red-1", "Crimson", "Deep red", "#b0102b"),
    sw("red-2", "Scarlet", "Bright red", "#ff2400"),
    sw("red-3", "Burgundy", "Dark wine", "#800020"),
];
const PINK: &[Swatch] = &[
    sw("pink-1", "Blush", "Pale pink", "#f4c2c2"),
    sw("pink-2", "Rose pink", "Medium pink", "#ff66b2"),
    sw("pink-3", "Fuchsia", "Vivid pink", "#ff00a0"),
];
const WHITE: &[Swatch] = &[
    sw("white-1", "Snow", "Pure white", "#ffffff"),
    sw("white-2", "Ivory", "Warm white", "#fffff0"),
    sw("white-3", "Cream", "Soft cream", "#fffdd0"),
];
const YELLOW: &[Swatch] = &[
    sw("yellow-1", "Lemon", "Bright yellow", "#fff44f"),
    sw("yellow-2", "Golden", "Warm yellow", "#ffc000"),
    sw("yellow-3", "Butter", "Pale yellow", "#fff1a8"),
];
const ORANGE: &[Swatch] = &[
    sw("orange-1", "Apricot", "Soft orange", "#fbceb1"),
    sw("orange-2", "Tangerine", "Bright orange", "#f28500"),
    sw("orange-3", "Coral", "Warm coral", "#ff7f50"),
];
const PURPLE: &[Swatch] = &[
    sw("purple-1", "Lavender", "Light purple", "#b57edc"),
    sw("purple-2", "Violet", "Medium purple", "#8f00ff"),
    sw("purple-3", "Plum", "Deep purple", "#8e4585"),
];
const BLUE: &[Swatch] = &[
    sw("blue-1", "Sky", "Light blue", "#87ceeb"),
    sw("blue-2", "Cornflower", "Medium blue", "#6495ed"),
    sw("blue-3", "Indigo", "Deep blue", "#4b0082"),
];

const PAPER: &[Swatch] = &[
    sw("paper-1", "Kraft", "Natural brown", "#c4a484"),
    sw("paper-2", "Pastel", "Soft pink", "#f8c8dc"),
    sw("paper-3", "Black", "Matte black", "#222222"),
];
const BOX: &[Swatch] = &[
    sw("box-1", "Classic", "Black", "#1a1a1a"),
    sw("box-2", "Pearl", "White", "#f5f5f5"),
    sw("box-3", "Powder", "Dusty pink", "#e8b4b8"),
];
const FILM: &[Swatch] = &[
    sw("film-1", "Clear", "Transparent", "#f0f8ff"),
    sw("film-2", "Frosted", "Matte", "#e8eef2"),
    sw("film-3", "Iridescent", "Shimmer", "#d7c8f0"),
];

const BOW: &[Swatch] = &[
    sw("bow-1", "Satin red", "Red ribbon", "#c41e3a"),
    sw("bow-2", "Satin white", "White ribbon", "#ffffff"),
    sw("bow-3", "Gold", "Gold ribbon", "#d4af37"),
    sw("bow-4", "Organza", "Pink sheer", "#ffb6c1"),
];

/// Flower palette keys, in the order hint-driven rules test them.
const FLOWER_PALETTE: &[(&str, &[Swatch])] = &[
    ("red", RED),
    ("pink", PINK),
    ("white", WHITE),
    ("yellow", YELLOW),
    ("orange", ORANGE),
    ("purple", PURPLE),
    ("blue", BLUE),
];

enum NameRule {
    /// Always this palette key.
    Fixed(&'static str),
    /// First key contained in the color hint, else the fallback key.
    Hinted { keys: &'static [&'static str], fallback: &'static str },
}

/// Checked in order; the first name fragment contained in the flower name wins.
const NAME_RULES: &[(&str, NameRule)] = &[
    ("rose", NameRule::Hinted { keys: &["red", "pink", "white", "yellow", "orange", "purple"], fallback: "pink" }),
    ("peony", NameRule::Fixed("pink")),
    ("tulip", NameRule::Hinted { keys: &["red", "yellow", "purple", "white"], fallback: "pink" }),
    ("hydrangea", NameRule::Fixed("blue")),
    ("lily", NameRule::Fixed("white")),
    ("orchid", NameRule::Fixed("purple")),
    ("chrysanthemum", NameRule::Fixed("yellow")),
    ("sunflower", NameRule::Fixed("yellow")),
];

fn flower_table(key: &str) -> Option<&'static [Swatch]> {
    FLOWER_PALETTE.iter().find(|(k, _)| *k == key).map(|(_, table)| *table)
}

fn collect(table: &[Swatch]) -> Vec<ColorVariant> { table.iter().map(Swatch::variant).collect() }

// =============================================================================
// Resolvers
// =============================================================================

/// Selectable shades for a flower (or greenery) component. Never empty.
pub fn resolve_shades(component: &BouquetComponent) -> Vec<ColorVariant> {
    let name = component.name.to_lowercase();
    let hint = component.color.as_deref().unwrap_or_default().trim().to_lowercase();

    let by_name = NAME_RULES.iter().find(|(fragment, _)| name.contains(fragment)).map(|(_, rule)| match rule {
        NameRule::Fixed(key) => *key,
        NameRule::Hinted { keys, fallback } => keys.iter().copied().find(|k| hint.contains(k)).unwrap_or(*fallback),
    });

    let table = match by_name {
        Some(key) => flower_table(key),
        None => flower_table(&hint),
    };
    match table {
        Some(table) => collect(table),
        None => vec![default_variant(component)],
    }
}

/// Shades for a packaging component: paper, box, or film by name.
pub fn resolve_packaging_shades(component: &BouquetComponent) -> Vec<ColorVariant> {
    let name = component.name.to_lowercase();
    if name.contains("paper") {
        collect(PAPER)
    } else if name.contains("box") {
        collect(BOX)
    } else {
        collect(FILM)
    }
}

pub fn bow_shades() -> Vec<ColorVariant> { collect(BOW) }

/// Looks up one of `component`'s shades by id, using the resolver for its kind.
pub fn find_shade(component: &BouquetComponent, variant_id: &str) -> Option<ColorVariant> {
    use crate::domain::aggregates::ComponentKind;
    let shades = match component.kind {
        ComponentKind::Packaging => resolve_packaging_shades(component),
        ComponentKind::Flower | ComponentKind::Greenery => resolve_shades(component),
    };
    shades.into_iter().find(|v| v.id == variant_id)
}

pub fn find_bow(variant_id: &str) -> Option<ColorVariant> {
    BOW.iter().find(|s| s.id == variant_id).map(Swatch::variant)
}

fn default_variant(component: &BouquetComponent) -> ColorVariant {
    let color = component.color.as_deref().map(str::trim).filter(|c| !c.is_empty());
    ColorVariant {
        id: format!("default-{}", component.id),
        name: color.unwrap_or("Standard").to_string(),
        shade: color.unwrap_or("Base shade").to_string(),
        hex: fallback_hex(color.unwrap_or_default()).to_string(),
    }
}

fn fallback_hex(color: &str) -> &'static str {
    match color.to_lowercase().as_str() {
        "red" => "#ff4444",
        "white" => "#ffffff",
        "pink" => "#ff99cc",
        "yellow" => "#ffcc00",
        "purple" => "#cc99ff",
        "orange" => "#ff9966",
        "blue" => "#66ccff",
        "green" => "#4caf50",
        "brown" => "#8b5a2b",
        "gold" => "#ffd700",
        "clear" => "#f0f8ff",
        "multi" => "#b388ff",
        _ => "#cccccc",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::ComponentKind;
    use rust_decimal::Decimal;

    fn flower(name: &str, color: Option<&str>) -> BouquetComponent {
        let c = BouquetComponent::new(42, ComponentKind::Flower, name, Decimal::new(150, 0));
        match color { Some(color) => c.with_color(color), None => c }
    }

    fn ids(variants: &[ColorVariant]) -> Vec<&str> { variants.iter().map(|v| v.id.as_str()).collect() }

    #[test]
    fn test_rose_follows_hint() {
        assert_eq!(ids(&resolve_shades(&flower("Red Naomi Rose", Some("Red")))), vec!["red-1", "red-2", "red-3"]);
        assert_eq!(resolve_shades(&flower("Garden rose", Some("yellow")))[0].id, "yellow-1");
        assert_eq!(resolve_shades(&flower("Garden rose", Some("green")))[0].id, "pink-1");
        assert_eq!(resolve_shades(&flower("Rose", None))[0].id, "pink-1");
    }

    #[test]
    fn test_fixed_name_rules_ignore_hint() {
        assert_eq!(resolve_shades(&flower("Peony Sarah", Some("white")))[0].id, "pink-1");
        assert_eq!(resolve_shades(&flower("Hydrangea", Some("pink")))[0].id, "blue-1");
        assert_eq!(resolve_shades(&flower("Lily", Some("orange")))[0].id, "white-1");
        assert_eq!(resolve_shades(&flower("Orchid", None))[0].id, "purple-1");
        assert_eq!(resolve_shades(&flower("Sunflower", None))[0].id, "yellow-1");
    }

    #[test]
    fn test_tulip_hint_and_default() {
        assert_eq!(resolve_shades(&flower("Tulip", Some("purple")))[0].id, "purple-1");
        assert_eq!(resolve_shades(&flower("Tulip", Some("orange")))[0].id, "pink-1");
    }

    #[test]
    fn test_first_rule_wins() {
        // "rose" is checked before "lily"
        assert_eq!(resolve_shades(&flower("Rose and lily mix", Some("red")))[0].id, "red-1");
    }

    #[test]
    fn test_exact_hint_key_without_name_rule() {
        assert_eq!(resolve_shades(&flower("Gerbera", Some("orange")))[0].id, "orange-1");
        // substring is not enough once the name rules are exhausted
        assert_eq!(resolve_shades(&flower("Gerbera", Some("light orange")))[0].id, "default-42");
    }

    #[test]
    fn test_fallback_is_total() {
        let shades = resolve_shades(&flower("", None));
        assert_eq!(shades.len(), 1);
        assert_eq!(shades[0], ColorVariant { id: "default-42".into(), name: "Standard".into(), shade: "Base shade".into(), hex: "#cccccc".into() });

        let gold = resolve_shades(&flower("Eucalyptus", Some("Gold")));
        assert_eq!(gold[0].name, "Gold");
        assert_eq!(gold[0].hex, "#ffd700");

        assert_eq!(resolve_shades(&flower("Thing", Some("mauve")))[0].hex, "#cccccc");
    }

    #[test]
    fn test_packaging_tables() {
        let pkg = |name: &str| BouquetComponent::new(1, ComponentKind::Packaging, name, Decimal::new(100, 0));
        assert_eq!(resolve_packaging_shades(&pkg("Kraft paper"))[0].id, "paper-1");
        assert_eq!(resolve_packaging_shades(&pkg("Hat box"))[0].id, "box-1");
        assert_eq!(resolve_packaging_shades(&pkg("Glass vase"))[0].id, "film-1");
        assert_eq!(find_shade(&pkg("Kraft paper"), "paper-2").map(|v| v.name), Some("Pastel".to_string()));
    }

    #[test]
    fn test_bows() {
        assert_eq!(bow_shades().len(), 4);
        assert!(find_bow("bow-3").is_some());
        assert!(find_bow("bow-9").is_none());
    }
}
