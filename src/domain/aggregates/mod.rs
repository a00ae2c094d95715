//! Aggregates module
pub mod cart;
pub mod component;
pub mod composition;
pub mod product;

pub use cart::{CartItemRecord, CartLine, CartLines, CustomLine, ProductLine, ProductSnapshot, Purchasable};
pub use component::{BouquetComponent, ComponentKind};
pub use composition::{BouquetBuilder, BouquetSize, CompositionError, CustomComposition, CustomDetails, SelectedFlowerLine, SelectedPackaging, WizardStep};
pub use product::{CatalogProduct, Category, ProductListing, ProductType, UnknownVariant};
