//! Storefront domain: identifiers, catalog entities, compositions and carts.
pub mod aggregates;
pub mod events;
pub mod value_objects;
