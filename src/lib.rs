//! Bloom Storefront
//!
//! Flower shop storefront core: custom bouquet composition, cart and
//! favorites state kept in sync with a REST backend.
//!
//! ## Features
//! - Catalog products and bouquet building blocks
//! - Shade palettes for flowers, packaging and bows
//! - Custom bouquet pricing with size tiers
//! - Cart store with guest (local) and per-user (remote) persistence
//! - Favorites store for signed-in users
//! - Bounded image loader with an explicit cache

pub mod client;
pub mod config;
pub mod domain;
pub mod images;
pub mod palette;
pub mod pricing;
pub mod server;
pub mod storage;
pub mod store;
pub mod storefront;

pub use client::{CartApi, CatalogApi, FavoritesApi, RestClient};
pub use config::{GuestCartPolicy, ServerConfig, StorefrontConfig};
pub use domain::aggregates::{
    BouquetBuilder, BouquetComponent, BouquetSize, CartLine, CartLines, CatalogProduct,
    ComponentKind, CustomComposition, ProductType, Purchasable,
};
pub use domain::value_objects::{CompositionId, LineId, ProductId, Quantity, UserId};
pub use palette::ColorVariant;
pub use store::{CartState, CartStore, FavoritesState, FavoritesStore};
pub use storefront::Storefront;

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorefrontError {
    /// Rejected before any request was sent.
    #[error("{0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("{0}")]
    Unknown(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl StorefrontError {
    /// Builds an [`StorefrontError::Http`] with the human message for `status`.
    pub fn http(status: u16) -> Self {
        Self::Http { status, message: http_status_message(status) }
    }
}

/// Human message for a non-2xx status code.
pub fn http_status_message(status: u16) -> String {
    let message = match status {
        400 => "Bad request",
        401 => "Authorization required",
        403 => "Access denied",
        404 => "Resource not found",
        409 => "Data conflict",
        422 => "Validation failed",
        429 => "Too many requests",
        500 => "Internal server error",
        502 => "Bad gateway",
        503 => "Service unavailable",
        504 => "Gateway timeout",
        other => return format!("Server error: {other}"),
    };
    message.to_string()
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_status_messages() {
        assert_eq!(http_status_message(404), "Resource not found");
        assert_eq!(http_status_message(429), "Too many requests");
        assert_eq!(StorefrontError::http(503).to_string(), "Service unavailable");
    }

    #[test]
    fn test_unknown_status_message() {
        assert_eq!(http_status_message(418), "Server error: 418");
    }
}
