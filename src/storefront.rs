//! Wires the REST client, local storage, stores and image loader together.

use std::sync::Arc;
use tracing::info;
use crate::client::{CatalogApi, RestClient};
use crate::config::StorefrontConfig;
use crate::domain::aggregates::{BouquetComponent, CatalogProduct, ComponentKind, ProductListing};
use crate::domain::value_objects::UserId;
use crate::images::ImageLoader;
use crate::storage::{JsonFileStorage, LocalStorage};
use crate::store::{CartStore, FavoritesStore};
use crate::Result;

pub struct Storefront {
    pub config: StorefrontConfig,
    pub client: Arc<RestClient>,
    pub cart: CartStore,
    pub favorites: FavoritesStore,
    pub images: ImageLoader,
}

impl Storefront {
    /// Opens the guest cart from `config.storage_dir` and talks to `config.api_base_url`.
    pub fn from_config(config: StorefrontConfig) -> Result<Self> {
        let client = Arc::new(RestClient::new(&config.api_base_url));
        let storage = Arc::new(JsonFileStorage::new(config.storage_dir.clone())?);
        Ok(Self::with_parts(config, client, storage))
    }

    pub fn with_parts(config: StorefrontConfig, client: Arc<RestClient>, storage: Arc<dyn LocalStorage>) -> Self {
        info!(api = %config.api_base_url, policy = ?config.guest_cart_policy, "storefront ready");
        Self {
            cart: CartStore::new(client.clone(), storage, config.guest_cart_policy),
            favorites: FavoritesStore::new(client.clone()),
            images: ImageLoader::new(config.api_base_url.clone(), client.clone(), config.image_cache_capacity, config.image_concurrency),
            client,
            config,
        }
    }

    /// Login or logout: both stores switch together.
    pub async fn set_identity(&self, identity: Option<UserId>) -> bool {
        let (cart, favorites) = tokio::join!(self.cart.set_identity(identity), self.favorites.set_identity(identity));
        cart && favorites
    }

    pub async fn products(&self, listing: ProductListing) -> Result<Vec<CatalogProduct>> {
        self.client.products(listing).await
    }

    pub async fn components(&self, kind: Option<ComponentKind>) -> Result<Vec<BouquetComponent>> {
        self.client.components(kind).await
    }
}
