//! REST client for the storefront backend.
//!
//! The stores depend on the [`CartApi`], [`FavoritesApi`] and [`CatalogApi`]
//! traits; [`RestClient`] implements all of them over HTTP.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use crate::domain::aggregates::{BouquetComponent, CartItemRecord, CartLine, CatalogProduct, ComponentKind, ProductListing};
use crate::domain::value_objects::{ProductId, Quantity, UserId};
use crate::images::ImageProbe;
use crate::{Result, StorefrontError};

/// Response envelope used by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self { Self { success: true, data: Some(data), message: None } }
    pub fn done(message: impl Into<String>) -> Self { Self { success: true, data: None, message: Some(message.into()) } }
    pub fn failure(message: impl Into<String>) -> Self { Self { success: false, data: None, message: Some(message.into()) } }
}

/// Body of `GET /favorites/check/:userId/:productId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteCheck {
    pub success: bool,
    #[serde(rename = "isFavorite")]
    pub is_favorite: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserProductBody {
    user_id: UserId,
    product_id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    quantity: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserBody {
    user_id: UserId,
}

#[async_trait]
pub trait CartApi: Send + Sync {
    async fn fetch_cart(&self, user: UserId) -> Result<Vec<CartLine>>;
    /// Upsert; the server accumulates onto an existing line.
    async fn add_item(&self, user: UserId, product: ProductId, quantity: Quantity) -> Result<()>;
    /// Absolute quantity; zero or less deletes the line server-side.
    async fn update_item(&self, user: UserId, product: ProductId, quantity: i64) -> Result<()>;
    async fn remove_item(&self, user: UserId, product: ProductId) -> Result<()>;
    async fn clear(&self, user: UserId) -> Result<()>;
}

#[async_trait]
pub trait FavoritesApi: Send + Sync {
    async fn fetch_favorites(&self, user: UserId) -> Result<Vec<CatalogProduct>>;
    async fn add_favorite(&self, user: UserId, product: ProductId) -> Result<()>;
    async fn remove_favorite(&self, user: UserId, product: ProductId) -> Result<()>;
    async fn is_favorite(&self, user: UserId, product: ProductId) -> Result<bool>;
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn products(&self, listing: ProductListing) -> Result<Vec<CatalogProduct>>;
    /// Active components, optionally of one kind.
    async fn components(&self, kind: Option<ComponentKind>) -> Result<Vec<BouquetComponent>>;
}

#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base_url: String,
}

impl RestClient {
    /// # Arguments
    /// * `base_url` - API root, e.g. `http://localhost:5000/api`
    pub fn new(base_url: &str) -> Self { Self::with_client(Client::new(), base_url) }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    fn url(&self, path: &str) -> String { format!("{}{}", self.base_url, path) }

    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.http.get(self.url(path)).send().await.map_err(network)?;
        let envelope: Envelope<T> = read_envelope(response).await?;
        envelope.data.ok_or_else(|| StorefrontError::Unknown("Response carried no data".to_string()))
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<()> {
        let response = self.http.post(self.url(path)).json(body).send().await.map_err(network)?;
        let _: Envelope<serde_json::Value> = read_envelope(response).await?;
        Ok(())
    }
}

fn network(e: reqwest::Error) -> StorefrontError { StorefrontError::Network(e.to_string()) }

async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<Envelope<T>> {
    let status = response.status();
    if !status.is_success() {
        return Err(StorefrontError::http(status.as_u16()));
    }
    let envelope: Envelope<T> = response.json().await.map_err(|e| StorefrontError::Unknown(e.to_string()))?;
    if !envelope.success {
        return Err(StorefrontError::Unknown(envelope.message.unwrap_or_else(|| "Request failed".to_string())));
    }
    Ok(envelope)
}

#[async_trait]
impl CartApi for RestClient {
    #[instrument(skip(self))]
    async fn fetch_cart(&self, user: UserId) -> Result<Vec<CartLine>> {
        let records: Vec<CartItemRecord> = self.get_data(&format!("/cart/user/{user}")).await?;
        debug!(lines = records.len(), "cart fetched");
        Ok(records.into_iter().map(CartLine::from).collect())
    }

    #[instrument(skip(self))]
    async fn add_item(&self, user: UserId, product: ProductId, quantity: Quantity) -> Result<()> {
        let body = UserProductBody { user_id: user, product_id: product, quantity: Some(i64::from(quantity.value())) };
        self.post("/cart/add", &body).await
    }

    #[instrument(skip(self))]
    async fn update_item(&self, user: UserId, product: ProductId, quantity: i64) -> Result<()> {
        self.post("/cart/update", &UserProductBody { user_id: user, product_id: product, quantity: Some(quantity) }).await
    }

    #[instrument(skip(self))]
    async fn remove_item(&self, user: UserId, product: ProductId) -> Result<()> {
        self.post("/cart/remove", &UserProductBody { user_id: user, product_id: product, quantity: None }).await
    }

    #[instrument(skip(self))]
    async fn clear(&self, user: UserId) -> Result<()> {
        self.post("/cart/clear", &UserBody { user_id: user }).await
    }
}

#[async_trait]
impl FavoritesApi for RestClient {
    #[instrument(skip(self))]
    async fn fetch_favorites(&self, user: UserId) -> Result<Vec<CatalogProduct>> {
        self.get_data(&format!("/favorites/user/{user}")).await
    }

    #[instrument(skip(self))]
    async fn add_favorite(&self, user: UserId, product: ProductId) -> Result<()> {
        self.post("/favorites/add", &UserProductBody { user_id: user, product_id: product, quantity: None }).await
    }

    #[instrument(skip(self))]
    async fn remove_favorite(&self, user: UserId, product: ProductId) -> Result<()> {
        self.post("/favorites/remove", &UserProductBody { user_id: user, product_id: product, quantity: None }).await
    }

    #[instrument(skip(self))]
    async fn is_favorite(&self, user: UserId, product: ProductId) -> Result<bool> {
        let response = self.http.get(self.url(&format!("/favorites/check/{user}/{product}"))).send().await.map_err(network)?;
        if !response.status().is_success() {
            return Err(StorefrontError::http(response.status().as_u16()));
        }
        let check: FavoriteCheck = response.json().await.map_err(|e| StorefrontError::Unknown(e.to_string()))?;
        Ok(check.success && check.is_favorite)
    }
}

#[async_trait]
impl CatalogApi for RestClient {
    #[instrument(skip(self))]
    async fn products(&self, listing: ProductListing) -> Result<Vec<CatalogProduct>> {
        self.get_data(&format!("/products/{}", listing.path_segment())).await
    }

    #[instrument(skip(self))]
    async fn components(&self, kind: Option<ComponentKind>) -> Result<Vec<BouquetComponent>> {
        let path = match kind {
            Some(kind) => format!("/bouquet-components?type={}", kind.as_str()),
            None => "/bouquet-components".to_string(),
        };
        let components: Vec<BouquetComponent> = self.get_data(&path).await?;
        Ok(components.into_iter().filter(|c| c.is_active).collect())
    }
}

#[async_trait]
impl ImageProbe for RestClient {
    async fn probe(&self, url: &str) -> bool {
        let target = if url.starts_with('/') { self.site_url(url) } else { url.to_string() };
        match self.http.get(&target).send().await {
            Ok(r) => r.status().is_success(),
            Err(e) => {
                debug!(url = %target, error = %e, "image probe failed");
                false
            }
        }
    }
}

impl RestClient {
    /// Site-local paths are served by the same origin as the API.
    fn site_url(&self, path: &str) -> String {
        match reqwest::Url::parse(&self.base_url).and_then(|base| base.join(path)) {
            Ok(u) => u.to_string(),
            Err(_) => path.to_string(),
        }
    }
}
