//! REST backend: catalog reads, per-user cart and favorites.
//!
//! Every response uses the [`Envelope`] shape the client expects. Mutations
//! publish a [`StorefrontEvent`] to NATS when a connection is configured.

use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use validator::Validate;
use crate::client::{Envelope, FavoriteCheck};
use crate::domain::aggregates::{BouquetComponent, CartItemRecord, CatalogProduct, Category, ComponentKind, ProductListing, ProductType};
use crate::domain::events::{CartEvent, FavoritesEvent, StorefrontEvent};
use crate::domain::value_objects::{ProductId, Quantity, UserId};
use crate::images::images_or_placeholder;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub nats: Option<async_nats::Client>,
}

type ApiError = (StatusCode, Json<Envelope<()>>);
type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "bloom-storefront"})) }))
        .route("/api/products/:kind", get(list_products))
        .route("/api/bouquet-components", get(list_components))
        .route("/api/bouquet-components/type/:kind", get(components_by_type))
        .route("/api/cart/user/:user_id", get(get_cart))
        .route("/api/cart/add", post(add_to_cart))
        .route("/api/cart/update", post(update_cart_item))
        .route("/api/cart/remove", post(remove_from_cart))
        .route("/api/cart/clear", post(clear_cart))
        .route("/api/favorites/user/:user_id", get(get_favorites))
        .route("/api/favorites/add", post(add_favorite))
        .route("/api/favorites/remove", post(remove_favorite))
        .route("/api/favorites/check/:user_id/:product_id", get(check_favorite))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn reject(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(Envelope::failure(message)))
}

fn internal(e: sqlx::Error) -> ApiError {
    error!(error = %e, "database error");
    reject(StatusCode::INTERNAL_SERVER_ERROR, format!("Server error: {e}"))
}

fn validated<T: Validate>(request: T) -> Result<T, ApiError> {
    request.validate().map_err(|e| reject(StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(request)
}

async fn publish(state: &AppState, event: StorefrontEvent) {
    let Some(nats) = &state.nats else { return };
    let subject = event.subject();
    match serde_json::to_vec(&event.published()) {
        Ok(payload) => {
            if let Err(e) = nats.publish(subject.clone(), payload.into()).await {
                warn!(%subject, error = %e, "event publish failed");
            }
        }
        Err(e) => warn!(%subject, error = %e, "event serialization failed"),
    }
}

// =============================================================================
// Rows
// =============================================================================

/// Image columns hold either a JSON array or a bare path.
fn stored_images(raw: Option<String>) -> Vec<String> {
    images_or_placeholder(&raw.map(Value::String).unwrap_or(Value::Null))
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    price: Decimal,
    original_price: Option<Decimal>,
    images: Option<String>,
    description: Option<String>,
    category_name: Option<String>,
    category_slug: Option<String>,
    product_type: String,
    in_stock: bool,
    is_customizable: bool,
}

impl ProductRow {
    fn into_product(self, fallback_description: &str) -> CatalogProduct {
        let product_type = self.product_type.parse().unwrap_or_default();
        let category = match self.category_name {
            Some(name) => Category { name, slug: self.category_slug },
            None => Category::default(),
        };
        CatalogProduct {
            id: ProductId(self.id),
            name: self.name,
            price: self.price,
            original_price: self.original_price,
            images: stored_images(self.images),
            description: Some(non_blank(self.description).unwrap_or_else(|| fallback_description.to_string())),
            category,
            product_type,
            in_stock: self.in_stock,
            is_customizable: self.is_customizable,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ComponentRow {
    id: i64,
    kind: String,
    name: String,
    price: Decimal,
    image: Option<String>,
    description: Option<String>,
    is_active: bool,
    color: Option<String>,
}

impl ComponentRow {
    fn into_component(self) -> Option<BouquetComponent> {
        let kind = match self.kind.parse::<ComponentKind>() {
            Ok(kind) => kind,
            Err(e) => {
                warn!(id = self.id, error = %e, "skipping component with unknown type");
                return None;
            }
        };
        Some(BouquetComponent {
            id: self.id,
            kind,
            name: self.name,
            price: self.price,
            image: non_blank(self.image),
            description: non_blank(self.description),
            is_active: self.is_active,
            color: non_blank(self.color),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: i64,
    name: String,
    price: Decimal,
    quantity: i32,
    description: Option<String>,
    images: Option<String>,
    category_name: Option<String>,
    in_stock: bool,
}

impl From<CartRow> for CartItemRecord {
    fn from(row: CartRow) -> Self {
        let images = stored_images(row.images);
        Self {
            id: ProductId(row.id),
            name: row.name,
            price: row.price,
            quantity: Quantity::new(u32::try_from(row.quantity).unwrap_or(0)),
            description: Some(non_blank(row.description).unwrap_or_else(|| ProductType::Bouquet.default_description().to_string())),
            image: images.first().cloned(),
            images,
            category: row.category_name.map(|name| Category { name, slug: None }).unwrap_or_default(),
            in_stock: row.in_stock,
        }
    }
}

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.price, p.original_price, p.images, p.description, \
    c.name AS category_name, c.slug AS category_slug, p.type AS product_type, p.in_stock, p.is_customizable";

// =============================================================================
// Catalog
// =============================================================================

async fn list_products(State(s): State<AppState>, Path(kind): Path<String>) -> ApiResult<Envelope<Vec<CatalogProduct>>> {
    let listing: ProductListing = kind.parse().map_err(|e: crate::domain::aggregates::UnknownVariant| reject(StatusCode::NOT_FOUND, e.to_string()))?;
    let limit = (listing == ProductListing::Featured).then_some(ProductListing::FEATURED_LIMIT);
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products p LEFT JOIN categories c ON p.category_id = c.id \
         WHERE p.in_stock AND ($1::text IS NULL OR p.type = $1) ORDER BY p.created_at DESC LIMIT $2"
    );
    let rows = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(listing.product_type().map(|t| t.as_str()))
        .bind(limit)
        .fetch_all(&s.db).await.map_err(internal)?;
    let fallback = listing.fallback_description();
    Ok(Json(Envelope::ok(rows.into_iter().map(|r| r.into_product(fallback)).collect())))
}

#[derive(Debug, Deserialize)]
struct ComponentParams {
    #[serde(rename = "type")]
    kind: Option<String>,
}

fn parse_kind(raw: &str) -> Result<ComponentKind, ApiError> {
    raw.parse().map_err(|e: crate::domain::aggregates::UnknownVariant| reject(StatusCode::BAD_REQUEST, e.to_string()))
}

async fn fetch_components(db: &PgPool, kind: Option<ComponentKind>) -> ApiResult<Envelope<Vec<BouquetComponent>>> {
    let rows = sqlx::query_as::<_, ComponentRow>(
        "SELECT id, type AS kind, name, price, image, description, is_active, color FROM bouquet_components \
         WHERE is_active AND ($1::text IS NULL OR type = $1) ORDER BY type, name",
    )
    .bind(kind.map(|k| k.as_str()))
    .fetch_all(db).await.map_err(internal)?;
    Ok(Json(Envelope::ok(rows.into_iter().filter_map(ComponentRow::into_component).collect())))
}

async fn list_components(State(s): State<AppState>, Query(p): Query<ComponentParams>) -> ApiResult<Envelope<Vec<BouquetComponent>>> {
    let kind = p.kind.as_deref().map(parse_kind).transpose()?;
    fetch_components(&s.db, kind).await
}

async fn components_by_type(State(s): State<AppState>, Path(kind): Path<String>) -> ApiResult<Envelope<Vec<BouquetComponent>>> {
    fetch_components(&s.db, Some(parse_kind(&kind)?)).await
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub success: bool,
    pub data: Vec<CartItemRecord>,
    pub subtotal: Decimal,
    pub total_items: u64,
    pub count: usize,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    #[validate(range(min = 1))]
    pub user_id: i64,
    #[validate(range(min = 1))]
    pub product_id: i64,
    #[validate(range(min = 1, max = 10000))]
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartRequest {
    #[validate(range(min = 1))]
    pub user_id: i64,
    #[validate(range(min = 1))]
    pub product_id: i64,
    #[validate(range(max = 10000))]
    pub quantity: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserProductRequest {
    #[validate(range(min = 1))]
    pub user_id: i64,
    #[validate(range(min = 1))]
    pub product_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    #[validate(range(min = 1))]
    pub user_id: i64,
}

async fn get_cart(State(s): State<AppState>, Path(user_id): Path<i64>) -> ApiResult<CartResponse> {
    let rows = sqlx::query_as::<_, CartRow>(
        "SELECT ci.product_id AS id, ci.quantity, p.name, p.price, p.description, p.images, p.in_stock, c.name AS category_name \
         FROM cart_items ci JOIN products p ON ci.product_id = p.id LEFT JOIN categories c ON p.category_id = c.id \
         WHERE ci.user_id = $1 ORDER BY ci.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(&s.db).await.map_err(internal)?;
    let data: Vec<CartItemRecord> = rows.into_iter().map(CartItemRecord::from).collect();
    let subtotal = data.iter().map(|r| r.price * Decimal::from(r.quantity.value())).sum();
    let total_items = data.iter().map(|r| u64::from(r.quantity.value())).sum();
    Ok(Json(CartResponse { success: true, count: data.len(), data, subtotal, total_items }))
}

async fn add_to_cart(State(s): State<AppState>, Json(r): Json<AddToCartRequest>) -> ApiResult<Envelope<()>> {
    let r = validated(r)?;
    let quantity = r.quantity.unwrap_or(1);
    let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(r.product_id).fetch_optional(&s.db).await.map_err(internal)?;
    if exists.is_none() {
        return Err(reject(StatusCode::NOT_FOUND, "Product not found"));
    }
    sqlx::query(
        "INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3) \
         ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity",
    )
    .bind(r.user_id).bind(r.product_id).bind(quantity as i32)
    .execute(&s.db).await.map_err(internal)?;
    info!(user_id = r.user_id, product_id = r.product_id, quantity, "cart item added");
    publish(&s, StorefrontEvent::Cart(CartEvent::ItemAdded { user_id: UserId(r.user_id), product_id: ProductId(r.product_id), quantity })).await;
    Ok(Json(Envelope::done("Added to cart")))
}

async fn delete_cart_item(s: &AppState, user_id: i64, product_id: i64) -> ApiResult<Envelope<()>> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
        .bind(user_id).bind(product_id).execute(&s.db).await.map_err(internal)?;
    if result.rows_affected() == 0 {
        return Ok(Json(Envelope::done("Item was not in the cart")));
    }
    publish(s, StorefrontEvent::Cart(CartEvent::ItemRemoved { user_id: UserId(user_id), product_id: ProductId(product_id) })).await;
    Ok(Json(Envelope::done("Removed from cart")))
}

async fn update_cart_item(State(s): State<AppState>, Json(r): Json<UpdateCartRequest>) -> ApiResult<Envelope<()>> {
    let r = validated(r)?;
    if r.quantity <= 0 {
        return delete_cart_item(&s, r.user_id, r.product_id).await;
    }
    let result = sqlx::query("UPDATE cart_items SET quantity = $1 WHERE user_id = $2 AND product_id = $3")
        .bind(r.quantity as i32).bind(r.user_id).bind(r.product_id)
        .execute(&s.db).await.map_err(internal)?;
    if result.rows_affected() == 0 {
        return Err(reject(StatusCode::NOT_FOUND, "Item not in cart"));
    }
    publish(&s, StorefrontEvent::Cart(CartEvent::QuantityChanged { user_id: UserId(r.user_id), product_id: ProductId(r.product_id), quantity: r.quantity })).await;
    Ok(Json(Envelope::done("Quantity updated")))
}

async fn remove_from_cart(State(s): State<AppState>, Json(r): Json<UserProductRequest>) -> ApiResult<Envelope<()>> {
    let r = validated(r)?;
    delete_cart_item(&s, r.user_id, r.product_id).await
}

async fn clear_cart(State(s): State<AppState>, Json(r): Json<UserRequest>) -> ApiResult<Envelope<()>> {
    let r = validated(r)?;
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(r.user_id).execute(&s.db).await.map_err(internal)?;
    let removed = result.rows_affected();
    info!(user_id = r.user_id, removed, "cart cleared");
    publish(&s, StorefrontEvent::Cart(CartEvent::Cleared { user_id: UserId(r.user_id), removed })).await;
    Ok(Json(Envelope::done(format!("Cart cleared, {removed} items removed"))))
}

// =============================================================================
// Favorites
// =============================================================================

async fn get_favorites(State(s): State<AppState>, Path(user_id): Path<i64>) -> ApiResult<Envelope<Vec<CatalogProduct>>> {
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM user_favorites uf JOIN products p ON uf.product_id = p.id \
         LEFT JOIN categories c ON p.category_id = c.id WHERE uf.user_id = $1 ORDER BY uf.created_at DESC"
    );
    let rows = sqlx::query_as::<_, ProductRow>(&sql).bind(user_id).fetch_all(&s.db).await.map_err(internal)?;
    let fallback = ProductListing::Bouquets.fallback_description();
    Ok(Json(Envelope::ok(rows.into_iter().map(|r| r.into_product(fallback)).collect())))
}

async fn add_favorite(State(s): State<AppState>, Json(r): Json<UserProductRequest>) -> ApiResult<Envelope<()>> {
    let r = validated(r)?;
    let result = sqlx::query("INSERT INTO user_favorites (user_id, product_id) VALUES ($1, $2) ON CONFLICT (user_id, product_id) DO NOTHING")
        .bind(r.user_id).bind(r.product_id).execute(&s.db).await.map_err(internal)?;
    if result.rows_affected() == 0 {
        return Err(reject(StatusCode::CONFLICT, "Already in favorites"));
    }
    publish(&s, StorefrontEvent::Favorites(FavoritesEvent::Added { user_id: UserId(r.user_id), product_id: ProductId(r.product_id) })).await;
    Ok(Json(Envelope::done("Added to favorites")))
}

async fn remove_favorite(State(s): State<AppState>, Json(r): Json<UserProductRequest>) -> ApiResult<Envelope<()>> {
    let r = validated(r)?;
    let result = sqlx::query("DELETE FROM user_favorites WHERE user_id = $1 AND product_id = $2")
        .bind(r.user_id).bind(r.product_id).execute(&s.db).await.map_err(internal)?;
    if result.rows_affected() == 0 {
        return Ok(Json(Envelope::done("Product was not in favorites")));
    }
    publish(&s, StorefrontEvent::Favorites(FavoritesEvent::Removed { user_id: UserId(r.user_id), product_id: ProductId(r.product_id) })).await;
    Ok(Json(Envelope::done("Removed from favorites")))
}

async fn check_favorite(State(s): State<AppState>, Path((user_id, product_id)): Path<(i64, i64)>) -> ApiResult<FavoriteCheck> {
    let found: Option<(i64,)> = sqlx::query_as("SELECT product_id FROM user_favorites WHERE user_id = $1 AND product_id = $2")
        .bind(user_id).bind(product_id).fetch_optional(&s.db).await.map_err(internal)?;
    Ok(Json(FavoriteCheck { success: true, is_favorite: found.is_some() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use crate::images::parse_image_list;
    use axum::http::Request;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    /// Router over a pool that never connects; only routes that reject before
    /// touching the database can be exercised.
    fn offline_app() -> Router {
        let db = PgPoolOptions::new().connect_lazy("postgres://storefront@localhost/storefront").unwrap();
        router(AppState { db, nats: None })
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder().method("POST").uri(uri).header("content-type", "application/json").body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = offline_app().oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_unknown_listing_is_not_found() {
        let response = offline_app().oneshot(Request::builder().uri("/api/products/shoes").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_unknown_component_type_is_rejected() {
        let response = offline_app().oneshot(Request::builder().uri("/api/bouquet-components?type=ribbon").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_cart_requests_are_rejected() {
        let app = offline_app();
        let response = app.clone().oneshot(post_json("/api/cart/add", serde_json::json!({"userId": 0, "productId": 7}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = app.oneshot(post_json("/api/cart/add", serde_json::json!({"userId": 1, "productId": 7, "quantity": 0}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_product_row_fallbacks() {
        let row = ProductRow {
            id: 4, name: "Ficus".into(), price: Decimal::new(1900, 0), original_price: None, images: None,
            description: Some("  ".into()), category_name: None, category_slug: None, product_type: "plant".into(),
            in_stock: true, is_customizable: false,
        };
        let product = row.into_product(ProductListing::Plants.fallback_description());
        assert_eq!(product.description.as_deref(), Some("A beautiful houseplant"));
        assert_eq!(product.images, vec![crate::images::PLACEHOLDER_IMAGE.to_string()]);
        assert_eq!(product.category.name, "Bouquets");
        assert_eq!(product.product_type, ProductType::Plant);
    }

    #[test]
    fn test_cart_row_uses_first_image() {
        let row = CartRow {
            id: 7, name: "Peonies".into(), price: Decimal::new(500, 0), quantity: 3, description: None,
            images: Some(r#"["/a.jpg","/b.jpg"]"#.into()), category_name: Some("Seasonal".into()), in_stock: true,
        };
        let record = CartItemRecord::from(row);
        assert_eq!(record.image.as_deref(), Some("/a.jpg"));
        assert_eq!(record.quantity.value(), 3);
        assert_eq!(record.category.name, "Seasonal");
        assert_eq!(parse_image_list(&Value::String(r#"["/a.jpg"]"#.into())), vec!["/a.jpg"]);
    }
}
