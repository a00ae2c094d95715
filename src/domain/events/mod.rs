//! Domain events published by the storefront backend after a mutation.
use chrono::{DateTime, Utc};
use crate::domain::value_objects::{ProductId, UserId};
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum StorefrontEvent {
    Cart(CartEvent),
    Favorites(FavoritesEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CartEvent {
    ItemAdded { user_id: UserId, product_id: ProductId, quantity: i64 },
    QuantityChanged { user_id: UserId, product_id: ProductId, quantity: i64 },
    ItemRemoved { user_id: UserId, product_id: ProductId },
    Cleared { user_id: UserId, removed: u64 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FavoritesEvent {
    Added { user_id: UserId, product_id: ProductId },
    Removed { user_id: UserId, product_id: ProductId },
}

impl StorefrontEvent {
    /// NATS subject, e.g. `storefront.cart.item_added`.
    pub fn subject(&self) -> String {
        let (aggregate, event) = match self {
            Self::Cart(e) => ("cart", match e {
                CartEvent::ItemAdded { .. } => "item_added",
                CartEvent::QuantityChanged { .. } => "quantity_changed",
                CartEvent::ItemRemoved { .. } => "item_removed",
                CartEvent::Cleared { .. } => "cleared",
            }),
            Self::Favorites(e) => ("favorites", match e {
                FavoritesEvent::Added { .. } => "added",
                FavoritesEvent::Removed { .. } => "removed",
            }),
        };
        format!("storefront.{aggregate}.{event}")
    }

    pub fn published(self) -> PublishedEvent {
        PublishedEvent { id: Uuid::new_v4(), occurred_at: Utc::now(), event: self }
    }
}

/// Wire form of an event: the event fields plus an id and timestamp.
#[derive(Clone, Debug, Serialize)]
pub struct PublishedEvent {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: StorefrontEvent,
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_subject_and_payload() {
        let e = StorefrontEvent::Cart(CartEvent::ItemAdded { user_id: UserId(1), product_id: ProductId(7), quantity: 2 });
        assert_eq!(e.subject(), "storefront.cart.item_added");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["aggregate"], "cart");
        assert_eq!(json["event"], "item_added");
        assert_eq!(json["product_id"], 7);

        let published = serde_json::to_value(e.published()).unwrap();
        assert_eq!(published["event"], "item_added");
        assert!(published["id"].is_string());
        assert!(published["occurred_at"].is_string());
    }
}
