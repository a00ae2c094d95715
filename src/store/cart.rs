//! Cart store.
//!
//! Guests keep the whole cart in local storage under [`GUEST_CART_KEY`].
//! Signed-in users keep catalog lines on the server; every server mutation is
//! followed by a full reload. Custom compositions are unknown to the server,
//! so they always live in local storage (per user under `cart.custom.<id>`)
//! and are appended after the server lines.

use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use crate::client::CartApi;
use crate::config::GuestCartPolicy;
use crate::domain::aggregates::{CartLine, CartLines, Purchasable};
use crate::domain::value_objects::{LineId, Quantity, UserId};
use crate::storage::{read_json, write_json, LocalStorage};
use crate::{Result, StorefrontError};
use super::{StoreCell, StoreState, Ticket};

pub const GUEST_CART_KEY: &str = "cart";

fn custom_key(user: UserId) -> String { format!("cart.custom.{user}") }

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CartState {
    pub lines: CartLines,
    pub identity: Option<UserId>,
    pub loading: bool,
    pub error: Option<StorefrontError>,
}

impl StoreState for CartState {
    fn identity(&self) -> Option<UserId> { self.identity }
    fn reset(&mut self, identity: Option<UserId>) {
        self.identity = identity;
        self.lines.clear();
    }
    fn set_loading(&mut self, loading: bool) { self.loading = loading; }
    fn set_error(&mut self, error: Option<StorefrontError>) { self.error = error; }
}

#[derive(Clone)]
pub struct CartStore {
    api: Arc<dyn CartApi>,
    storage: Arc<dyn LocalStorage>,
    policy: GuestCartPolicy,
    cell: Arc<StoreCell<CartState>>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore").field("policy", &self.policy).field("state", &self.state()).finish()
    }
}

impl CartStore {
    /// Opens the store in guest mode, reading the guest cart from `storage`.
    pub fn new(api: Arc<dyn CartApi>, storage: Arc<dyn LocalStorage>, policy: GuestCartPolicy) -> Self {
        let store = Self { api, storage, policy, cell: Arc::new(StoreCell::new(CartState::default())) };
        let ticket = store.cell.begin();
        let result = store.load_guest(&ticket);
        store.cell.finish(ticket, result);
        store
    }

    pub fn state(&self) -> CartState { self.cell.snapshot() }
    pub fn lines(&self) -> Vec<CartLine> { self.cell.read(|s| s.lines.lines().to_vec()) }
    pub fn identity(&self) -> Option<UserId> { self.cell.read(|s| s.identity) }
    pub fn is_loading(&self) -> bool { self.cell.read(|s| s.loading) }
    pub fn error(&self) -> Option<StorefrontError> { self.cell.read(|s| s.error.clone()) }
    pub fn clear_error(&self) { self.cell.clear_error() }

    /// Σ price × quantity over all lines, unrounded.
    pub fn subtotal(&self) -> Decimal { self.cell.read(|s| s.lines.subtotal()) }
    /// Distinct lines, as shown on the cart badge.
    pub fn distinct_line_count(&self) -> usize { self.cell.read(|s| s.lines.distinct_line_count()) }
    pub fn total_quantity(&self) -> u32 { self.cell.read(|s| s.lines.total_quantity()) }
    pub fn is_in_cart(&self, id: &LineId) -> bool { self.cell.read(|s| s.lines.contains(id)) }
    pub fn item_quantity(&self, id: &LineId) -> u32 { self.cell.read(|s| s.lines.quantity_of(id)) }

    /// Switches to `identity` and replaces the lines with that identity's cart.
    /// No-op when the identity is unchanged.
    #[instrument(skip(self))]
    pub async fn set_identity(&self, identity: Option<UserId>) -> bool {
        let previous = self.identity();
        let Some(ticket) = self.cell.switch_identity(identity) else { return true };
        info!(?previous, ?identity, "cart identity changed");
        let result = match identity {
            Some(user) => {
                let merged = match (previous, self.policy) {
                    (None, GuestCartPolicy::Merge) => self.merge_guest_cart(user).await,
                    _ => Ok(()),
                };
                let reloaded = self.reload_remote(&ticket, user).await;
                merged.and(reloaded)
            }
            None => self.load_guest(&ticket),
        };
        self.cell.finish(ticket, result)
    }

    /// Re-reads the cart for the current identity.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> bool {
        let ticket = self.cell.begin();
        let result = match ticket.identity {
            Some(user) => self.reload_remote(&ticket, user).await,
            None => self.load_guest(&ticket),
        };
        self.cell.finish(ticket, result)
    }

    /// Adds `quantity` units. Catalog products accumulate onto their line;
    /// a custom composition only accumulates onto its own id.
    #[instrument(skip(self, item))]
    pub async fn add(&self, item: impl Into<Purchasable>, quantity: u32) -> bool {
        let item = item.into();
        let Some(quantity) = Quantity::positive(i64::from(quantity)) else {
            return self.cell.fail(StorefrontError::Validation("Quantity must be at least 1".to_string()));
        };
        if quantity.value() > Quantity::MAX_PER_LINE {
            return self.cell.fail(too_many());
        }
        let ticket = self.cell.begin();
        let remote = match (&item, ticket.identity) {
            (Purchasable::Product(p), Some(user)) => Some((user, p.id)),
            _ => None,
        };
        let result = match remote {
            Some((user, product)) => self.sync_remote(&ticket, user, self.api.add_item(user, product, quantity)).await,
            None => self.mutate_local(&ticket, move |lines| lines.add(item, quantity)),
        };
        self.cell.finish(ticket, result)
    }

    /// Sets an absolute quantity; zero or less removes the line, above
    /// [`Quantity::MAX_PER_LINE`] is rejected and nothing changes.
    #[instrument(skip(self))]
    pub async fn update_quantity(&self, id: &LineId, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove(id).await;
        }
        if quantity > i64::from(Quantity::MAX_PER_LINE) {
            return self.cell.fail(too_many());
        }
        let ticket = self.cell.begin();
        let result = match (id, ticket.identity) {
            (LineId::Product(product), Some(user)) => self.sync_remote(&ticket, user, self.api.update_item(user, *product, quantity)).await,
            _ => self.mutate_local(&ticket, |lines| { lines.set_quantity(id, quantity); }),
        };
        self.cell.finish(ticket, result)
    }

    /// Removing a line that is not in the cart succeeds and changes nothing.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: &LineId) -> bool {
        let ticket = self.cell.begin();
        let result = match (id, ticket.identity) {
            (LineId::Product(product), Some(user)) => self.sync_remote(&ticket, user, self.api.remove_item(user, *product)).await,
            _ => self.mutate_local(&ticket, |lines| { lines.remove(id); }),
        };
        self.cell.finish(ticket, result)
    }

    #[instrument(skip(self))]
    pub async fn clear(&self) -> bool {
        let ticket = self.cell.begin();
        let result = match ticket.identity {
            Some(user) => {
                let storage = Arc::clone(&self.storage);
                let cleared = async move {
                    self.api.clear(user).await?;
                    storage.remove(&custom_key(user))
                };
                self.sync_remote(&ticket, user, cleared).await
            }
            None => self.cell.try_commit(&ticket, |state| {
                self.storage.remove(GUEST_CART_KEY)?;
                state.lines.clear();
                Ok(())
            }),
        };
        self.cell.finish(ticket, result)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    async fn sync_remote(&self, ticket: &Ticket, user: UserId, call: impl Future<Output = Result<()>>) -> Result<()> {
        call.await?;
        self.reload_remote(ticket, user).await
    }

    async fn reload_remote(&self, ticket: &Ticket, user: UserId) -> Result<()> {
        let remote = self.api.fetch_cart(user).await?;
        let custom: CartLines = read_json(self.storage.as_ref(), &custom_key(user))?.unwrap_or_default();
        let mut lines = CartLines::new(remote);
        lines.extend(custom);
        self.cell.commit(ticket, |state| state.lines = lines);
        Ok(())
    }

    fn load_guest(&self, ticket: &Ticket) -> Result<()> {
        let lines: CartLines = read_json(self.storage.as_ref(), GUEST_CART_KEY)?.unwrap_or_default();
        self.cell.commit(ticket, |state| state.lines = lines);
        Ok(())
    }

    /// Applies `f` to a copy of the lines, persists it, then publishes it.
    /// A failed write leaves the state untouched.
    fn mutate_local(&self, ticket: &Ticket, f: impl FnOnce(&mut CartLines)) -> Result<()> {
        self.cell.try_commit(ticket, |state| {
            let mut next = state.lines.clone();
            f(&mut next);
            match ticket.identity {
                None => write_json(self.storage.as_ref(), GUEST_CART_KEY, &next)?,
                Some(user) => write_json(self.storage.as_ref(), &custom_key(user), &next.custom_only())?,
            }
            state.lines = next;
            Ok(())
        })
    }

    /// Moves the guest cart into `user`'s cart. Lines are dropped from the guest
    /// cart as they are accepted, so a retry never double-adds.
    async fn merge_guest_cart(&self, user: UserId) -> Result<()> {
        let storage = self.storage.as_ref();
        let Some(mut guest) = read_json::<CartLines>(storage, GUEST_CART_KEY)? else { return Ok(()) };
        if guest.is_empty() {
            return storage.remove(GUEST_CART_KEY);
        }
        let custom = guest.custom_only();
        if !custom.is_empty() {
            let mut mine: CartLines = read_json(storage, &custom_key(user))?.unwrap_or_default();
            mine.extend(custom.clone());
            write_json(storage, &custom_key(user), &mine)?;
            for line in custom.lines() {
                guest.remove(&line.id());
            }
            write_json(storage, GUEST_CART_KEY, &guest)?;
        }
        let products: Vec<_> = guest.product_lines().map(|p| (p.product_id, p.quantity)).collect();
        for (product, quantity) in products {
            if let Err(e) = self.api.add_item(user, product, quantity).await {
                warn!(%user, %product, error = %e, "guest cart merge interrupted");
                return Err(e);
            }
            guest.remove(&LineId::Product(product));
            write_json(storage, GUEST_CART_KEY, &guest)?;
        }
        info!(%user, "guest cart merged");
        storage.remove(GUEST_CART_KEY)
    }
}

fn too_many() -> StorefrontError {
    StorefrontError::Validation(format!("Quantity must be at most {}", Quantity::MAX_PER_LINE))
}
