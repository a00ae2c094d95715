//! Favorites store. Favorites exist only for signed-in users and are always
//! re-read from the server after a change.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use crate::client::FavoritesApi;
use crate::domain::aggregates::CatalogProduct;
use crate::domain::value_objects::{ProductId, UserId};
use crate::{Result, StorefrontError};
use super::{StoreCell, StoreState, Ticket};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FavoritesState {
    pub items: Vec<CatalogProduct>,
    pub identity: Option<UserId>,
    pub loading: bool,
    pub error: Option<StorefrontError>,
}

impl StoreState for FavoritesState {
    fn identity(&self) -> Option<UserId> { self.identity }
    fn reset(&mut self, identity: Option<UserId>) {
        self.identity = identity;
        self.items.clear();
    }
    fn set_loading(&mut self, loading: bool) { self.loading = loading; }
    fn set_error(&mut self, error: Option<StorefrontError>) { self.error = error; }
}

#[derive(Clone)]
pub struct FavoritesStore {
    api: Arc<dyn FavoritesApi>,
    cell: Arc<StoreCell<FavoritesState>>,
}

impl std::fmt::Debug for FavoritesStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesStore").field("state", &self.state()).finish()
    }
}

fn sign_in_required() -> StorefrontError {
    StorefrontError::Validation("Sign in to save favorites".to_string())
}

impl FavoritesStore {
    pub fn new(api: Arc<dyn FavoritesApi>) -> Self {
        Self { api, cell: Arc::new(StoreCell::new(FavoritesState::default())) }
    }

    pub fn state(&self) -> FavoritesState { self.cell.snapshot() }
    pub fn items(&self) -> Vec<CatalogProduct> { self.cell.read(|s| s.items.clone()) }
    pub fn identity(&self) -> Option<UserId> { self.cell.read(|s| s.identity) }
    pub fn is_loading(&self) -> bool { self.cell.read(|s| s.loading) }
    pub fn error(&self) -> Option<StorefrontError> { self.cell.read(|s| s.error.clone()) }
    pub fn clear_error(&self) { self.cell.clear_error() }
    pub fn count(&self) -> usize { self.cell.read(|s| s.items.len()) }

    /// Membership in the loaded list; no request is made.
    pub fn is_favorite(&self, product: ProductId) -> bool {
        self.cell.read(|s| s.items.iter().any(|p| p.id == product))
    }

    /// Switching to a user loads their favorites; signing out empties the list.
    #[instrument(skip(self))]
    pub async fn set_identity(&self, identity: Option<UserId>) -> bool {
        let Some(ticket) = self.cell.switch_identity(identity) else { return true };
        info!(?identity, "favorites identity changed");
        let result = match identity {
            Some(user) => self.reload(&ticket, user).await,
            None => Ok(()),
        };
        self.cell.finish(ticket, result)
    }

    #[instrument(skip(self))]
    pub async fn refresh(&self) -> bool {
        let ticket = self.cell.begin();
        let result = match ticket.identity {
            Some(user) => self.reload(&ticket, user).await,
            None => Ok(()),
        };
        self.cell.finish(ticket, result)
    }

    /// Adding a product that is already a favorite succeeds without a request.
    #[instrument(skip(self, product), fields(product = %product.id))]
    pub async fn add(&self, product: &CatalogProduct) -> bool {
        let Some(user) = self.identity() else { return self.cell.fail(sign_in_required()) };
        if self.is_favorite(product.id) {
            return true;
        }
        let ticket = self.cell.begin();
        let result = match self.api.add_favorite(user, product.id).await {
            Ok(()) => self.reload(&ticket, user).await,
            Err(e) => Err(e),
        };
        self.cell.finish(ticket, result)
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, product: ProductId) -> bool {
        let Some(user) = self.identity() else { return self.cell.fail(sign_in_required()) };
        let ticket = self.cell.begin();
        let result = match self.api.remove_favorite(user, product).await {
            Ok(()) => self.reload(&ticket, user).await,
            Err(e) => Err(e),
        };
        self.cell.finish(ticket, result)
    }

    /// Adds or removes depending on current membership.
    pub async fn toggle(&self, product: &CatalogProduct) -> bool {
        if self.is_favorite(product.id) {
            self.remove(product.id).await
        } else {
            self.add(product).await
        }
    }

    /// Removes every favorite concurrently, then reloads.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> bool {
        let Some(user) = self.identity() else { return self.cell.fail(sign_in_required()) };
        let ids: Vec<ProductId> = self.cell.read(|s| s.items.iter().map(|p| p.id).collect());
        let ticket = self.cell.begin();
        let removals = join_all(ids.iter().map(|id| self.api.remove_favorite(user, *id))).await;
        let failed = removals.into_iter().filter_map(|r| r.err()).last();
        if let Some(e) = &failed {
            warn!(%user, error = %e, "some favorites could not be removed");
        }
        let reloaded = self.reload(&ticket, user).await;
        let result = match failed {
            Some(e) => Err(e),
            None => reloaded,
        };
        self.cell.finish(ticket, result)
    }

    /// Asks the server directly; `None` when signed out or on failure.
    pub async fn check_remote(&self, product: ProductId) -> Option<bool> {
        let user = self.identity()?;
        match self.api.is_favorite(user, product).await {
            Ok(found) => Some(found),
            Err(e) => {
                warn!(%user, %product, error = %e, "favorite check failed");
                None
            }
        }
    }

    async fn reload(&self, ticket: &Ticket, user: UserId) -> Result<()> {
        let items = self.api.fetch_favorites(user).await?;
        self.cell.commit(ticket, |state| state.items = items);
        Ok(())
    }
}
