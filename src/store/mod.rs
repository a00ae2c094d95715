//! Client-side stores keyed on the current user identity.
//!
//! Stores are cheap to clone and safe to share between tasks. Operations
//! never return errors: they record the failure in the state's `error` field
//! and report success as a `bool`.

pub mod cart;
pub mod favorites;

pub use cart::{CartState, CartStore};
pub use favorites::{FavoritesState, FavoritesStore};

use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use crate::domain::value_objects::UserId;
use crate::{Result, StorefrontError};

pub(crate) trait StoreState {
    fn identity(&self) -> Option<UserId>;
    /// Switches identity and drops data belonging to the previous one.
    fn reset(&mut self, identity: Option<UserId>);
    fn set_loading(&mut self, loading: bool);
    fn set_error(&mut self, error: Option<StorefrontError>);
}

/// Handle for one in-flight operation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ticket {
    pub generation: u64,
    pub identity: Option<UserId>,
}

struct Inner<S> {
    state: S,
    generation: u64,
    in_flight: usize,
}

/// Shared state plus the bookkeeping for loading and stale completions.
///
/// Each identity switch starts a new generation; completions carrying an
/// older generation leave the state alone.
pub(crate) struct StoreCell<S> {
    inner: Mutex<Inner<S>>,
}

impl<S: StoreState + Clone> StoreCell<S> {
    pub fn new(state: S) -> Self {
        Self { inner: Mutex::new(Inner { state, generation: 0, in_flight: 0 }) }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R { f(&self.lock().state) }

    pub fn snapshot(&self) -> S { self.read(S::clone) }

    pub fn clear_error(&self) { self.lock().state.set_error(None); }

    pub fn begin(&self) -> Ticket {
        let mut inner = self.lock();
        inner.in_flight += 1;
        inner.state.set_loading(true);
        inner.state.set_error(None);
        Ticket { generation: inner.generation, identity: inner.state.identity() }
    }

    /// Starts a new generation for `identity`, or `None` if it is already current.
    pub fn switch_identity(&self, identity: Option<UserId>) -> Option<Ticket> {
        {
            let mut inner = self.lock();
            if inner.state.identity() == identity {
                return None;
            }
            inner.generation += 1;
            inner.state.reset(identity);
        }
        Some(self.begin())
    }

    /// Runs `f` against the state if `ticket` is still current. A stale ticket is a no-op.
    pub fn try_commit(&self, ticket: &Ticket, f: impl FnOnce(&mut S) -> Result<()>) -> Result<()> {
        let mut inner = self.lock();
        if inner.generation != ticket.generation {
            debug!(stale = ticket.generation, current = inner.generation, "dropping stale store update");
            return Ok(());
        }
        f(&mut inner.state)
    }

    pub fn commit(&self, ticket: &Ticket, f: impl FnOnce(&mut S)) {
        let _ = self.try_commit(ticket, |s| { f(s); Ok(()) });
    }

    /// Settles an operation started with [`StoreCell::begin`].
    pub fn finish(&self, ticket: Ticket, result: Result<()>) -> bool {
        let mut inner = self.lock();
        inner.in_flight = inner.in_flight.saturating_sub(1);
        let loading = inner.in_flight > 0;
        inner.state.set_loading(loading);
        match result {
            Ok(()) => true,
            Err(e) => {
                if inner.generation == ticket.generation {
                    inner.state.set_error(Some(e));
                }
                false
            }
        }
    }

    /// Records a failure detected before any request was made.
    pub fn fail(&self, error: StorefrontError) -> bool {
        self.lock().state.set_error(Some(error));
        false
    }
}
