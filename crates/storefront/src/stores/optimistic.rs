//! Optimistic list shared by the cart and wishlist stores.
//!
//! Every mutation is applied to the published list immediately and returns a
//! [`Prior`] describing what the touched entry looked like before. If the
//! backend rejects the change, [`OptimisticList::rollback`] puts exactly that
//! entry back, at its old position, without disturbing concurrent changes to
//! other entries.
//!
//! Three mechanisms keep overlapping operations honest:
//!
//! - Mutations of the same key queue behind a per-key lock ([`KeyedLocks`]),
//!   so an entry's rollback record is never captured mid-flight of another
//!   change to it. Different keys proceed in parallel.
//! - A generation counter is bumped by [`OptimisticList::reset`]. Rollbacks,
//!   restores and server-list adoptions carry the generation they started in
//!   and are dropped when it moved, so a response that lands after sign-out
//!   cannot resurrect the previous user's state.
//! - State lives in a `watch` channel: readers always see a complete list.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard, watch};
use tracing::debug;

use shopfront_core::{CartLine, ProductId, WishlistEntry};

/// Items addressed by product id.
pub trait Keyed: Clone + Send + Sync + 'static {
    /// The product this item refers to.
    fn key(&self) -> &ProductId;
}

impl Keyed for CartLine {
    fn key(&self) -> &ProductId {
        self.product_id()
    }
}

impl Keyed for WishlistEntry {
    fn key(&self) -> &ProductId {
        self.product_id()
    }
}

/// State of one entry before a speculative change.
#[derive(Debug, Clone)]
#[must_use = "a Prior must be rolled back or dropped deliberately"]
pub struct Prior<T> {
    key: ProductId,
    /// Position and value before the change; `None` if the entry did not exist.
    slot: Option<(usize, T)>,
    generation: u64,
}

impl<T> Prior<T> {
    /// Generation the change was made in.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the entry existed before the change.
    pub const fn existed(&self) -> bool {
        self.slot.is_some()
    }
}

/// Whole-list state before a speculative change.
#[derive(Debug, Clone)]
#[must_use = "a Snapshot must be restored or dropped deliberately"]
pub struct Snapshot<T> {
    items: Vec<T>,
    generation: u64,
}

impl<T> Snapshot<T> {
    /// Generation the change was made in.
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// Per-key async locks; entries nobody holds are pruned on the next acquire.
#[derive(Default)]
pub struct KeyedLocks {
    locks: StdMutex<HashMap<ProductId, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    /// Wait for exclusive use of `key`.
    pub async fn acquire(&self, key: &ProductId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                locks
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}

/// A published list mutated optimistically.
pub struct OptimisticList<T> {
    state: watch::Sender<Vec<T>>,
    generation: AtomicU64,
    locks: KeyedLocks,
}

impl<T: Keyed> OptimisticList<T> {
    /// Create a list holding `items`.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            state: watch::Sender::new(items),
            generation: AtomicU64::new(0),
            locks: KeyedLocks::default(),
        }
    }

    /// Copy of the current list.
    pub fn items(&self) -> Vec<T> {
        self.state.borrow().clone()
    }

    /// Run `f` against the current list without copying it.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Whether an entry for `key` exists.
    pub fn contains(&self, key: &ProductId) -> bool {
        self.with_items(|items| items.iter().any(|i| i.key() == key))
    }

    /// Entry for `key`, if present.
    pub fn get(&self, key: &ProductId) -> Option<T> {
        self.with_items(|items| items.iter().find(|i| i.key() == key).cloned())
    }

    /// Receive every published version of the list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.state.subscribe()
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Whether work started in `generation` may still touch the list.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Serialize mutations of `key`.
    pub async fn lock(&self, key: &ProductId) -> OwnedMutexGuard<()> {
        self.locks.acquire(key).await
    }

    // =========================================================================
    // Speculative Mutations
    // =========================================================================

    /// Insert or rewrite the entry for `key`.
    ///
    /// `f` receives the existing entry (if any) and returns its replacement.
    /// New entries are appended.
    pub fn upsert(&self, key: &ProductId, f: impl FnOnce(Option<&T>) -> T) -> Prior<T> {
        let generation = self.generation();
        let mut slot = None;
        self.state.send_modify(|items| {
            match items.iter().position(|i| i.key() == key) {
                Some(index) => {
                    if let Some(existing) = items.get_mut(index) {
                        let next = f(Some(existing));
                        slot = Some((index, std::mem::replace(existing, next)));
                    }
                }
                None => items.push(f(None)),
            }
        });
        Prior {
            key: key.clone(),
            slot,
            generation,
        }
    }

    /// Rewrite the entry for `key` in place. Returns `None` (and changes
    /// nothing) when there is no such entry.
    pub fn update(&self, key: &ProductId, f: impl FnOnce(&mut T)) -> Option<Prior<T>> {
        let generation = self.generation();
        let mut slot = None;
        self.state.send_if_modified(|items| {
            let Some(index) = items.iter().position(|i| i.key() == key) else {
                return false;
            };
            let Some(existing) = items.get_mut(index) else {
                return false;
            };
            slot = Some((index, existing.clone()));
            f(existing);
            true
        });
        slot.map(|slot| Prior {
            key: key.clone(),
            slot: Some(slot),
            generation,
        })
    }

    /// Remove the entry for `key`.
    pub fn remove(&self, key: &ProductId) -> Prior<T> {
        let generation = self.generation();
        let mut slot = None;
        self.state.send_if_modified(|items| {
            let Some(index) = items.iter().position(|i| i.key() == key) else {
                return false;
            };
            slot = Some((index, items.remove(index)));
            true
        });
        Prior {
            key: key.clone(),
            slot,
            generation,
        }
    }

    /// Empty the list.
    pub fn take_all(&self) -> Snapshot<T> {
        let generation = self.generation();
        let items = self.state.send_replace(Vec::new());
        Snapshot { items, generation }
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Undo the change recorded in `prior`. Returns `false` when the prior is
    /// stale and was discarded.
    pub fn rollback(&self, prior: Prior<T>) -> bool {
        if !self.is_current(prior.generation) {
            debug!(key = %prior.key, "discarding stale rollback");
            return false;
        }

        let Prior { key, slot, .. } = prior;
        self.state.send_modify(|items| {
            let position = items.iter().position(|i| i.key() == &key);
            match (slot, position) {
                (Some((_, old)), Some(index)) => {
                    if let Some(current) = items.get_mut(index) {
                        *current = old;
                    }
                }
                (Some((index, old)), None) => items.insert(index.min(items.len()), old),
                (None, Some(index)) => {
                    items.remove(index);
                }
                (None, None) => {}
            }
        });
        true
    }

    /// Put back a whole-list snapshot. Returns `false` when stale.
    pub fn restore(&self, snapshot: Snapshot<T>) -> bool {
        if !self.is_current(snapshot.generation) {
            debug!("discarding stale snapshot restore");
            return false;
        }
        self.state.send_replace(snapshot.items);
        true
    }

    /// Adopt an authoritative list fetched in `generation`. Returns `false`
    /// when the generation moved and the list was discarded.
    pub fn replace(&self, items: Vec<T>, generation: u64) -> bool {
        if !self.is_current(generation) {
            debug!("discarding stale server list");
            return false;
        }
        self.state.send_replace(items);
        true
    }

    /// Drop all state and invalidate every operation in flight.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.state.send_replace(Vec::new());
    }
}
