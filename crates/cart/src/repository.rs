//! Cart repository.
//!
//! [`CartRepository`] owns the authoritative cart for a session. It loads the
//! persisted record when opened and serves reads from the cached snapshot.
//! Every mutation is a read-modify-write of the whole persisted cart: the
//! stored record is read first, and if another writer has saved since this
//! repository last saw it, that record becomes the base the change is
//! applied to. The whole cart is then written back.
//!
//! # Persistence failures
//!
//! A failed save never undoes the in-memory change. The operation's
//! [`Applied`] carries the `StorageError` so the caller can warn that changes
//! may not survive a reload; the session keeps working from memory.
//!
//! # Concurrent writers
//!
//! Sequential writes from two repositories over one store (two tabs) build
//! on each other. Only a write that lands between another repository's read
//! and its save is lost: the persisted envelope carries a monotonic version,
//! and a save that finds the stored version moved after the read counts a
//! lost update and logs a warning. Nothing is merged.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::instrument;
use uuid::Uuid;

use recipe_box_core::{
    AddOutcome, Cart, ItemId, LineItem, NormalizedCatalogRecord, RemoveOutcome, SetQuantityOutcome,
};

use crate::payload::{self, StoredCart};
use crate::store::{CartStore, StorageError};

/// Outcome of a mutating repository operation.
///
/// `storage_error` is set when the cart changed in memory but could not be
/// persisted.
#[derive(Debug)]
#[must_use]
pub struct Applied<T> {
    outcome: T,
    storage_error: Option<StorageError>,
}

impl<T> Applied<T> {
    const fn unchanged(outcome: T) -> Self {
        Self {
            outcome,
            storage_error: None,
        }
    }

    /// The operation's result.
    pub fn outcome(&self) -> T
    where
        T: Copy,
    {
        self.outcome
    }

    /// Whether everything the operation changed reached the store.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.storage_error.is_none()
    }

    #[must_use]
    pub const fn storage_error(&self) -> Option<&StorageError> {
        self.storage_error.as_ref()
    }

    /// Split into the outcome and the persistence failure, if any.
    pub fn into_parts(self) -> (T, Option<StorageError>) {
        (self.outcome, self.storage_error)
    }
}

/// Repository for the visitor's cart.
///
/// Cheaply cloneable via `Arc`; clones share one cart, so a detail screen
/// and the cart screen can hold the same repository.
pub struct CartRepository<S> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    store: S,
    key: String,
    writer: Uuid,
    state: Mutex<State>,
    changes: watch::Sender<Cart>,
}

struct State {
    cart: Cart,
    /// Version of the stored record this repository last read or wrote.
    version: u64,
    lost_updates: u64,
}

impl<S> Clone for CartRepository<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: CartStore> CartRepository<S> {
    /// Open the cart stored under `key`.
    ///
    /// An absent, unreadable, or corrupt record yields an empty cart; the
    /// problem is logged, never returned.
    pub fn open(store: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let (cart, version) = load_snapshot(&store, &key);
        tracing::info!(key = %key, items = cart.len(), version, "Cart loaded");

        let (changes, _) = watch::channel(cart.clone());
        Self {
            inner: Arc::new(Inner {
                store,
                key,
                writer: Uuid::new_v4(),
                state: Mutex::new(State {
                    cart,
                    version,
                    lost_updates: 0,
                }),
                changes,
            }),
        }
    }

    /// Key of the persisted record.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Identifier stamped on every payload this repository writes.
    #[must_use]
    pub fn writer_id(&self) -> Uuid {
        self.inner.writer
    }

    /// Subscribe to change notifications.
    ///
    /// The receiver starts at the current cart. A new value is published
    /// after every mutation that changed the cart and after [`Self::reload`].
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.inner.changes.subscribe()
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Line items in insertion order.
    #[must_use]
    pub fn get_all(&self) -> Vec<LineItem> {
        self.lock().cart.items().to_vec()
    }

    /// A copy of the whole cart.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.lock().cart.clone()
    }

    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<LineItem> {
        self.lock().cart.get(id).cloned()
    }

    /// Exact cart total; see [`Cart::total`].
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lock().cart.total()
    }

    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lock().cart.item_count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().cart.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().cart.is_empty()
    }

    /// Writes that overwrote a newer record from another writer.
    #[must_use]
    pub fn lost_updates(&self) -> u64 {
        self.lock().lost_updates
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Append a new line item with quantity 1.
    #[instrument(skip(self, record), fields(id = %record.id()))]
    pub fn add(&self, record: NormalizedCatalogRecord) -> Applied<AddOutcome> {
        self.mutate(|cart| {
            let outcome = cart.add(record);
            (outcome, outcome.changed())
        })
    }

    /// Set the quantity of an existing line item.
    ///
    /// Quantities below 1 are `Rejected`; use [`Self::remove`] to drop an item.
    #[instrument(skip(self))]
    pub fn set_quantity(&self, id: &ItemId, quantity: i64) -> Applied<SetQuantityOutcome> {
        self.mutate(|cart| {
            let outcome = cart.set_quantity(id, quantity);
            (outcome, outcome.changed())
        })
    }

    #[instrument(skip(self))]
    pub fn remove(&self, id: &ItemId) -> Applied<RemoveOutcome> {
        self.mutate(|cart| {
            let outcome = cart.remove(id);
            (outcome, outcome.changed())
        })
    }

    /// Remove every line item, returning how many were dropped.
    #[instrument(skip(self))]
    pub fn clear(&self) -> Applied<usize> {
        self.mutate(|cart| {
            let removed = cart.clear();
            (removed, removed > 0)
        })
    }

    /// Re-read the persisted record, replacing the in-memory cart.
    ///
    /// Observers are notified if the cart differs from the cached one.
    #[instrument(skip(self))]
    pub fn reload(&self) {
        let (cart, version) = load_snapshot(&self.inner.store, &self.inner.key);
        let mut state = self.lock();
        state.version = version;
        if state.cart != cart {
            state.cart = cart;
            self.inner.changes.send_replace(state.cart.clone());
        }
    }

    fn mutate<T: std::fmt::Debug>(
        &self,
        op: impl FnOnce(&mut Cart) -> (T, bool),
    ) -> Applied<T> {
        let mut state = self.lock();
        self.sync_from_store(&mut state);
        let (outcome, changed) = op(&mut state.cart);
        if !changed {
            tracing::debug!(?outcome, "Cart unchanged");
            return Applied::unchanged(outcome);
        }

        let storage_error = match self.persist(&mut state) {
            Ok(version) => {
                tracing::info!(?outcome, version, items = state.cart.len(), "Cart saved");
                None
            }
            Err(e) => {
                tracing::error!(?outcome, error = %e, "Failed to persist cart; keeping in-memory state");
                Some(e)
            }
        };
        self.inner.changes.send_replace(state.cart.clone());

        Applied {
            outcome,
            storage_error,
        }
    }

    /// Adopt the stored cart if another writer saved since our last read.
    ///
    /// An absent, unreadable, or corrupt record leaves the cached cart as the
    /// base, so unsaved in-memory changes survive a failing store.
    fn sync_from_store(&self, state: &mut State) {
        let Some(stored) = self.read_stored() else {
            return;
        };
        if stored.version == state.version {
            return;
        }
        tracing::info!(
            key = %self.inner.key,
            cached = state.version,
            stored = stored.version,
            "Picking up cart saved by another writer"
        );
        state.version = stored.version;
        if state.cart != stored.cart {
            state.cart = stored.cart;
            self.inner.changes.send_replace(state.cart.clone());
        }
    }

    /// Write the whole cart, returning the new version.
    fn persist(&self, state: &mut State) -> Result<u64, StorageError> {
        let stored = self.stored_version();
        if let Some(found) = stored.filter(|&v| v != state.version) {
            state.lost_updates += 1;
            tracing::warn!(
                key = %self.inner.key,
                expected = state.version,
                found,
                "Stored cart changed since last read; overwriting (last writer wins)"
            );
        }

        let next = stored.unwrap_or(0).max(state.version) + 1;
        let bytes = payload::encode(&state.cart, next, self.inner.writer, Utc::now()).map_err(
            |source| StorageError::Encode {
                key: self.inner.key.clone(),
                source,
            },
        )?;
        self.inner.store.save(&self.inner.key, &bytes)?;
        state.version = next;
        Ok(next)
    }

    /// Version of the record currently in the store, if it decodes.
    fn stored_version(&self) -> Option<u64> {
        self.read_stored().map(|stored| stored.version)
    }

    fn read_stored(&self) -> Option<StoredCart> {
        let bytes = match self.inner.store.load(&self.inner.key) {
            Ok(bytes) => bytes?,
            Err(e) => {
                tracing::warn!(key = %self.inner.key, error = %e, "Failed to read stored cart");
                return None;
            }
        };
        payload::decode(&bytes).ok()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Load the stored cart, treating every failure as "no cart".
fn load_snapshot<S: CartStore>(store: &S, key: &str) -> (Cart, u64) {
    match store.load(key) {
        Ok(Some(bytes)) => match payload::decode(&bytes) {
            Ok(stored) => (stored.cart, stored.version),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding unreadable cart record");
                (Cart::default(), 0)
            }
        },
        Ok(None) => (Cart::default(), 0),
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to load cart; starting empty");
            (Cart::default(), 0)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::str::FromStr;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::store::MemoryStore;

    const KEY: &str = "cart";

    /// Memory store whose reads and writes can be switched off.
    #[derive(Clone, Default)]
    struct FlakyStore {
        records: MemoryStore,
        failing_reads: Arc<AtomicBool>,
        failing_writes: Arc<AtomicBool>,
    }

    impl FlakyStore {
        fn fail_reads(&self, failing: bool) {
            self.failing_reads.store(failing, Ordering::SeqCst);
        }

        fn fail_writes(&self, failing: bool) {
            self.failing_writes.store(failing, Ordering::SeqCst);
        }
    }

    impl CartStore for FlakyStore {
        fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            if self.failing_reads.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("storage blocked".to_string()));
            }
            self.records.load(key)
        }

        fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
            if self.failing_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("quota exceeded".to_string()));
            }
            self.records.save(key, bytes)
        }
    }

    /// Memory store that lets another writer save a record after a set
    /// number of further loads, landing between a mutation's read and save.
    #[derive(Default)]
    struct InterleavedStore {
        records: MemoryStore,
        pending: Mutex<Option<(usize, Vec<u8>)>>,
    }

    impl InterleavedStore {
        fn write_after_loads(&self, loads: usize, bytes: Vec<u8>) {
            *self.pending.lock().unwrap() = Some((loads, bytes));
        }
    }

    impl CartStore for InterleavedStore {
        fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            let mut pending = self.pending.lock().unwrap();
            match pending.take() {
                Some((0, bytes)) => self.records.save(key, &bytes)?,
                Some((loads, bytes)) => *pending = Some((loads - 1, bytes)),
                None => {}
            }
            drop(pending);
            self.records.load(key)
        }

        fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
            self.records.save(key, bytes)
        }
    }

    fn ids<S: CartStore>(repo: &CartRepository<S>) -> Vec<String> {
        repo.get_all().iter().map(|i| i.id().to_string()).collect()
    }

    fn id(s: &str) -> ItemId {
        ItemId::parse(s).unwrap()
    }

    fn record(item: &str, price: &str) -> NormalizedCatalogRecord {
        NormalizedCatalogRecord::new(
            id(item),
            &format!("Meal {item}"),
            &format!("https://img.example/{item}.jpg"),
            Decimal::from_str(price).unwrap(),
        )
        .unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_open_missing_record_is_empty() {
        let repo = CartRepository::open(MemoryStore::new(), KEY);
        assert!(repo.is_empty());
        assert!(repo.get_all().is_empty());
        assert_eq!(repo.total(), Decimal::ZERO);
    }

    #[test]
    fn test_open_corrupt_record_is_empty() {
        let store = MemoryStore::new();
        store.insert(KEY, b"{{{ definitely not a cart".to_vec());
        let repo = CartRepository::open(store, KEY);
        assert!(repo.is_empty());
    }

    #[test]
    fn test_corrupt_record_is_replaced_on_first_write() {
        let store = MemoryStore::new();
        store.insert(KEY, b"garbage".to_vec());
        let repo = CartRepository::open(store.clone(), KEY);

        assert!(repo.add(record("a", "1")).is_persisted());
        let stored = payload::decode(&store.get(KEY).unwrap()).unwrap();
        assert_eq!(stored.cart.len(), 1);
        assert_eq!(repo.lost_updates(), 0);
    }

    #[test]
    fn test_add_distinct_ids_in_order() {
        let repo = CartRepository::open(MemoryStore::new(), KEY);
        for item in ["3", "1", "2"] {
            assert_eq!(repo.add(record(item, "1")).outcome(), AddOutcome::Added);
        }
        let ids: Vec<_> = repo.get_all().iter().map(|i| i.id().to_string()).collect();
        assert_eq!(ids, ["3", "1", "2"]);
    }

    #[test]
    fn test_add_duplicate_does_not_write() {
        let store = MemoryStore::new();
        let repo = CartRepository::open(store.clone(), KEY);
        repo.add(record("a", "9.99")).into_parts();
        let bytes_before = store.get(KEY).unwrap();
        let items_before = repo.get_all();

        let applied = repo.add(record("a", "9.99"));
        assert_eq!(applied.outcome(), AddOutcome::AlreadyPresent);
        assert_eq!(repo.get_all(), items_before);
        assert_eq!(store.get(KEY).unwrap(), bytes_before);
    }

    #[test]
    fn test_set_quantity_outcomes() {
        let repo = CartRepository::open(MemoryStore::new(), KEY);
        repo.add(record("a", "1")).into_parts();

        assert_eq!(repo.set_quantity(&id("a"), 0).outcome(), SetQuantityOutcome::Rejected);
        assert_eq!(repo.set_quantity(&id("a"), -1).outcome(), SetQuantityOutcome::Rejected);
        assert_eq!(repo.get(&id("a")).unwrap().quantity(), 1);

        assert_eq!(repo.set_quantity(&id("z"), 2).outcome(), SetQuantityOutcome::NotFound);
        assert_eq!(repo.set_quantity(&id("a"), 5).outcome(), SetQuantityOutcome::Updated);
        assert_eq!(repo.get(&id("a")).unwrap().quantity(), 5);
    }

    #[test]
    fn test_remove_outcomes() {
        let repo = CartRepository::open(MemoryStore::new(), KEY);
        repo.add(record("a", "1")).into_parts();

        assert_eq!(repo.remove(&id("b")).outcome(), RemoveOutcome::NotFound);
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.remove(&id("a")).outcome(), RemoveOutcome::Removed);
        assert!(repo.get(&id("a")).is_none());
        assert!(repo.is_empty());
    }

    #[test]
    fn test_total_example() {
        let repo = CartRepository::open(MemoryStore::new(), KEY);
        repo.add(record("a", "9.99")).into_parts();
        repo.add(record("b", "4.50")).into_parts();
        repo.set_quantity(&id("b"), 3).into_parts();
        assert_eq!(repo.total(), dec("23.49"));
        assert_eq!(repo.item_count(), 4);
    }

    #[test]
    fn test_reopen_restores_identical_cart() {
        let store = MemoryStore::new();
        let repo = CartRepository::open(store.clone(), KEY);
        for item in ["x", "y", "z"] {
            repo.add(record(item, "2.25")).into_parts();
        }
        repo.set_quantity(&id("y"), 7).into_parts();
        repo.remove(&id("x")).into_parts();

        let reopened = CartRepository::open(store, KEY);
        assert_eq!(reopened.get_all(), repo.get_all());
    }

    #[test]
    fn test_storage_failure_keeps_memory_state() {
        let store = FlakyStore::default();
        let repo = CartRepository::open(store.clone(), KEY);
        repo.add(record("a", "1")).into_parts();

        store.fail_writes(true);
        let applied = repo.add(record("b", "1"));
        assert_eq!(applied.outcome(), AddOutcome::Added);
        assert!(!applied.is_persisted());
        assert!(matches!(
            applied.storage_error(),
            Some(StorageError::Unavailable(_))
        ));
        assert_eq!(repo.len(), 2);

        // The store still holds the last good write.
        let reopened = CartRepository::open(store.clone(), KEY);
        assert_eq!(reopened.len(), 1);

        // Once writes work again the next mutation persists everything.
        store.fail_writes(false);
        assert!(repo.set_quantity(&id("b"), 2).is_persisted());
        assert_eq!(CartRepository::open(store, KEY).len(), 2);
    }

    #[test]
    fn test_rejected_mutations_never_touch_storage() {
        let store = FlakyStore::default();
        let repo = CartRepository::open(store.clone(), KEY);
        repo.add(record("a", "1")).into_parts();
        store.fail_writes(true);

        assert!(repo.set_quantity(&id("a"), 0).is_persisted());
        assert!(repo.remove(&id("missing")).is_persisted());
        assert!(repo.add(record("a", "1")).is_persisted());
    }

    #[test]
    fn test_subscribers_see_each_change() {
        let repo = CartRepository::open(MemoryStore::new(), KEY);
        let mut rx = repo.subscribe();
        assert!(rx.borrow_and_update().is_empty());

        repo.add(record("a", "1")).into_parts();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);

        repo.set_quantity(&id("a"), 0).into_parts();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_clear() {
        let repo = CartRepository::open(MemoryStore::new(), KEY);
        repo.add(record("a", "1")).into_parts();
        repo.add(record("b", "1")).into_parts();
        assert_eq!(repo.clear().outcome(), 2);
        assert!(repo.is_empty());
        assert_eq!(repo.clear().outcome(), 0);
    }

    #[test]
    fn test_sequential_writers_build_on_each_other() {
        let store = MemoryStore::new();
        let tab_a = CartRepository::open(store.clone(), KEY);
        let tab_b = CartRepository::open(store.clone(), KEY);
        let mut rx = tab_b.subscribe();
        rx.borrow_and_update();

        assert!(tab_a.add(record("a", "1")).is_persisted());
        assert!(tab_b.add(record("b", "1")).is_persisted());
        assert_eq!(ids(&tab_b), ["a", "b"]);
        assert!(rx.has_changed().unwrap());

        // tab_a picks up b on its next write, even one that changes nothing.
        assert_eq!(tab_a.add(record("a", "1")).outcome(), AddOutcome::AlreadyPresent);
        assert_eq!(ids(&tab_a), ["a", "b"]);
        assert_eq!(tab_a.set_quantity(&id("b"), 3).outcome(), SetQuantityOutcome::Updated);

        assert_eq!(ids(&CartRepository::open(store.clone(), KEY)), ["a", "b"]);
        assert_eq!(CartRepository::open(store, KEY).total(), dec("4"));
        assert_eq!(tab_a.lost_updates(), 0);
        assert_eq!(tab_b.lost_updates(), 0);
    }

    #[test]
    fn test_remove_by_stale_writer_keeps_other_items() {
        let store = MemoryStore::new();
        let tab_a = CartRepository::open(store.clone(), KEY);
        let tab_b = CartRepository::open(store.clone(), KEY);

        tab_a.add(record("a", "1")).into_parts();
        tab_a.add(record("b", "1")).into_parts();
        assert_eq!(tab_b.remove(&id("a")).outcome(), RemoveOutcome::Removed);
        assert_eq!(ids(&CartRepository::open(store, KEY)), ["b"]);
    }

    #[test]
    fn test_write_between_read_and_save_is_lost_update() {
        let store = Arc::new(InterleavedStore::default());
        let repo = CartRepository::open(Arc::clone(&store), KEY);

        let mut other = Cart::default();
        other.add(record("x", "1"));
        let foreign = payload::encode(&other, 5, Uuid::new_v4(), Utc::now()).unwrap();
        // The mutation's read sees the old record; the save-time check sees x.
        store.write_after_loads(1, foreign);

        assert!(repo.add(record("a", "1")).is_persisted());
        assert_eq!(repo.lost_updates(), 1);

        let stored = payload::decode(&store.records.get(KEY).unwrap()).unwrap();
        assert_eq!(stored.version, 6);
        assert_eq!(stored.cart.len(), 1);
        assert!(stored.cart.contains(&id("a")));
    }

    #[test]
    fn test_unreadable_store_opens_empty() {
        let store = FlakyStore::default();
        CartRepository::open(store.clone(), KEY)
            .add(record("a", "1"))
            .into_parts();

        store.fail_reads(true);
        let repo = CartRepository::open(store.clone(), KEY);
        assert!(repo.is_empty());

        // The unreadable record is treated as absent and replaced.
        assert!(repo.add(record("b", "1")).is_persisted());
        store.fail_reads(false);
        let stored = payload::decode(&store.records.get(KEY).unwrap()).unwrap();
        assert_eq!(stored.version, 1);
        let stored_ids: Vec<_> = stored.cart.items().iter().map(|i| i.id().to_string()).collect();
        assert_eq!(stored_ids, ["b"]);
    }

    #[test]
    fn test_reload_picks_up_other_writer() {
        let store = MemoryStore::new();
        let tab_a = CartRepository::open(store.clone(), KEY);
        let tab_b = CartRepository::open(store, KEY);
        let mut rx = tab_b.subscribe();
        rx.borrow_and_update();

        tab_a.add(record("a", "1")).into_parts();
        assert!(tab_b.is_empty());

        tab_b.reload();
        assert_eq!(tab_b.len(), 1);
        assert!(rx.has_changed().unwrap());

        // After a reload, tab_b's next write is not a conflict.
        tab_b.add(record("b", "1")).into_parts();
        assert_eq!(tab_b.lost_updates(), 0);
        assert_eq!(tab_b.get_all()[0].id().as_str(), "a");
    }

    #[test]
    fn test_clones_share_state() {
        let repo = CartRepository::open(MemoryStore::new(), KEY);
        let other = repo.clone();
        other.add(record("a", "1")).into_parts();
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.writer_id(), other.writer_id());
    }
}
