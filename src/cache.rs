// Per-call response cache: one in-flight fetch per key, shared by every joiner.
// A cache instance lives exactly as long as the aggregation call that created it.
// The sections of one aggregation currently list disjoint keys (pods reach event
// correlation through the pods section result), so dedup here only guards against
// two fetchers asking for the same list; nothing relies on it today.

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::cluster::{DynamicObject, Selector};
use crate::error::ClusterError;
use crate::models::ResourceKind;

pub type Items = Arc<Vec<DynamicObject>>;
pub type FetchResult = Result<Items, ClusterError>;

type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Identifies one upstream list: kind, namespace and canonical selector string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    pub kind: ResourceKind,
    pub namespace: String,
    pub selector: String,
}

impl FetchKey {
    pub fn new(kind: ResourceKind, namespace: &str, selector: &Selector) -> Self {
        Self {
            kind,
            namespace: namespace.to_string(),
            selector: selector.to_query(),
        }
    }
}

/// A completed fetch.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: FetchKey,
    pub items: Items,
    pub fetched_at: Instant,
}

enum Slot {
    InFlight { fetch: SharedFetch, waiters: usize },
    Ready(CacheEntry),
}

#[derive(Default)]
pub struct ResponseCache {
    slots: Mutex<HashMap<FetchKey, Slot>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<FetchKey, Slot>> {
        // The map is only touched in short non-panicking sections; a poisoned lock still holds valid state.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the cached items for `key`, joins the in-flight fetch, or starts one with `fetch`.
    ///
    /// `fetch` is invoked at most once per key while an entry exists. Failures are not kept:
    /// current joiners all see the same error and the entry is removed.
    pub async fn get_or_fetch<F>(&self, key: &FetchKey, fetch: F) -> FetchResult
    where
        F: FnOnce() -> BoxFuture<'static, Result<Vec<DynamicObject>, ClusterError>>,
    {
        let shared = {
            let mut slots = self.slots();
            match slots.get_mut(key) {
                Some(Slot::Ready(entry)) => return Ok(entry.items.clone()),
                Some(Slot::InFlight { fetch, waiters }) => {
                    *waiters += 1;
                    fetch.clone()
                }
                None => {
                    let shared = fetch().map(|r| r.map(Arc::new)).boxed().shared();
                    slots.insert(
                        key.clone(),
                        Slot::InFlight {
                            fetch: shared.clone(),
                            waiters: 1,
                        },
                    );
                    shared
                }
            }
        };

        let mut waiter = Waiter {
            cache: self,
            key,
            fetch: shared.clone(),
            finished: false,
        };
        let result = shared.await;
        waiter.finish(&result);
        result
    }

    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }

    /// Number of keys whose fetch has not completed yet.
    pub fn in_flight(&self) -> usize {
        self.slots()
            .values()
            .filter(|slot| matches!(slot, Slot::InFlight { .. }))
            .count()
    }

    /// Completed entry for `key`, if any.
    pub fn entry(&self, key: &FetchKey) -> Option<CacheEntry> {
        match self.slots().get(key) {
            Some(Slot::Ready(entry)) => Some(entry.clone()),
            _ => None,
        }
    }
}

/// Tracks one joiner of an in-flight fetch. Dropping it before completion (cancellation)
/// releases the joiner; the last one to leave discards the unfinished entry.
struct Waiter<'a> {
    cache: &'a ResponseCache,
    key: &'a FetchKey,
    fetch: SharedFetch,
    finished: bool,
}

impl Waiter<'_> {
    /// Waiter count of this waiter's own in-flight slot. A slot for the same key started by a
    /// later request is not ours.
    fn own_waiters<'m>(&self, slots: &'m mut HashMap<FetchKey, Slot>) -> Option<&'m mut usize> {
        match slots.get_mut(self.key) {
            Some(Slot::InFlight { fetch, waiters }) if fetch.ptr_eq(&self.fetch) => Some(waiters),
            _ => None,
        }
    }

    fn finish(&mut self, result: &FetchResult) {
        self.finished = true;
        let mut slots = self.cache.slots();
        if self.own_waiters(&mut slots).is_none() {
            // Another joiner already recorded the outcome.
            return;
        }
        match result {
            Ok(items) => {
                slots.insert(
                    self.key.clone(),
                    Slot::Ready(CacheEntry {
                        key: self.key.clone(),
                        items: items.clone(),
                        fetched_at: Instant::now(),
                    }),
                );
            }
            Err(_) => {
                slots.remove(self.key);
            }
        }
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut slots = self.cache.slots();
        if let Some(waiters) = self.own_waiters(&mut slots) {
            *waiters = waiters.saturating_sub(1);
            if *waiters == 0 {
                slots.remove(self.key);
            }
        }
    }
}
