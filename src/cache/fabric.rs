//! The query cache and its tag-based invalidation.
//!
//! Queries register the tags they provide when first subscribed. A
//! successful mutation publishes the tags it invalidates; every entry
//! providing one of them is marked stale, and the ones somebody is observing
//! are refetched right away. Unobserved entries refetch on their next
//! subscription.
//!
//! Fetches run as tokio tasks and report back over channels. Only the owner
//! of the cache (`&mut self`) ever applies results, so there is a single
//! writer by construction.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use super::mutation::Mutation;
use super::query::{FetcherFn, Payload, QueryDef, QueryKey, QuerySnapshot, Subscription};
use super::tags::Tag;
use crate::api::{ApiResponse, ClientError};

type FetchResult = Result<Payload, ClientError>;

struct CacheEntry {
  provides: &'static [Tag],
  fetcher: FetcherFn,
  data: Option<Payload>,
  error: Option<ClientError>,
  receiver: Option<mpsc::UnboundedReceiver<FetchResult>>,
  stale: bool,
  observers: usize,
  unobserved_since: Option<Instant>,
  fetch_count: u64,
}

impl CacheEntry {
  fn new(provides: &'static [Tag], fetcher: FetcherFn) -> Self {
    Self {
      provides,
      fetcher,
      data: None,
      error: None,
      receiver: None,
      stale: false,
      observers: 0,
      unobserved_since: None,
      fetch_count: 0,
    }
  }

  fn is_fetching(&self) -> bool {
    self.receiver.is_some()
  }

  fn start_fetch(&mut self, key: &QueryKey) {
    let (tx, rx) = mpsc::unbounded_channel();
    // Replacing the receiver orphans any older fetch: it still runs to
    // completion, but nobody reads its result.
    self.receiver = Some(rx);
    self.fetch_count += 1;
    tracing::debug!(query = %key, fetch = self.fetch_count, "fetch started");

    let future = (self.fetcher)();
    tokio::spawn(async move {
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(future.await);
    });
  }

  fn apply(&mut self, key: &QueryKey, result: FetchResult) {
    match result {
      Ok(data) => {
        tracing::debug!(query = %key, "fetch succeeded");
        self.data = Some(data);
        self.error = None;
        self.stale = false;
      }
      Err(e) => {
        tracing::debug!(query = %key, error = %e, "fetch failed");
        self.error = Some(e);
      }
    }
  }
}

fn cancelled() -> ClientError {
  ClientError::Network("Query was cancelled".to_string())
}

/// Cached query results plus the tag → query registry.
pub struct QueryCache {
  entries: HashMap<QueryKey, CacheEntry>,
  by_tag: HashMap<Tag, BTreeSet<QueryKey>>,
  subscriptions: HashMap<u64, QueryKey>,
  next_id: u64,
  keep_unused: Duration,
}

impl Default for QueryCache {
  fn default() -> Self {
    Self::new(Duration::from_secs(60))
  }
}

impl QueryCache {
  /// `keep_unused` is how long an entry with no observers survives
  /// `collect_garbage`.
  pub fn new(keep_unused: Duration) -> Self {
    Self {
      entries: HashMap::new(),
      by_tag: HashMap::new(),
      subscriptions: HashMap::new(),
      next_id: 1,
      keep_unused,
    }
  }

  /// Start observing a query.
  ///
  /// Fetches when the entry is new, stale, or has never produced data, unless
  /// a fetch is already in flight.
  pub fn subscribe<T: Send + Sync + 'static>(&mut self, def: QueryDef<T>) -> Subscription<T> {
    let id = self.next_id;
    self.next_id += 1;
    let key = def.key.clone();

    let entry = match self.entries.entry(key.clone()) {
      Entry::Occupied(occupied) => occupied.into_mut(),
      Entry::Vacant(vacant) => {
        for tag in def.provides {
          self.by_tag.entry(*tag).or_default().insert(key.clone());
        }
        vacant.insert(CacheEntry::new(def.provides, def.fetcher))
      }
    };

    entry.observers += 1;
    entry.unobserved_since = None;

    if !entry.is_fetching() && (entry.stale || entry.data.is_none()) {
      entry.start_fetch(&key);
    }

    self.subscriptions.insert(id, key.clone());
    Subscription::new(id, key)
  }

  /// Stop observing. The entry stays cached until `collect_garbage` finds
  /// it unobserved for longer than the retention window.
  pub fn unsubscribe<T>(&mut self, subscription: Subscription<T>) {
    let Some(key) = self.subscriptions.remove(&subscription.id) else {
      return;
    };
    if let Some(entry) = self.entries.get_mut(&key) {
      entry.observers = entry.observers.saturating_sub(1);
      if entry.observers == 0 {
        entry.unobserved_since = Some(Instant::now());
      }
    }
  }

  /// Typed view of a subscribed query.
  pub fn read<T: Send + Sync + 'static>(&self, subscription: &Subscription<T>) -> QuerySnapshot<T> {
    if !self.subscriptions.contains_key(&subscription.id) {
      return QuerySnapshot::empty();
    }
    let Some(entry) = self.entries.get(&subscription.key) else {
      return QuerySnapshot::empty();
    };

    QuerySnapshot {
      data: entry.data.clone().and_then(|data| data.downcast::<T>().ok()),
      error: entry.error.clone(),
      is_fetching: entry.is_fetching(),
      is_stale: entry.stale,
      fetch_count: entry.fetch_count,
    }
  }

  /// Apply any fetch results that have arrived, without waiting.
  ///
  /// Returns the keys whose state changed.
  pub fn poll(&mut self) -> Vec<QueryKey> {
    let mut changed = Vec::new();

    for (key, entry) in self.entries.iter_mut() {
      let Some(receiver) = entry.receiver.as_mut() else {
        continue;
      };
      let result = match receiver.try_recv() {
        Ok(result) => result,
        Err(mpsc::error::TryRecvError::Empty) => continue,
        Err(mpsc::error::TryRecvError::Disconnected) => Err(cancelled()),
      };
      entry.receiver = None;
      entry.apply(key, result);
      changed.push(key.clone());
    }

    changed
  }

  /// Wait for every in-flight fetch and apply the results.
  pub async fn settle(&mut self) -> Vec<QueryKey> {
    let mut changed = self.poll();
    let in_flight: Vec<QueryKey> = self
      .entries
      .iter()
      .filter(|(_, entry)| entry.is_fetching())
      .map(|(key, _)| key.clone())
      .collect();

    for key in in_flight {
      let Some(entry) = self.entries.get_mut(&key) else {
        continue;
      };
      let Some(mut receiver) = entry.receiver.take() else {
        continue;
      };
      let result = receiver.recv().await.unwrap_or_else(|| Err(cancelled()));
      entry.apply(&key, result);
      changed.push(key);
    }

    changed
  }

  /// Mark every entry providing one of `tags` stale and refetch the observed
  /// ones. Returns how many refetches were started.
  pub fn invalidate(&mut self, tags: &[Tag]) -> usize {
    let keys: BTreeSet<QueryKey> = tags
      .iter()
      .filter_map(|tag| self.by_tag.get(tag))
      .flatten()
      .cloned()
      .collect();

    let mut refetched = 0;
    for key in keys {
      let Some(entry) = self.entries.get_mut(&key) else {
        continue;
      };
      entry.stale = true;
      if entry.observers > 0 {
        entry.start_fetch(&key);
        refetched += 1;
      }
    }

    tracing::debug!(?tags, refetched, "tags invalidated");
    refetched
  }

  /// Run a mutation and, if it succeeds, invalidate its tags.
  ///
  /// A failed mutation changes nothing in the cache.
  pub async fn execute<T>(&mut self, mutation: Mutation<T>) -> Result<ApiResponse<T>, ClientError> {
    let endpoint = mutation.endpoint();
    let result = mutation.send().await;

    match &result {
      Ok(_) => {
        self.invalidate(endpoint.invalidates());
      }
      Err(e) => {
        tracing::debug!(mutation = endpoint.name, error = %e, "mutation failed");
      }
    }

    result
  }

  /// Evict entries nobody has observed for longer than the retention window.
  pub fn collect_garbage(&mut self) -> usize {
    let expired: Vec<QueryKey> = self
      .entries
      .iter()
      .filter(|(_, entry)| {
        entry.observers == 0
          && entry
            .unobserved_since
            .is_some_and(|since| since.elapsed() >= self.keep_unused)
      })
      .map(|(key, _)| key.clone())
      .collect();

    for key in &expired {
      if let Some(entry) = self.entries.remove(key) {
        for tag in entry.provides {
          if let Some(keys) = self.by_tag.get_mut(tag) {
            keys.remove(key);
          }
        }
      }
    }

    if !expired.is_empty() {
      tracing::debug!(
        evicted = expired.len(),
        remaining = self.len(),
        "cache entries evicted"
      );
    }
    expired.len()
  }

  /// Drop every entry and subscription.
  pub fn reset(&mut self) {
    self.entries.clear();
    self.by_tag.clear();
    self.subscriptions.clear();
  }

  #[cfg(test)]
  pub fn contains(&self, key: &QueryKey) -> bool {
    self.entries.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
