//! Query definitions and the typed views handed back to callers.
//!
//! A `QueryDef<T>` bundles a cache key, the tags the query provides and a
//! fetcher closure. Subscribing it to the `QueryCache` yields a
//! `Subscription<T>`, which is the handle for reading the cached result.
//!
//! # Example
//!
//! ```ignore
//! let sub = cache.subscribe(api.skill.all_skills());
//!
//! // In the owner's loop
//! cache.poll();
//!
//! match cache.read(&sub).state() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(skills) => render_list(skills),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use futures::future::BoxFuture;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use super::tags::{Endpoint, Tag};
use crate::api::ClientError;

/// Type-erased query payload as stored in the cache.
pub(crate) type Payload = Arc<dyn Any + Send + Sync>;

/// A factory function that creates futures for fetching data
pub(crate) type FetcherFn =
  Arc<dyn Fn() -> BoxFuture<'static, Result<Payload, ClientError>> + Send + Sync>;

/// The state of a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is fetching and has no data yet
  Loading,
  /// Query holds data
  Success(T),
  /// Query's last fetch failed
  Error(ClientError),
}

/// Cache key: endpoint name plus its argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
  endpoint: &'static str,
  arg: Option<String>,
}

impl QueryKey {
  pub fn new(endpoint: &'static str, arg: Option<String>) -> Self {
    Self { endpoint, arg }
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.arg {
      Some(arg) => write!(f, "{}({})", self.endpoint, arg),
      None => f.write_str(self.endpoint),
    }
  }
}

/// Everything the cache needs to run and re-run one query.
pub struct QueryDef<T> {
  pub(crate) key: QueryKey,
  pub(crate) provides: &'static [Tag],
  pub(crate) fetcher: FetcherFn,
  _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> QueryDef<T> {
  /// Create a query for `endpoint` with the given fetcher.
  ///
  /// The fetcher is called for the first fetch and again for every refetch,
  /// so it must produce a fresh future each time.
  pub fn new<F, Fut>(endpoint: &'static Endpoint, arg: Option<String>, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
  {
    let fetcher: FetcherFn = Arc::new(move || {
      let future = fetcher();
      Box::pin(async move { future.await.map(|data| Arc::new(data) as Payload) })
    });

    Self {
      key: QueryKey::new(endpoint.name, arg),
      provides: endpoint.provides(),
      fetcher,
      _marker: PhantomData,
    }
  }
}

impl<T> fmt::Debug for QueryDef<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueryDef")
      .field("key", &self.key)
      .field("provides", &self.provides)
      .finish_non_exhaustive()
  }
}

/// Handle for one observer of a cached query.
///
/// Not `Clone`: each handle is one observer, released with
/// `QueryCache::unsubscribe`.
#[derive(Debug)]
pub struct Subscription<T> {
  pub(crate) id: u64,
  pub(crate) key: QueryKey,
  _marker: PhantomData<fn() -> T>,
}

impl<T> Subscription<T> {
  pub(crate) fn new(id: u64, key: QueryKey) -> Self {
    Self {
      id,
      key,
      _marker: PhantomData,
    }
  }
}

/// Point-in-time view of a cached query.
#[derive(Debug, Clone)]
pub struct QuerySnapshot<T> {
  /// Last successfully fetched payload, kept while a refetch runs
  pub data: Option<Arc<T>>,
  /// Error from the last fetch, cleared by the next success
  pub error: Option<ClientError>,
  /// A fetch is in flight
  pub is_fetching: bool,
  /// Invalidated since the last successful fetch
  pub is_stale: bool,
  /// Fetches started for this entry so far
  pub fetch_count: u64,
}

impl<T> QuerySnapshot<T> {
  pub(crate) fn empty() -> Self {
    Self {
      data: None,
      error: None,
      is_fetching: false,
      is_stale: false,
      fetch_count: 0,
    }
  }

  pub fn state(&self) -> QueryState<Arc<T>> {
    if let Some(error) = &self.error {
      if !self.is_fetching {
        return QueryState::Error(error.clone());
      }
    }
    match &self.data {
      Some(data) => QueryState::Success(Arc::clone(data)),
      None if self.is_fetching => QueryState::Loading,
      None => QueryState::Idle,
    }
  }
}
