//! Client-side query cache with tag-based invalidation.
//!
//! There is no time-based expiry: an entry only goes stale when a mutation
//! invalidates one of the tags it provides.

mod fabric;
mod mutation;
mod query;
mod tags;

pub use fabric::QueryCache;
pub use mutation::Mutation;
pub use query::{QueryDef, QueryState, Subscription};
pub use tags::{Endpoint, Tag};
