//! Score cache
//!
//! Scores are cached in a string-keyed store under versioned keys
//! (`v:<identifier>:<human>`) with a fixed one-hour TTL. The store is reached
//! through the [`ScoreStore`] trait: Redis in production (see
//! [`crate::infra::store`]), [`MemoryStore`] for tests and local runs.
//!
//! Every store failure degrades to a cache miss; the cache never surfaces an
//! error to the request path.

mod keys;
mod memory;
mod score_cache;
mod store;

pub use keys::{SCHEMA_VERSION, ScoreKey};
pub use memory::MemoryStore;
pub use score_cache::{CACHE_TTL, CacheLookup, ScoreCache};
pub use store::{ScoreStore, StoreError};
