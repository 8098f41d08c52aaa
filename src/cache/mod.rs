//! Mosaico response cache.
//!
//! Stores the shareable half of a widget's output, keyed by a
//! handler-derived [`CacheKey`]. Entries expire after a configurable TTL
//! (default 24 hours) and are evicted LRU-first under capacity pressure.
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `mosaico.toml`:
//!
//! ```toml
//! [cache]
//! ttl_seconds = 86400
//! capacity = 1024
//! ```

mod config;
mod keys;
mod lock;
mod store;

pub use config::CacheConfig;
pub use keys::{CacheKey, hash_call, hash_value};
pub use store::{EnvelopeStore, MemoryStore};
