//! Versioned aggregate cache.
//!
//! [`CacheTier`] is the storage contract with two implementations,
//! [`LocalTier`] (in-process `DashMap`) and [`RedisTier`]. The
//! [`VersionedCache`] layers read-through loading and version validation on
//! top of a tier, and the [`Invalidator`] purges entries by quiz or globally.
//! Both share [`Generations`], so a clear also voids loads still running.

mod entry;
mod factory;
mod generation;
mod invalidate;
mod key;
mod local;
mod redis;
mod tier;
mod versioned;

pub use entry::CacheEntry;
pub use factory::{CacheComponents, create_cache, create_redis_pool};
pub use generation::{Generation, Generations};
pub use invalidate::Invalidator;
pub use key::{CacheKey, NAMESPACE};
pub use local::LocalTier;
pub use redis::{RedisTier, escape_pattern};
pub use tier::{CacheError, CacheTier};
pub use versioned::{CacheOutcome, CacheRead, VersionProbe, VersionedCache};
