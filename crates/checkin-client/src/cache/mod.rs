//! Local duplicate guard
//!
//! The cache is the fallback source of truth when the ledger check cannot
//! be trusted. Entries are keyed by [`CompositeKey`], so they follow the
//! same normalization as the ledger.

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

use crate::record::CompositeKey;

/// Durable key → flag store on the client
pub trait LocalCache: Send + Sync {
    /// Whether a submission was already recorded for this key
    fn has(&self, key: &CompositeKey) -> bool;

    /// Record a submission for this key. Failures are logged, never raised.
    fn set(&self, key: &CompositeKey);
}
