//! Studyhall cache system.
//!
//! Two cooperating pieces sit between the services and the entity store:
//!
//! - **Read-through cache**: cache-aside reads with per-namespace TTLs and
//!   whole-namespace eviction on any write.
//! - **Popularity tracker**: a bounded background worker that counts
//!   accesses in a sorted score board and answers top-N queries, degrading
//!   to creation-recency when the board is empty or unreachable.
//!
//! Both talk to the backing store through the [`CacheBackend`] seam. The
//! backend is shared and possibly remote; every call into it is bounded by
//! `cache.backend_timeout_ms` so a slow backend can never stall a read.
//! Backend failures are absorbed: reads fall through to the loader, access
//! events are dropped and counted.

mod backend;
mod config;
pub mod keys;
mod memory;
mod popularity;
mod read_through;

pub use backend::{CacheBackend, CacheError};
pub use config::CacheConfig;
pub use memory::MemoryBackend;
pub use popularity::PopularityTracker;
pub use read_through::ReadThroughCache;
