//! Client-resident cache for offline support.
//!
//! Three layers, lowest first:
//! - [`store`]: durable key-value backends (SQLite, in-memory, noop)
//! - [`envelope`]: a cached payload plus its capture timestamp
//! - [`codec`]: expiry policy and soft-failure handling over a store

mod codec;
mod envelope;
mod store;

pub use codec::CacheCodec;
pub use envelope::Envelope;
pub use store::{KvStore, MemoryStore, NoopStore, SqliteStore};
