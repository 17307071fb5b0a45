pub mod cache;
pub mod config;
pub mod persistence;

pub use cache::{open_or_fallback, SqliteStore};
pub use persistence::{MemoryStore, Persistence, PersistenceError, Snapshot, StoragePort};
