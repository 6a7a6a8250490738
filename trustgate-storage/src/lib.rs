//! Key-value storage backends for trustgate.
//!
//! The permission engine persists trust type definitions and per-relationship
//! overrides through the [`KvStore`] trait: a namespaced bucket of string
//! values with per-key atomic writes and no multi-key transactions.
//!
//! # Backends
//!
//! - [`MemoryKvStore`] keeps everything in process (tests, embedding)
//! - [`SqliteKvStore`] persists to a SQLite file via `rusqlite`

mod error;
mod kv;
mod memory;
mod sqlite;

pub use error::{StorageError, StorageResult};
pub use kv::KvStore;
pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;
