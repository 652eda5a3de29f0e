//! Key-value persistence for subscription data.
//!
//! This module handles:
//! - The `KvStore` trait and its typed JSON extension
//! - A JSON-file backend that rewrites the whole file on every write
//! - An in-memory backend for tests and ephemeral runs
//! - Lookup helpers over lists of named records

pub mod file;
pub mod kv;
pub mod memory;
pub mod named;

pub use file::JsonFileStore;
pub use kv::{KvStore, KvStoreExt, COLLECTIONS_KEY, SUBS_KEY};
pub use memory::MemoryStore;
pub use named::{delete_by_name, find_by_name, update_by_name, Named};
