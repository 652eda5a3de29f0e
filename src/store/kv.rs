//! Key-value store abstraction.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::StoreError;

/// Key under which the subscription list is stored.
pub const SUBS_KEY: &str = "subs";
/// Key under which the collection list is stored.
pub const COLLECTIONS_KEY: &str = "collections";

/// Raw key-value storage of JSON values.
///
/// Reads and writes are whole-value: a write replaces whatever was stored
/// under the key.
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn read_value(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the value stored under `key`.
    fn write_value(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// Typed access on top of [`KvStore`].
pub trait KvStoreExt: KvStore {
    /// Read and deserialize `key`, falling back to `T::default()` when absent.
    fn read<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, StoreError> {
        match self.read_value(key)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(T::default()),
        }
    }

    /// Serialize `value` and store it under `key`.
    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        self.write_value(key, serde_json::to_value(value)?)
    }

    /// Store `T::default()` under `key` unless something is already there.
    /// Returns whether a value was written.
    fn ensure_default<T: Serialize + Default>(&self, key: &str) -> Result<bool, StoreError> {
        if self.read_value(key)?.is_some() {
            return Ok(false);
        }
        self.write(key, &T::default())?;
        Ok(true)
    }
}

impl<S: KvStore + ?Sized> KvStoreExt for S {}
