// Keyed storage abstraction shared by both services

use crate::core::errors::StoreError;
use async_trait::async_trait;

/// Merge callback for [`KeyValueStore::upsert`]
///
/// Receives the current value (if any) and returns the value to persist.
/// Backends using optimistic concurrency may call it more than once.
pub type MergeFn<'a, T> = &'a (dyn Fn(Option<T>) -> T + Send + Sync);

/// Result of an atomic read-merge-write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted<T> {
    /// True when no value existed before the merge
    pub created: bool,
    /// Value now stored under the key
    pub value: T,
}

/// Keyed storage for values of type `T`
///
/// The store is the sole authority on existence and atomicity of its keys.
#[async_trait]
pub trait KeyValueStore<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    async fn has_key(&self, key: &str) -> Result<bool, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<T>, StoreError>;

    /// Insert or overwrite
    async fn put(&self, key: &str, value: T) -> Result<(), StoreError>;

    /// Delete the key; returns true if a value was removed
    async fn remove(&self, key: &str) -> Result<bool, StoreError>;

    /// Delete the key and return the value it held, as one atomic step
    async fn take(&self, key: &str) -> Result<Option<T>, StoreError>;

    /// Insert only if the key is absent. Atomic with respect to concurrent
    /// callers: returns true iff this call performed the insert.
    async fn put_if_absent(&self, key: &str, value: T) -> Result<bool, StoreError>;

    /// All stored values, for linear scans
    async fn values(&self) -> Result<Vec<T>, StoreError>;

    /// All stored keys in plaintext form
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Atomically apply `merge` to the current value and store the result
    async fn upsert(&self, key: &str, merge: MergeFn<'_, T>) -> Result<Upserted<T>, StoreError>;
}
