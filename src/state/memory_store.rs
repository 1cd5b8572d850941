// In-process store backed by a sharded concurrent map

use crate::core::errors::StoreError;
use crate::state::store::{KeyValueStore, MergeFn, Upserted};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Single-process key-value store
///
/// Atomicity comes from the map's entry API, which holds the shard lock for
/// the whole compare-and-insert; nothing is check-then-act.
pub struct MemoryStore<T> {
    entries: DashMap<String, T>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> KeyValueStore<T> for MemoryStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn has_key(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<T>, StoreError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &str, value: T) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn take(&self, key: &str) -> Result<Option<T>, StoreError> {
        Ok(self.entries.remove(key).map(|(_, value)| value))
    }

    async fn put_if_absent(&self, key: &str, value: T) -> Result<bool, StoreError> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(true)
            }
        }
    }

    async fn values(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.entries.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.iter().map(|entry| entry.key().clone()).collect())
    }

    async fn upsert(&self, key: &str, merge: MergeFn<'_, T>) -> Result<Upserted<T>, StoreError> {
        let upserted = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                let value = merge(Some(slot.get().clone()));
                slot.insert(value.clone());
                Upserted { created: false, value }
            }
            Entry::Vacant(slot) => {
                let value = merge(None);
                slot.insert(value.clone());
                Upserted { created: true, value }
            }
        };
        Ok(upserted)
    }
}
