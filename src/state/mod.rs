// Storage backends and serializers

pub mod memory_store;
pub mod redis_store;
pub mod serializer;
pub mod store;

pub use memory_store::MemoryStore;
pub use redis_store::RedisHashStore;
pub use store::{KeyValueStore, MergeFn, Upserted};
