// Value and key serializers applied before data reaches a remote store

use crate::core::crypto::{EncryptedValue, EncryptionService};
use crate::core::errors::{EncryptionError, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Encodes values of type `T` to the string form stored by a backend
pub trait ValueSerializer<T>: Send + Sync {
    fn serialize(&self, value: &T) -> Result<String, StoreError>;
    fn deserialize(&self, raw: &str) -> Result<T, StoreError>;
}

/// Maps plaintext lookup keys to stored keys
pub trait KeySerializer: Send + Sync {
    fn serialize(&self, key: &str) -> String;
    fn deserialize(&self, stored: &str) -> Result<String, StoreError>;
}

/// Plain serde_json encoding
pub struct JsonSerializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonSerializer<T> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> Default for JsonSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ValueSerializer<T> for JsonSerializer<T>
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &T) -> Result<String, StoreError> {
        Ok(serde_json::to_string(value)?)
    }

    fn deserialize(&self, raw: &str) -> Result<T, StoreError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Wraps a plain serializer with encryption at rest
///
/// Writes: plain-encode, encrypt, store the `{"iv","value"}` envelope.
/// Reads: parse the envelope, decrypt, plain-decode.
pub struct SecureSerializer<T> {
    inner: Arc<dyn ValueSerializer<T>>,
    encryption: Arc<EncryptionService>,
}

impl<T> SecureSerializer<T> {
    pub fn new(inner: Arc<dyn ValueSerializer<T>>, encryption: Arc<EncryptionService>) -> Self {
        Self { inner, encryption }
    }
}

impl<T> ValueSerializer<T> for SecureSerializer<T> {
    fn serialize(&self, value: &T) -> Result<String, StoreError> {
        let plain = Zeroizing::new(self.inner.serialize(value)?);
        let envelope = self.encryption.encrypt(plain.as_bytes())?;
        Ok(serde_json::to_string(&envelope)?)
    }

    fn deserialize(&self, raw: &str) -> Result<T, StoreError> {
        let envelope: EncryptedValue = serde_json::from_str(raw)
            .map_err(|e| EncryptionError::MalformedEnvelope(e.to_string()))?;
        // Plaintext buffers are wiped on drop
        let plain = Zeroizing::new(self.encryption.decrypt(&envelope)?);
        let plain = std::str::from_utf8(&plain)
            .map_err(|e| EncryptionError::Decryption(format!("Decrypted value is not UTF-8: {}", e)))?;
        self.inner.deserialize(plain)
    }
}

/// Stores keys as given
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainKeySerializer;

impl KeySerializer for PlainKeySerializer {
    fn serialize(&self, key: &str) -> String {
        key.to_string()
    }

    fn deserialize(&self, stored: &str) -> Result<String, StoreError> {
        Ok(stored.to_string())
    }
}

/// Replaces keys with their salted hash
///
/// Lookups only work for a caller who already knows the plaintext key;
/// stored keys can never be turned back into plaintext.
pub struct HashedKeySerializer {
    encryption: Arc<EncryptionService>,
}

impl HashedKeySerializer {
    pub fn new(encryption: Arc<EncryptionService>) -> Self {
        Self { encryption }
    }
}

impl KeySerializer for HashedKeySerializer {
    fn serialize(&self, key: &str) -> String {
        self.encryption.hash(key)
    }

    fn deserialize(&self, _stored: &str) -> Result<String, StoreError> {
        Err(EncryptionError::IrreversibleKey.into())
    }
}
