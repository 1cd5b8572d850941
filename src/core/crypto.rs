// Symmetric encryption at rest: AES-128-CBC with random IVs, salted SHA-256 key hashing

use crate::core::constants::crypto::{IV_LENGTH, KEY_LENGTH, SALT_LENGTH};
use crate::core::errors::EncryptionError;
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Encrypted payload as persisted at rest
///
/// Serializes to `{"iv": "<base64>", "value": "<base64>"}`. The IV is not
/// secret but is required for decryption. There is no integrity tag: a
/// tampered ciphertext is only detected when the padding comes out invalid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedValue {
    #[serde(with = "base64_bytes")]
    pub iv: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub value: Vec<u8>,
}

/// Stateless encryption and deterministic key hashing
///
/// Cipher contexts are created per call, so a single instance can be shared
/// across tasks behind an `Arc`.
pub struct EncryptionService {
    key: Secret<[u8; KEY_LENGTH]>,
    salt: Secret<[u8; SALT_LENGTH]>,
}

impl EncryptionService {
    /// Create a service from a 128-bit cipher key and a 256-bit salt
    ///
    /// Wrong lengths are configuration errors and are reported here, never
    /// at encrypt/decrypt time.
    pub fn new(key: &[u8], salt: &[u8]) -> Result<Self, EncryptionError> {
        let key: [u8; KEY_LENGTH] = key.try_into().map_err(|_| EncryptionError::InvalidKeyLength {
            expected: KEY_LENGTH,
            actual: key.len(),
        })?;
        let salt: [u8; SALT_LENGTH] =
            salt.try_into().map_err(|_| EncryptionError::InvalidSaltLength {
                expected: SALT_LENGTH,
                actual: salt.len(),
            })?;

        Ok(Self {
            key: Secret::new(key),
            salt: Secret::new(salt),
        })
    }

    /// Deterministic one-way digest of `text`: base64(SHA-256(salt || text))
    ///
    /// Used to pseudonymize lookup keys before they reach a shared store.
    pub fn hash(&self, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.expose_secret());
        hasher.update(text.as_bytes());
        STANDARD.encode(hasher.finalize())
    }

    /// Encrypt `plaintext` under a freshly drawn random IV
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedValue, EncryptionError> {
        let mut iv = [0u8; IV_LENGTH];
        OsRng.fill_bytes(&mut iv);

        let cipher = Aes128CbcEnc::new_from_slices(self.key.expose_secret(), &iv)
            .map_err(|e| EncryptionError::CipherSetup(e.to_string()))?;
        let value = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        Ok(EncryptedValue {
            iv: iv.to_vec(),
            value,
        })
    }

    /// Decrypt a value produced by [`EncryptionService::encrypt`]
    pub fn decrypt(&self, encrypted: &EncryptedValue) -> Result<Vec<u8>, EncryptionError> {
        if encrypted.iv.len() != IV_LENGTH {
            return Err(EncryptionError::Decryption(format!(
                "Invalid IV length: expected {}, got {}",
                IV_LENGTH,
                encrypted.iv.len()
            )));
        }

        let cipher = Aes128CbcDec::new_from_slices(self.key.expose_secret(), &encrypted.iv)
            .map_err(|e| EncryptionError::CipherSetup(e.to_string()))?;

        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&encrypted.value)
            .map_err(|_| EncryptionError::Decryption("Invalid padding or key mismatch".to_string()))
    }
}

impl fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionService")
            .field("key", &"<REDACTED>")
            .field("salt", &"<REDACTED>")
            .finish()
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
