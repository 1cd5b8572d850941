// Domain error types - Secure error handling with no information disclosure

use thiserror::Error;

/// Main error type for code issuance and invitation accrual
#[derive(Error, Debug)]
pub enum InvitationError {
    /// Code absent or already redeemed (HTTP 404)
    #[error("Invalid security code")]
    InvalidSecurityCode,

    /// Every generation attempt collided with an existing code (HTTP 500)
    #[error("Failed to generate a unique security code after {attempts} attempts")]
    CodeGeneration { attempts: u32 },

    /// Rejected argument, e.g. an empty email (HTTP 400)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller's registration side effect failed; the code stays valid (HTTP 502)
    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    /// Configuration error (HTTP 500)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Cryptographic error (HTTP 500)
    #[error("Encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    /// Storage backend error (HTTP 503 when unreachable, 500 otherwise)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Symmetric encryption and key hashing errors
#[derive(Error, Debug)]
pub enum EncryptionError {
    /// Cipher key has the wrong length
    #[error("Invalid cipher key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Hashing salt has the wrong length
    #[error("Invalid salt length: expected {expected} bytes, got {actual}")]
    InvalidSaltLength { expected: usize, actual: usize },

    /// Cipher could not be initialised from the key and IV
    #[error("Cipher setup failed: {0}")]
    CipherSetup(String),

    /// Ciphertext could not be decrypted (bad padding, wrong key, corrupted IV)
    #[error("Failed to decrypt value: {0}")]
    Decryption(String),

    /// Stored envelope is not a valid `{"iv", "value"}` object
    #[error("Malformed encrypted envelope: {0}")]
    MalformedEnvelope(String),

    /// Hashed keys cannot be turned back into plaintext
    #[error("Hashed keys are irreversible and cannot be deserialized")]
    IrreversibleKey,
}

/// Key-value store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend unreachable or timed out
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Value or key could not be encrypted, decrypted or decoded
    #[error("Encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    /// Optimistic update kept losing against concurrent writers
    #[error("Concurrent update contention on key after {attempts} attempts")]
    Contention { attempts: u32 },
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl InvitationError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            InvitationError::InvalidSecurityCode => 404,
            InvitationError::CodeGeneration { .. } => 500,
            InvitationError::InvalidArgument(_) => 400,
            InvitationError::RegistrationFailed(_) => 502,
            InvitationError::ConfigurationError(_) => 500,
            InvitationError::Encryption(_) => 500,
            InvitationError::Store(StoreError::Unavailable(_)) => 503,
            InvitationError::Store(_) => 500,
        }
    }

    /// Get user-friendly error message (no emails, codes or key material)
    pub fn user_message(&self) -> String {
        match self {
            InvitationError::InvalidSecurityCode => "Invalid or expired invitation".to_string(),
            InvitationError::InvalidArgument(reason) => format!("Invalid argument: {}", reason),
            InvitationError::Store(StoreError::Unavailable(_)) => "Service unavailable".to_string(),
            InvitationError::RegistrationFailed(_) => "Registration could not be completed".to_string(),
            _ => "Internal error".to_string(),
        }
    }
}
