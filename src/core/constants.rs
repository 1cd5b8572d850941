// Sizes and retry limits shared across the crate

/// Security code generation limits
pub mod codes {
    /// Attempts before giving up on a collision-free code
    pub const MAX_GENERATION_ATTEMPTS: u32 = 3;

    /// Random bytes per code (256 bits of entropy)
    pub const TOKEN_BYTES: usize = 32;
}

/// Symmetric encryption parameters (AES-128-CBC, salted SHA-256)
pub mod crypto {
    /// AES-128 key length in bytes
    pub const KEY_LENGTH: usize = 16;

    /// Hashing salt length in bytes
    pub const SALT_LENGTH: usize = 32;

    /// CBC initialisation vector length in bytes
    pub const IV_LENGTH: usize = 16;
}

/// Storage backend limits
pub mod store {
    /// Compare-and-swap attempts before an upsert reports contention
    pub const MAX_UPSERT_ATTEMPTS: u32 = 5;

    /// Connection attempts when opening the Redis backend
    pub const MAX_CONNECT_ATTEMPTS: u32 = 3;

    /// Delay unit for linear connection backoff
    pub const CONNECT_BACKOFF_MS: u64 = 500;
}
