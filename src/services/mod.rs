// Service layer and process-start wiring

pub mod access_invitations;
pub mod onboarding;
pub mod security_codes;

pub use access_invitations::AccessInvitationsService;
pub use onboarding::{InviteReceipt, OnboardingService, RegistrationPreview};
pub use security_codes::SecurityCodeService;

use crate::config::{Config, StoreBackend};
use crate::core::crypto::EncryptionService;
use crate::core::errors::InvitationError;
use crate::core::models::{AccessInvitations, SecurityCode};
use crate::state::redis_store;
use crate::state::serializer::{
    HashedKeySerializer, JsonSerializer, KeySerializer, PlainKeySerializer, SecureSerializer, ValueSerializer,
};
use crate::state::{MemoryStore, RedisHashStore};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::info;

/// Build the onboarding services from configuration
///
/// The encryption service and the Redis connection are created once here and
/// handed to each store; every service owns its own store.
pub async fn from_config(config: &Config) -> Result<OnboardingService, InvitationError> {
    let (codes, invitations) = match config.store_backend {
        StoreBackend::Memory => {
            info!("Using in-memory stores");
            (
                SecurityCodeService::new(MemoryStore::new()),
                AccessInvitationsService::new(MemoryStore::new()),
            )
        }
        StoreBackend::Redis => {
            let encryption = Arc::new(encryption_from_config(config)?);
            let connection = redis_store::connect(
                &config.redis_url,
                Duration::from_secs(config.redis_connection_timeout_secs),
            )
            .await?;
            info!(
                codes_namespace = %config.security_codes_namespace,
                invitations_namespace = %config.access_invitations_namespace,
                hashed_keys = config.hash_store_keys,
                "Using Redis stores"
            );

            let keys: Arc<dyn KeySerializer> = if config.hash_store_keys {
                Arc::new(HashedKeySerializer::new(Arc::clone(&encryption)))
            } else {
                Arc::new(PlainKeySerializer)
            };

            let codes_store: RedisHashStore<SecurityCode> = RedisHashStore::new(
                connection.clone(),
                config.security_codes_namespace.clone(),
                secure_serializer(&encryption),
                Arc::clone(&keys),
            );
            let invitations_store: RedisHashStore<AccessInvitations> = RedisHashStore::new(
                connection,
                config.access_invitations_namespace.clone(),
                secure_serializer(&encryption),
                keys,
            );

            (
                SecurityCodeService::new(codes_store),
                AccessInvitationsService::new(invitations_store),
            )
        }
    };

    Ok(OnboardingService::new(codes, invitations))
}

/// Construct the encryption service from configured key material
pub fn encryption_from_config(config: &Config) -> Result<EncryptionService, InvitationError> {
    let key = config.encryption_key.as_ref().ok_or_else(|| {
        InvitationError::ConfigurationError("ENCRYPTION_KEY is not set".to_string())
    })?;
    let salt = config.encryption_salt.as_ref().ok_or_else(|| {
        InvitationError::ConfigurationError("ENCRYPTION_SALT is not set".to_string())
    })?;

    Ok(EncryptionService::new(
        key.expose_secret().as_bytes(),
        salt.expose_secret().as_bytes(),
    )?)
}

fn secure_serializer<T>(encryption: &Arc<EncryptionService>) -> Arc<dyn ValueSerializer<T>>
where
    T: Serialize + DeserializeOwned + 'static,
{
    Arc::new(SecureSerializer::new(
        Arc::new(JsonSerializer::<T>::new()),
        Arc::clone(encryption),
    ))
}
