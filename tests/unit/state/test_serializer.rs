// Unit tests for value encryption and key hashing serializers

use invitation_vault::core::crypto::EncryptionService;
use invitation_vault::core::errors::{EncryptionError, StoreError};
use invitation_vault::core::models::{AccessInvitations, OrgId, OrgRole};
use invitation_vault::state::serializer::{
    HashedKeySerializer, JsonSerializer, KeySerializer, SecureSerializer, ValueSerializer,
};
use std::sync::Arc;

use crate::common::{TEST_KEY, TEST_SALT};

fn secure() -> SecureSerializer<AccessInvitations> {
    let encryption = Arc::new(EncryptionService::new(TEST_KEY, TEST_SALT).unwrap());
    SecureSerializer::new(Arc::new(JsonSerializer::<AccessInvitations>::new()), encryption)
}

#[test]
fn test_encrypted_invitations_round_trip() {
    let serializer = secure();
    let mut invitations = AccessInvitations::new();
    invitations.add_org_roles(OrgId::from("org-1"), [OrgRole::OrgManager]);

    let raw = serializer.serialize(&invitations).unwrap();
    assert!(!raw.contains("org-1"));
    assert!(!raw.contains("ORG_MANAGER"));
    assert_eq!(serializer.deserialize(&raw).unwrap(), invitations);
}

#[test]
fn test_tampered_envelope_is_an_error() {
    let serializer = secure();
    let raw = serializer.serialize(&AccessInvitations::new()).unwrap();

    let mut envelope: serde_json::Value = serde_json::from_str(&raw).unwrap();
    envelope["iv"] = serde_json::Value::String("not base64!".to_string());
    let tampered = envelope.to_string();

    assert!(matches!(
        serializer.deserialize(&tampered),
        Err(StoreError::Encryption(EncryptionError::MalformedEnvelope(_)))
    ));
}

#[test]
fn test_hashed_key_is_stable_and_irreversible() {
    let encryption = Arc::new(EncryptionService::new(TEST_KEY, TEST_SALT).unwrap());
    let keys = HashedKeySerializer::new(encryption);

    let stored = keys.serialize("email@example.com");
    assert_eq!(stored, "jVxfRzp42MAbwvZj3nyMkZKPXriLhRh2uH7lMvxsmbw=");
    assert_eq!(stored, keys.serialize("email@example.com"));
    assert!(matches!(
        keys.deserialize(&stored),
        Err(StoreError::Encryption(EncryptionError::IrreversibleKey))
    ));
}
