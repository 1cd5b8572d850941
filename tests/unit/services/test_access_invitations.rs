// Unit tests for pending access invitations

use invitation_vault::core::errors::{InvitationError, StoreError};
use invitation_vault::core::models::{
    AccessInvitations, InvitationOutcome, OrgId, OrgRole, SpaceId, SpaceRole,
};
use invitation_vault::services::AccessInvitationsService;
use invitation_vault::state::MemoryStore;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::common::UnavailableStore;

#[tokio::test]
async fn test_roles_for_same_org_accumulate() {
    let service = AccessInvitationsService::new(MemoryStore::new());
    let org = OrgId::from("org-1");

    service
        .add_org_invitation("new@example.com", &org, &[OrgRole::OrgUser].into())
        .await
        .unwrap();
    let outcome = service
        .add_org_invitation("new@example.com", &org, &[OrgRole::OrgAuditor].into())
        .await
        .unwrap();
    assert_eq!(outcome, InvitationOutcome::Updated);

    let pending = service
        .get_access_invitations("new@example.com")
        .await
        .unwrap()
        .unwrap();
    let expected: BTreeSet<OrgRole> = [OrgRole::OrgUser, OrgRole::OrgAuditor].into();
    assert_eq!(pending.org_roles(&org), Some(&expected));
}

#[tokio::test]
async fn test_space_invitation_after_org_creation_grant() {
    let service = AccessInvitationsService::new(MemoryStore::new());
    let space = SpaceId::from("space-1");

    assert_eq!(
        service.add_eligibility_to_create_org("new@example.com").await.unwrap(),
        InvitationOutcome::Created
    );
    assert_eq!(
        service
            .add_space_invitation("new@example.com", &space, &[SpaceRole::SpaceManager].into())
            .await
            .unwrap(),
        InvitationOutcome::Updated
    );

    let pending = service
        .get_access_invitations("new@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(pending.eligible_to_create_org);
    assert!(pending.space_roles(&space).unwrap().contains(&SpaceRole::SpaceManager));
}

#[tokio::test]
async fn test_concurrent_invitations_are_merged() {
    let service = Arc::new(AccessInvitationsService::new(MemoryStore::new()));

    let handles: Vec<_> = (0..25)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                let org = OrgId::new(format!("org-{}", i));
                service
                    .add_org_invitation("busy@example.com", &org, &[OrgRole::OrgUser].into())
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap() == InvitationOutcome::Created {
            created += 1;
        }
    }
    assert_eq!(created, 1);

    let pending = service
        .get_access_invitations("busy@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pending.org_access_invitations.len(), 25);
}

#[tokio::test]
async fn test_redeem_then_reinvite_starts_fresh() {
    let service = AccessInvitationsService::new(MemoryStore::new());
    service.add_eligibility_to_create_org("user@example.com").await.unwrap();
    assert!(service.redeem_access_invitations("user@example.com").await.unwrap());

    let outcome = service
        .create_or_update_invitation("user@example.com", |_| {})
        .await
        .unwrap();
    assert_eq!(outcome, InvitationOutcome::Created);
    assert_eq!(
        service.get_access_invitations("user@example.com").await.unwrap(),
        Some(AccessInvitations::new())
    );
}

#[tokio::test]
async fn test_unavailable_store_propagates() {
    let service = AccessInvitationsService::new(UnavailableStore);

    let err = service
        .add_eligibility_to_create_org("user@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, InvitationError::Store(StoreError::Unavailable(_))));
    assert_eq!(err.status_code(), 503);

    assert!(service.get_keys().await.is_err());
}
