// Unit tests for the invite and registration flow

use invitation_vault::core::errors::InvitationError;
use invitation_vault::core::models::{
    AccessInvitations, InvitationOutcome, OrgId, OrgRole, SecurityCode, SpaceId, SpaceRole,
};
use invitation_vault::services::{AccessInvitationsService, OnboardingService, SecurityCodeService};
use invitation_vault::state::MemoryStore;
use static_assertions::assert_impl_all;

use crate::common::ScriptedStore;

assert_impl_all!(OnboardingService: Send, Sync);

fn onboarding() -> OnboardingService {
    OnboardingService::new(
        SecurityCodeService::new(MemoryStore::new()),
        AccessInvitationsService::new(MemoryStore::new()),
    )
}

#[tokio::test]
async fn test_grants_accrued_after_invite_reach_registration() {
    let onboarding = onboarding();
    let email = "new@example.com";

    let receipt = onboarding
        .invite(email, |i| i.add_org_roles(OrgId::from("org-1"), [OrgRole::OrgManager]))
        .await
        .unwrap();
    let code = receipt.code.unwrap();

    onboarding
        .invite(email, |i| {
            i.add_space_roles(SpaceId::from("space-1"), [SpaceRole::SpaceDeveloper])
        })
        .await
        .unwrap();

    let granted = onboarding
        .complete_registration(&code.code, |registered, pending| async move {
            assert_eq!(registered.email, "new@example.com");
            assert!(pending.is_some());
            Ok::<(), String>(())
        })
        .await
        .unwrap()
        .unwrap();

    assert!(granted
        .org_roles(&OrgId::from("org-1"))
        .unwrap()
        .contains(&OrgRole::OrgManager));
    assert!(granted
        .space_roles(&SpaceId::from("space-1"))
        .unwrap()
        .contains(&SpaceRole::SpaceDeveloper));
}

#[tokio::test]
async fn test_code_cannot_complete_registration_twice() {
    let onboarding = onboarding();
    let receipt = onboarding
        .invite("new@example.com", |i| i.grant_org_creation())
        .await
        .unwrap();
    let code = receipt.code.unwrap().code;

    onboarding
        .complete_registration(&code, |_, _| async { Ok::<(), String>(()) })
        .await
        .unwrap();

    let second = onboarding
        .complete_registration(&code, |_, _| async { Ok::<(), String>(()) })
        .await;
    assert!(matches!(second, Err(InvitationError::InvalidSecurityCode)));
}

#[tokio::test]
async fn test_invite_after_registration_mints_new_code() {
    let onboarding = onboarding();
    let first = onboarding
        .invite("new@example.com", |i| i.grant_org_creation())
        .await
        .unwrap();
    onboarding
        .complete_registration(&first.code.unwrap().code, |_, _| async { Ok::<(), String>(()) })
        .await
        .unwrap();

    let again = onboarding
        .invite("new@example.com", |i| i.grant_org_creation())
        .await
        .unwrap();
    assert_eq!(again.outcome, InvitationOutcome::Created);
    assert!(again.code.is_some());
}

#[tokio::test]
async fn test_preview_rejects_unknown_code() {
    assert!(matches!(
        onboarding().preview("missing").await,
        Err(InvitationError::InvalidSecurityCode)
    ));
}

#[tokio::test]
async fn test_failed_code_generation_rolls_back_new_invitation() {
    let codes: ScriptedStore<SecurityCode> =
        ScriptedStore::new().with_put_if_absent_results(&[false, false, false]);
    let onboarding = OnboardingService::new(
        SecurityCodeService::new(codes.clone()),
        AccessInvitationsService::new(MemoryStore::new()),
    );

    let first = onboarding
        .invite("new@example.com", |i| i.grant_org_creation())
        .await;
    assert!(matches!(
        first,
        Err(InvitationError::CodeGeneration { attempts: 3 })
    ));
    assert_eq!(
        onboarding
            .invitations()
            .get_access_invitations("new@example.com")
            .await
            .unwrap(),
        None
    );

    // Script exhausted: the retry behaves like a first invitation
    let retry = onboarding
        .invite("new@example.com", |i| i.grant_org_creation())
        .await
        .unwrap();
    assert_eq!(retry.outcome, InvitationOutcome::Created);
    assert!(retry.code.is_some());
    assert_eq!(codes.len(), 1);
}

#[tokio::test]
async fn test_registration_returns_grants_when_cleanup_fails() {
    let invitations: ScriptedStore<AccessInvitations> = ScriptedStore::new();
    let onboarding = OnboardingService::new(
        SecurityCodeService::new(MemoryStore::new()),
        AccessInvitationsService::new(invitations.clone()),
    );
    let receipt = onboarding
        .invite("new@example.com", |i| {
            i.add_org_roles(OrgId::from("org-1"), [OrgRole::OrgUser])
        })
        .await
        .unwrap();
    let code = receipt.code.unwrap().code;

    invitations.fail_deletes();
    let granted = onboarding
        .complete_registration(&code, |_, _| async { Ok::<(), String>(()) })
        .await
        .unwrap()
        .unwrap();

    assert!(granted
        .org_roles(&OrgId::from("org-1"))
        .unwrap()
        .contains(&OrgRole::OrgUser));
    assert!(matches!(
        onboarding.preview(&code).await,
        Err(InvitationError::InvalidSecurityCode)
    ));
}

#[tokio::test]
async fn test_grant_accrued_during_registration_is_returned() {
    let onboarding = onboarding();
    let receipt = onboarding
        .invite("new@example.com", |i| {
            i.add_org_roles(OrgId::from("org-1"), [OrgRole::OrgUser])
        })
        .await
        .unwrap();
    let code = receipt.code.unwrap().code;

    let granted = onboarding
        .complete_registration(&code, |_, _| async {
            onboarding
                .invite("new@example.com", |i| {
                    i.add_org_roles(OrgId::from("org-2"), [OrgRole::OrgManager])
                })
                .await
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .await
        .unwrap()
        .unwrap();

    assert!(granted.org_roles(&OrgId::from("org-1")).is_some());
    assert!(granted.org_roles(&OrgId::from("org-2")).is_some());
    assert_eq!(
        onboarding
            .invitations()
            .get_access_invitations("new@example.com")
            .await
            .unwrap(),
        None
    );
}
