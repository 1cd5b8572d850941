// Unit tests for persisted record shapes

use invitation_vault::core::models::{
    AccessInvitations, OrgId, OrgRole, SecurityCode, SpaceId, SpaceRole,
};
use serde_json::json;

#[test]
fn test_access_invitations_wire_format() {
    let mut invitations = AccessInvitations::new();
    invitations.grant_org_creation();
    invitations.add_org_roles(OrgId::from("org-1"), [OrgRole::BillingManager]);
    invitations.add_space_roles(SpaceId::from("space-1"), [SpaceRole::SpaceAuditor]);

    assert_eq!(
        serde_json::to_value(&invitations).unwrap(),
        json!({
            "eligibleToCreateOrg": true,
            "orgAccessInvitations": { "org-1": ["BILLING_MANAGER"] },
            "spaceAccessInvitations": { "space-1": ["SPACE_AUDITOR"] }
        })
    );
}

#[test]
fn test_access_invitations_missing_fields_default() {
    let parsed: AccessInvitations =
        serde_json::from_value(json!({ "orgAccessInvitations": { "org-1": ["ORG_USER"] } })).unwrap();

    assert!(!parsed.eligible_to_create_org);
    assert!(parsed.space_access_invitations.is_empty());
    assert!(parsed
        .org_roles(&OrgId::from("org-1"))
        .unwrap()
        .contains(&OrgRole::OrgUser));
}

#[test]
fn test_merge_is_a_union() {
    let mut left = AccessInvitations::new();
    left.add_org_roles(OrgId::from("org-1"), [OrgRole::OrgUser]);

    let mut right = AccessInvitations::new();
    right.grant_org_creation();
    right.add_org_roles(OrgId::from("org-1"), [OrgRole::OrgManager]);

    left.merge(right);
    assert!(left.eligible_to_create_org);
    assert_eq!(left.org_roles(&OrgId::from("org-1")).unwrap().len(), 2);
}

#[test]
fn test_security_code_round_trips_and_hides_code_in_debug() {
    let code = SecurityCode::new("user@example.com", "abc123".to_string());
    let json = serde_json::to_string(&code).unwrap();
    let parsed: SecurityCode = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, code);

    assert!(!format!("{:?}", code).contains("abc123"));
}
