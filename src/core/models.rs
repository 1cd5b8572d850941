// Core data models: security codes and pending access invitations

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

/// One-time code binding a pending registration to an email
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityCode {
    pub id: Uuid,
    pub email: String,
    pub code: String,
}

impl SecurityCode {
    /// Create a new record with a fresh id
    pub fn new(email: &str, code: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            code,
        }
    }
}

impl fmt::Debug for SecurityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityCode")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("code", &"<REDACTED>")
            .finish()
    }
}

/// Organization identifier (Cloud Foundry org GUID)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(String);

/// Space identifier (Cloud Foundry space GUID)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceId(String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(OrgId);
string_id!(SpaceId);

/// Role granted within an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrgRole {
    OrgUser,
    OrgManager,
    BillingManager,
    OrgAuditor,
}

/// Role granted within a space
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpaceRole {
    SpaceManager,
    SpaceDeveloper,
    SpaceAuditor,
}

/// Grants accrued for an email while its registration is pending
///
/// Fields only accumulate; the record is deleted as a whole on redemption.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessInvitations {
    #[serde(default)]
    pub eligible_to_create_org: bool,
    #[serde(default)]
    pub org_access_invitations: BTreeMap<OrgId, BTreeSet<OrgRole>>,
    #[serde(default)]
    pub space_access_invitations: BTreeMap<SpaceId, BTreeSet<SpaceRole>>,
}

impl AccessInvitations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the email as eligible to create an organization. Never downgrades.
    pub fn grant_org_creation(&mut self) {
        self.eligible_to_create_org = true;
    }

    /// Add roles for an organization, keeping roles granted earlier
    pub fn add_org_roles<I>(&mut self, org: OrgId, roles: I)
    where
        I: IntoIterator<Item = OrgRole>,
    {
        self.org_access_invitations.entry(org).or_default().extend(roles);
    }

    /// Add roles for a space, keeping roles granted earlier
    pub fn add_space_roles<I>(&mut self, space: SpaceId, roles: I)
    where
        I: IntoIterator<Item = SpaceRole>,
    {
        self.space_access_invitations.entry(space).or_default().extend(roles);
    }

    /// Union of two pending records
    pub fn merge(&mut self, other: AccessInvitations) {
        self.eligible_to_create_org |= other.eligible_to_create_org;
        for (org, roles) in other.org_access_invitations {
            self.add_org_roles(org, roles);
        }
        for (space, roles) in other.space_access_invitations {
            self.add_space_roles(space, roles);
        }
    }

    pub fn org_roles(&self, org: &OrgId) -> Option<&BTreeSet<OrgRole>> {
        self.org_access_invitations.get(org)
    }

    pub fn space_roles(&self, space: &SpaceId) -> Option<&BTreeSet<SpaceRole>> {
        self.space_access_invitations.get(space)
    }

    /// True when nothing has been granted yet
    pub fn is_empty(&self) -> bool {
        !self.eligible_to_create_org
            && self.org_access_invitations.is_empty()
            && self.space_access_invitations.is_empty()
    }
}

/// Which branch `create_or_update_invitation` took
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationOutcome {
    /// No record existed; the caller should send a new invitation
    Created,
    /// A pending record was augmented; no new invitation needed
    Updated,
}
