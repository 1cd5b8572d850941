// Pending access grants accrued per email until registration

use crate::core::errors::InvitationError;
use crate::core::models::{AccessInvitations, InvitationOutcome, OrgId, OrgRole, SpaceId, SpaceRole};
use crate::core::validation::{fingerprint, require_email, require_identifier};
use crate::state::KeyValueStore;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Accrues organization/space grants and org-creation eligibility for
/// emails whose registration is still outstanding
///
/// At most one record exists per email. Every accruing call goes through
/// the store's atomic `upsert`, so concurrent invitations to the same email
/// are merged rather than overwritten.
pub struct AccessInvitationsService {
    store: Box<dyn KeyValueStore<AccessInvitations>>,
}

impl AccessInvitationsService {
    pub fn new(store: impl KeyValueStore<AccessInvitations> + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    pub async fn get_access_invitations(
        &self,
        email: &str,
    ) -> Result<Option<AccessInvitations>, InvitationError> {
        require_email(email)?;
        Ok(self.store.get(email).await?)
    }

    /// False when nothing is pending for `email`
    pub async fn get_org_creation_eligibility(&self, email: &str) -> Result<bool, InvitationError> {
        Ok(self
            .get_access_invitations(email)
            .await?
            .map(|invitations| invitations.eligible_to_create_org)
            .unwrap_or(false))
    }

    /// Mark `email` as eligible to create an organization, creating the record if needed
    pub async fn add_eligibility_to_create_org(&self, email: &str) -> Result<InvitationOutcome, InvitationError> {
        self.create_or_update_invitation(email, |invitations| invitations.grant_org_creation())
            .await
    }

    /// Fetch-or-create the record for `email`, apply `mutate`, persist
    ///
    /// Returns [`InvitationOutcome::Created`] when no record existed, so the
    /// caller knows to send a new invitation, and
    /// [`InvitationOutcome::Updated`] when a pending one was augmented.
    /// `mutate` may run more than once if the backend retries on contention.
    pub async fn create_or_update_invitation<F>(
        &self,
        email: &str,
        mutate: F,
    ) -> Result<InvitationOutcome, InvitationError>
    where
        F: Fn(&mut AccessInvitations) + Send + Sync,
    {
        require_email(email)?;

        let merge = |current: Option<AccessInvitations>| {
            let mut invitations = current.unwrap_or_default();
            mutate(&mut invitations);
            invitations
        };
        let upserted = self.store.upsert(email, &merge).await?;

        let outcome = if upserted.created {
            InvitationOutcome::Created
        } else {
            InvitationOutcome::Updated
        };
        info!(email = %fingerprint(email), outcome = ?outcome, "Access invitation recorded");
        Ok(outcome)
    }

    /// Pending grant of `roles` in `org`
    pub async fn add_org_invitation(
        &self,
        email: &str,
        org: &OrgId,
        roles: &BTreeSet<OrgRole>,
    ) -> Result<InvitationOutcome, InvitationError> {
        require_identifier(org.as_str(), "org id")?;
        self.create_or_update_invitation(email, |invitations| {
            invitations.add_org_roles(org.clone(), roles.iter().copied())
        })
        .await
    }

    /// Pending grant of `roles` in `space`
    pub async fn add_space_invitation(
        &self,
        email: &str,
        space: &SpaceId,
        roles: &BTreeSet<SpaceRole>,
    ) -> Result<InvitationOutcome, InvitationError> {
        require_identifier(space.as_str(), "space id")?;
        self.create_or_update_invitation(email, |invitations| {
            invitations.add_space_roles(space.clone(), roles.iter().copied())
        })
        .await
    }

    /// Replace the record for `email` wholesale
    pub async fn update_access_invitation(
        &self,
        email: &str,
        invitations: AccessInvitations,
    ) -> Result<(), InvitationError> {
        require_email(email)?;
        self.store.put(email, invitations).await?;
        debug!(email = %fingerprint(email), "Access invitation overwritten");
        Ok(())
    }

    /// Delete everything pending for `email`; returns whether a record existed
    pub async fn redeem_access_invitations(&self, email: &str) -> Result<bool, InvitationError> {
        require_email(email)?;
        let removed = self.store.remove(email).await?;
        info!(email = %fingerprint(email), removed, "Access invitations redeemed");
        Ok(removed)
    }

    /// Delete the record for `email` and return what it held
    ///
    /// Read and delete happen atomically, so a grant accrued concurrently is
    /// either returned here or lands in a fresh record; it is never dropped.
    pub async fn take_access_invitations(
        &self,
        email: &str,
    ) -> Result<Option<AccessInvitations>, InvitationError> {
        require_email(email)?;
        let taken = self.store.take(email).await?;
        info!(email = %fingerprint(email), found = taken.is_some(), "Access invitations taken");
        Ok(taken)
    }

    /// Emails with a pending record
    pub async fn get_keys(&self) -> Result<BTreeSet<String>, InvitationError> {
        Ok(self.store.keys().await?.into_iter().collect())
    }
}
