// Invitation and registration flow over the two stores

use crate::core::errors::InvitationError;
use crate::core::models::{AccessInvitations, InvitationOutcome, SecurityCode};
use crate::core::validation::fingerprint;
use crate::services::access_invitations::AccessInvitationsService;
use crate::services::security_codes::SecurityCodeService;
use std::fmt::Display;
use std::future::Future;
use tracing::{info, warn};

/// What an invitation call produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteReceipt {
    pub outcome: InvitationOutcome,
    /// Present only when a new invitation email should be sent
    pub code: Option<SecurityCode>,
}

/// Invitation details shown before the user commits to registering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationPreview {
    pub code: SecurityCode,
    pub invitations: Option<AccessInvitations>,
}

/// Coordinates code issuance with access-invitation accrual
pub struct OnboardingService {
    codes: SecurityCodeService,
    invitations: AccessInvitationsService,
}

impl OnboardingService {
    pub fn new(codes: SecurityCodeService, invitations: AccessInvitationsService) -> Self {
        Self { codes, invitations }
    }

    pub fn codes(&self) -> &SecurityCodeService {
        &self.codes
    }

    pub fn invitations(&self) -> &AccessInvitationsService {
        &self.invitations
    }

    /// Record a grant for a not-yet-registered email
    ///
    /// A new code is minted only when the pending record was created; an
    /// already-pending invitation is silently augmented. If minting fails the
    /// new record is rolled back, so the next invite starts over as Created.
    pub async fn invite<F>(&self, email: &str, mutate: F) -> Result<InviteReceipt, InvitationError>
    where
        F: Fn(&mut AccessInvitations) + Send + Sync,
    {
        let outcome = self
            .invitations
            .create_or_update_invitation(email, mutate)
            .await?;

        let code = match outcome {
            InvitationOutcome::Created => match self.codes.generate_code(email).await {
                Ok(code) => Some(code),
                Err(e) => {
                    if let Err(rollback) = self.invitations.redeem_access_invitations(email).await {
                        warn!(
                            email = %fingerprint(email),
                            error = %rollback,
                            "Failed to roll back access invitation without a code"
                        );
                    }
                    return Err(e);
                }
            },
            InvitationOutcome::Updated => None,
        };

        Ok(InviteReceipt { outcome, code })
    }

    /// Non-destructive lookup of a code and the grants waiting behind it
    pub async fn preview(&self, code: &str) -> Result<RegistrationPreview, InvitationError> {
        let code = self.codes.verify(code).await?;
        let invitations = self.invitations.get_access_invitations(&code.email).await?;
        Ok(RegistrationPreview { code, invitations })
    }

    /// Complete a registration
    ///
    /// Runs `create_user` first; only when it succeeds are the code and the
    /// pending grants redeemed. A failed side effect leaves the code valid so
    /// the user can retry. Returns the grants the caller should now apply,
    /// including any accrued after the preview. Once the code is redeemed a
    /// failure to clear the pending record is logged and the previewed grants
    /// are returned; the orphaned record is left behind.
    pub async fn complete_registration<F, Fut, E>(
        &self,
        code: &str,
        create_user: F,
    ) -> Result<Option<AccessInvitations>, InvitationError>
    where
        F: FnOnce(SecurityCode, Option<AccessInvitations>) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        let preview = self.preview(code).await?;
        let email = preview.code.email.clone();

        if let Err(e) = create_user(preview.code.clone(), preview.invitations.clone()).await {
            warn!(email = %fingerprint(&email), error = %e, "Registration side effect failed, code left valid");
            return Err(InvitationError::RegistrationFailed(e.to_string()));
        }

        self.codes.redeem(&preview.code).await?;

        // The code is spent from here on; never fail past this point
        let invitations = match self.invitations.take_access_invitations(&email).await {
            Ok(taken) => taken,
            Err(e) => {
                warn!(
                    email = %fingerprint(&email),
                    error = %e,
                    "Could not clear access invitations, returning the previewed grants"
                );
                preview.invitations
            }
        };

        info!(email = %fingerprint(&email), "Registration completed");
        Ok(invitations)
    }
}
