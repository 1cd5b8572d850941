// Single-use security codes: issue, verify, redeem

use crate::core::constants::codes::{MAX_GENERATION_ATTEMPTS, TOKEN_BYTES};
use crate::core::errors::InvitationError;
use crate::core::models::SecurityCode;
use crate::core::validation::{fingerprint, require_email};
use crate::state::KeyValueStore;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, info, warn};

/// Issues one-time codes that bind a pending registration to an email
///
/// Codes are keyed by their token string. A code exists until it is
/// redeemed; once removed it can never be looked up again.
pub struct SecurityCodeService {
    store: Box<dyn KeyValueStore<SecurityCode>>,
}

impl SecurityCodeService {
    pub fn new(store: impl KeyValueStore<SecurityCode> + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Mint and persist a fresh code for `email`
    ///
    /// Each attempt draws a new random token and inserts it with
    /// `put_if_absent`; the first successful insert wins. Collisions are a
    /// safety net only, the token space makes them astronomically rare.
    pub async fn generate_code(&self, email: &str) -> Result<SecurityCode, InvitationError> {
        require_email(email)?;

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let candidate = SecurityCode::new(email, generate_token());

            if self
                .store
                .put_if_absent(&candidate.code, candidate.clone())
                .await?
            {
                info!(
                    code_id = %candidate.id,
                    email = %fingerprint(email),
                    attempt,
                    "Security code issued"
                );
                return Ok(candidate);
            }

            warn!(
                attempt,
                max_attempts = MAX_GENERATION_ATTEMPTS,
                "Security code collision, drawing a new token"
            );
        }

        Err(InvitationError::CodeGeneration {
            attempts: MAX_GENERATION_ATTEMPTS,
        })
    }

    /// Look up a code without consuming it
    pub async fn verify(&self, code: &str) -> Result<SecurityCode, InvitationError> {
        if code.is_empty() {
            return Err(InvitationError::InvalidSecurityCode);
        }

        match self.store.get(code).await? {
            Some(found) => {
                debug!(code_id = %found.id, "Security code verified");
                Ok(found)
            }
            None => {
                debug!("Security code lookup failed");
                Err(InvitationError::InvalidSecurityCode)
            }
        }
    }

    /// Consume a code
    ///
    /// Not idempotent: a second redemption, or one racing a concurrent
    /// redemption, fails with [`InvitationError::InvalidSecurityCode`]. Call
    /// only after the dependent side effect has succeeded.
    pub async fn redeem(&self, code: &SecurityCode) -> Result<SecurityCode, InvitationError> {
        if code.code.is_empty() || !self.store.remove(&code.code).await? {
            warn!(code_id = %code.id, "Attempt to redeem an unknown or spent security code");
            return Err(InvitationError::InvalidSecurityCode);
        }

        info!(code_id = %code.id, email = %fingerprint(&code.email), "Security code redeemed");
        Ok(code.clone())
    }

    /// Find the pending code for `email`, if any
    ///
    /// Linear scan over every stored code.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<SecurityCode>, InvitationError> {
        require_email(email)?;

        let codes = self.store.values().await?;
        Ok(codes.into_iter().find(|code| code.email == email))
    }
}

/// 256-bit random token, URL-safe base64 without padding
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
