// Argument validation for public entry points

use crate::core::errors::InvitationError;
use sha2::{Digest, Sha256};

/// Reject an empty or whitespace-only email
pub fn require_email(email: &str) -> Result<(), InvitationError> {
    if email.trim().is_empty() {
        return Err(InvitationError::InvalidArgument(
            "email must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Reject an empty identifier (org id, space id, code)
pub fn require_identifier(value: &str, name: &str) -> Result<(), InvitationError> {
    if value.trim().is_empty() {
        return Err(InvitationError::InvalidArgument(format!(
            "{} must not be empty",
            name
        )));
    }
    Ok(())
}

/// Short, non-reversible log fingerprint so emails never reach the logs in clear
pub fn fingerprint(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(&digest[..6])
}
