//! Outcome of a finished verification attempt.

use serde::{Deserialize, Serialize};

use crate::error::VerificationError;

/// Shown when the status query reports an existing verification without
/// a message of its own.
pub const MSG_ALREADY_VERIFIED: &str = "Verification already completed.";
pub const MSG_APPROVED: &str = "Verification completed successfully.";
pub const MSG_REJECTED: &str = "Verification failed. Please try again.";
pub const MSG_CONNECTION_ERROR: &str =
    "Connection error. Check your internet connection and try again.";
pub const MSG_CREDENTIAL_MISSING: &str = "Authentication token not found. Please sign in again.";

/// Success flag plus the message the host displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub success: bool,
    pub message: String,
}

impl VerificationOutcome {
    /// The status query found the user already verified.
    pub fn already_verified(server_message: Option<String>) -> Self {
        Self {
            success: true,
            message: server_message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| MSG_ALREADY_VERIFIED.to_string()),
        }
    }

    /// The submission was accepted.
    pub fn approved() -> Self {
        Self {
            success: true,
            message: MSG_APPROVED.to_string(),
        }
    }

    /// Non-success outcome for a failed attempt. Each error kind yields a
    /// different message so the host can tell them apart.
    pub fn failed(err: &VerificationError) -> Self {
        let message = match err {
            VerificationError::CredentialMissing => MSG_CREDENTIAL_MISSING.to_string(),
            VerificationError::TransportFailure { .. } => MSG_CONNECTION_ERROR.to_string(),
            VerificationError::RemoteRejection { message, .. } => message
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| MSG_REJECTED.to_string()),
        };
        Self {
            success: false,
            message,
        }
    }
}
