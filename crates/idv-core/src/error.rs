//! # Verification Error Taxonomy
//!
//! Every way a verification attempt can fail funnels into one of three
//! variants. None of them is fatal: the workflow records a non-success
//! outcome and offers a full reset.
//!
//! A cancelled capture is deliberately absent here. It is a neutral event
//! (see [`crate::CaptureOutcome::Cancelled`]), not a failure.

use thiserror::Error;

/// Failure of a gateway interaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// No session token was available when one was required.
    #[error("no session credential available")]
    CredentialMissing,

    /// The gateway could not be reached, timed out, or answered with
    /// something that is not a contract response.
    #[error("transport failure: {reason}")]
    TransportFailure {
        /// Description of the transport fault.
        reason: String,
    },

    /// The gateway answered and declined the verification.
    #[error(
        "verification rejected{}: {}",
        status_suffix(.status),
        .message.as_deref().unwrap_or("no reason given")
    )]
    RemoteRejection {
        /// HTTP status, when the rejection came as a non-2xx response.
        status: Option<u16>,
        /// Server-provided reason, when one was sent.
        message: Option<String>,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl VerificationError {
    /// Short machine-readable kind, used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CredentialMissing => "credential_missing",
            Self::TransportFailure { .. } => "transport_failure",
            Self::RemoteRejection { .. } => "remote_rejection",
        }
    }
}
