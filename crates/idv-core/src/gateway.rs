//! # Remote Verification Gateway Contract
//!
//! The backing service exposes two operations:
//!
//! | Operation | Idempotent | Called |
//! |-----------|------------|--------|
//! | `query_status` | yes | at most once per workflow instance, at mount |
//! | `submit` | no (creates an attempt record) | at most once per workflow instance |
//!
//! The workflow is defined against these contracts, so the types live
//! here rather than in any transport crate.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::capture::{ImagePayload, Slot};
use crate::error::VerificationError;
use crate::token::BearerToken;

/// Latest server-side verification state for the session user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub verified: bool,
    /// Server status label (`not_started`, `approved`, `pending`, ...).
    #[serde(default)]
    pub status: Option<String>,
    /// Human-readable status message.
    #[serde(default)]
    pub message: Option<String>,
    /// When the user was verified, as sent by the server. Kept verbatim:
    /// the service emits timestamps without an offset.
    #[serde(default)]
    pub verification_date: Option<String>,
}

impl StatusReport {
    /// A report for a user who has never been verified.
    pub fn not_verified() -> Self {
        Self::default()
    }
}

/// The single verification request built on entry to `Processing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub selfie: ImagePayload,
    pub document_front: ImagePayload,
    /// `None` is the explicit "not provided" marker for a skipped back page.
    pub document_back: Option<ImagePayload>,
}

impl SubmissionRequest {
    /// Payload for a slot, if it is part of this request.
    pub fn payload(&self, slot: Slot) -> Option<&ImagePayload> {
        match slot {
            Slot::Selfie => Some(&self.selfie),
            Slot::DocumentFront => Some(&self.document_front),
            Slot::DocumentBack => self.document_back.as_ref(),
        }
    }

    pub fn has_document_back(&self) -> bool {
        self.document_back.is_some()
    }
}

/// Successful submission response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    /// Explicit success flag. Absent on some service versions; a 2xx
    /// without the flag counts as accepted.
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    /// Failure reason, sent alongside `success: false` or a non-2xx status.
    #[serde(default)]
    pub error: Option<String>,
    /// Attempt record identifier assigned by the service.
    #[serde(default)]
    pub verification_id: Option<serde_json::Value>,
    #[serde(default)]
    pub user_verified: Option<bool>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl SubmissionReceipt {
    pub fn is_accepted(&self) -> bool {
        self.success != Some(false)
    }
}

/// Transport implementing the gateway contract.
///
/// Implementations must be `Send + Sync`; the controller holds one for the
/// lifetime of a workflow instance. Transport timeouts are the
/// implementation's responsibility.
pub trait VerificationGateway: Send + Sync {
    /// Fetch the latest verification state for the token's user.
    fn query_status(
        &self,
        token: &BearerToken,
    ) -> impl Future<Output = Result<StatusReport, VerificationError>> + Send;

    /// Submit the captured artifacts as one verification attempt.
    ///
    /// Must not retry internally: a retried submission may create a second
    /// attempt record on the service.
    fn submit(
        &self,
        token: &BearerToken,
        request: &SubmissionRequest,
    ) -> impl Future<Output = Result<SubmissionReceipt, VerificationError>> + Send;
}
