//! # idv-core — Identity Verification Vocabulary
//!
//! Shared types for the identity-verification workflow. Every other crate
//! in the stack speaks in these terms:
//!
//! - **Capture** ([`capture`]): the three artifact slots, the aspect each
//!   slot is captured at, image payloads, and the [`CaptureSource`]
//!   collaborator that turns a capture request into an artifact.
//! - **Token** ([`token`]): the bearer credential and the
//!   [`TokenProvider`] collaborator that yields it or signals absence.
//! - **Gateway** ([`gateway`]): the remote status/submission contract and
//!   the [`VerificationGateway`] trait implemented by transports.
//! - **Outcome** ([`outcome`]): what a finished attempt reports.
//! - **Error** ([`error`]): the failure taxonomy every gateway error
//!   funnels into.
//!
//! ## Dependency Invariant
//!
//! This crate performs no I/O. Transports (`idv-client`) and the effect
//! executor (`idv-session`) depend on it, never the reverse.

pub mod capture;
pub mod error;
pub mod gateway;
pub mod outcome;
pub mod token;

pub use capture::{
    CaptureArtifact, CaptureAspect, CaptureError, CaptureOutcome, CaptureSource, ImagePayload,
    Slot,
};
pub use error::VerificationError;
pub use gateway::{StatusReport, SubmissionReceipt, SubmissionRequest, VerificationGateway};
pub use outcome::VerificationOutcome;
pub use token::{BearerToken, TokenProvider};
