//! # idv-session — Verification Session Controller
//!
//! Hosts one [`idv_state::VerificationWorkflow`] and performs the effects
//! its transitions request: the status query on mount, the single
//! submission on entry into `Processing`, and the proceed signal. The
//! status query runs alongside user operations rather than ahead of them.
//!
//! Collaborators are injected as generics:
//! - [`idv_core::VerificationGateway`] for the two remote calls,
//! - [`idv_core::TokenProvider`] for the bearer credential,
//! - [`idv_core::CaptureSource`] per capture request.
//!
//! Every await on a collaborator races the instance's [`TeardownHandle`].
//! After teardown the outstanding call is dropped, its response is never
//! applied, and every further operation fails with
//! [`ControllerError::TornDown`].

pub mod controller;
pub mod error;
pub mod token;

pub use controller::{CaptureStep, TeardownHandle, VerificationController};
pub use error::ControllerError;
pub use token::{EnvTokenProvider, StaticTokenProvider, DEFAULT_TOKEN_VAR};
