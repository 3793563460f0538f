//! Controller errors.

use idv_core::CaptureError;
use idv_state::WorkflowError;

/// Errors surfaced by [`crate::VerificationController`] operations.
///
/// Verification failures are not errors here: they settle the workflow
/// into a non-success `Result` stage.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The machine rejected the event.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    /// The capture collaborator failed (not a cancellation).
    #[error(transparent)]
    Capture(#[from] CaptureError),
    /// The instance was torn down.
    #[error("verification session was torn down")]
    TornDown,
}
