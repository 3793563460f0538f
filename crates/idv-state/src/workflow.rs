//! # Verification Workflow
//!
//! [`VerificationWorkflow::handle`] is the transition function. It either
//! rejects an event with a [`WorkflowError`] and leaves the machine
//! untouched, or applies the transition and returns the effect the
//! transition's target stage requires:
//!
//! | Transition | Effect |
//! |------------|--------|
//! | construction | [`WorkflowEffect::QueryStatus`] |
//! | entry into `Processing` | [`WorkflowEffect::Submit`] |
//! | success confirmed in `Result` | [`WorkflowEffect::Proceed`] |
//!
//! Status and submission effects carry a [`Ticket`]. Their settlements
//! must present the same ticket; anything else is a response the machine
//! no longer waits for and is dropped as a no-op.

use std::fmt;

use idv_core::{
    CaptureArtifact, CaptureAspect, Slot, StatusReport, SubmissionReceipt, SubmissionRequest,
    VerificationError, VerificationOutcome,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stage::WorkflowStage;
use crate::store::ArtifactStore;

// ── Tickets ──────────────────────────────────────────────────────────

/// Correlates an outstanding gateway call with its settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ticket:{}", self.0)
    }
}

// ── Events and Effects ───────────────────────────────────────────────

/// Input to the machine: a user action or a settled boundary call.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    /// The construction-time status query settled.
    StatusResolved {
        ticket: Ticket,
        result: Result<StatusReport, VerificationError>,
    },
    /// The user starts the process from `Intro`.
    Start,
    /// A capture for `slot` produced an artifact.
    Captured {
        slot: Slot,
        artifact: CaptureArtifact,
    },
    /// Advance past a capture stage whose slot already holds an artifact.
    Continue,
    /// Proceed without a document back page.
    SkipDocumentBack,
    /// Return to an earlier capture stage.
    NavigateBack { to: WorkflowStage },
    /// The submission call settled.
    SubmissionSettled {
        ticket: Ticket,
        result: Result<SubmissionReceipt, VerificationError>,
    },
    /// Start over after a failed attempt.
    Reset,
    /// Acknowledge a successful outcome.
    ConfirmSuccess,
}

impl WorkflowEvent {
    /// Short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StatusResolved { .. } => "status_resolved",
            Self::Start => "start",
            Self::Captured { .. } => "captured",
            Self::Continue => "continue",
            Self::SkipDocumentBack => "skip_document_back",
            Self::NavigateBack { .. } => "navigate_back",
            Self::SubmissionSettled { .. } => "submission_settled",
            Self::Reset => "reset",
            Self::ConfirmSuccess => "confirm_success",
        }
    }
}

/// Side effect requested by a transition. The executor performs it; the
/// machine never does I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEffect {
    /// Query remote verification status once.
    QueryStatus { ticket: Ticket },
    /// Submit the request exactly once. Never retried.
    Submit {
        ticket: Ticket,
        request: SubmissionRequest,
    },
    /// Tell the host the user may proceed into the application.
    Proceed,
}

/// Progress of the construction-time status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCheck {
    /// Query issued, not settled.
    Pending(Ticket),
    /// Server reported the user as verified.
    Verified,
    /// Server reported not verified.
    NotVerified,
    /// Query failed or had no credential. Treated as not verified.
    Unavailable,
}

// ── Errors ───────────────────────────────────────────────────────────

/// A rejected event. The machine is unchanged after any of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The event is not legal in the current stage.
    #[error("invalid workflow transition from {from} on {event}: {reason}")]
    InvalidTransition {
        /// Stage at the time of the event.
        from: WorkflowStage,
        /// Event name.
        event: &'static str,
        /// Why the guard rejected it.
        reason: String,
    },
    /// A capture produced zero bytes.
    #[error("captured {slot} payload is empty")]
    EmptyPayload { slot: Slot },
    /// A capture arrived for a slot other than the one being captured.
    #[error("capture for {got} delivered while capturing {expected}")]
    SlotMismatch { expected: Slot, got: Slot },
}

// ── Workflow ─────────────────────────────────────────────────────────

/// One workflow instance.
#[derive(Debug, Clone)]
pub struct VerificationWorkflow {
    stage: WorkflowStage,
    artifacts: ArtifactStore,
    outcome: Option<VerificationOutcome>,
    status_check: StatusCheck,
    /// Outstanding submission; `Some` exactly while in `Processing`.
    pending_submission: Option<Ticket>,
    proceeded: bool,
    next_ticket: u64,
    submissions_issued: u32,
}

impl VerificationWorkflow {
    /// Create an instance in `Intro` together with its entry effect, the
    /// one status query this instance will ever issue.
    pub fn new() -> (Self, WorkflowEffect) {
        let ticket = Ticket(0);
        let workflow = Self {
            stage: WorkflowStage::Intro,
            artifacts: ArtifactStore::new(),
            outcome: None,
            status_check: StatusCheck::Pending(ticket),
            pending_submission: None,
            proceeded: false,
            next_ticket: 1,
            submissions_issued: 0,
        };
        (workflow, WorkflowEffect::QueryStatus { ticket })
    }

    pub fn stage(&self) -> WorkflowStage {
        self.stage
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn outcome(&self) -> Option<&VerificationOutcome> {
        self.outcome.as_ref()
    }

    pub fn status_check(&self) -> StatusCheck {
        self.status_check
    }

    /// Ticket of the submission in flight, if any.
    pub fn pending_submission(&self) -> Option<Ticket> {
        self.pending_submission
    }

    /// Submit effects issued over the lifetime of this instance.
    pub fn submissions_issued(&self) -> u32 {
        self.submissions_issued
    }

    /// What the capture collaborator should be asked for in the current
    /// stage, or `None` outside capture stages.
    pub fn capture_request(&self) -> Option<(Slot, CaptureAspect)> {
        self.stage.slot().map(|slot| (slot, slot.aspect()))
    }

    /// Apply an event.
    pub fn handle(&mut self, event: WorkflowEvent) -> Result<Option<WorkflowEffect>, WorkflowError> {
        let name = event.name();
        match event {
            WorkflowEvent::StatusResolved { ticket, result } => {
                Ok(self.on_status_resolved(ticket, result))
            }
            WorkflowEvent::Start => {
                self.require_stage(WorkflowStage::Intro, name)?;
                self.stage = WorkflowStage::CaptureSelfie;
                Ok(None)
            }
            WorkflowEvent::Captured { slot, artifact } => self.on_captured(slot, artifact, name),
            WorkflowEvent::Continue => self.on_continue(name),
            WorkflowEvent::SkipDocumentBack => {
                self.require_stage(WorkflowStage::CaptureDocumentBack, name)?;
                self.enter_processing(false, name).map(Some)
            }
            WorkflowEvent::NavigateBack { to } => self.on_navigate_back(to, name),
            WorkflowEvent::SubmissionSettled { ticket, result } => {
                Ok(self.on_submission_settled(ticket, result))
            }
            WorkflowEvent::Reset => self.on_reset(name),
            WorkflowEvent::ConfirmSuccess => self.on_confirm(name),
        }
    }

    fn invalid(&self, event: &'static str, reason: impl Into<String>) -> WorkflowError {
        WorkflowError::InvalidTransition {
            from: self.stage,
            event,
            reason: reason.into(),
        }
    }

    fn require_stage(&self, expected: WorkflowStage, event: &'static str) -> Result<(), WorkflowError> {
        if self.stage != expected {
            return Err(self.invalid(event, format!("only allowed from {expected}")));
        }
        Ok(())
    }

    fn allocate_ticket(&mut self) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    fn on_status_resolved(
        &mut self,
        ticket: Ticket,
        result: Result<StatusReport, VerificationError>,
    ) -> Option<WorkflowEffect> {
        if self.status_check != StatusCheck::Pending(ticket) {
            return None;
        }
        match result {
            Ok(report) if report.verified => {
                self.status_check = StatusCheck::Verified;
                // Once an attempt is under way its own settlement decides.
                if matches!(self.stage, WorkflowStage::Processing | WorkflowStage::Result) {
                    return None;
                }
                self.artifacts.clear();
                self.outcome = Some(VerificationOutcome::already_verified(report.message));
                self.stage = WorkflowStage::Result;
            }
            Ok(_) => self.status_check = StatusCheck::NotVerified,
            Err(_) => self.status_check = StatusCheck::Unavailable,
        }
        None
    }

    fn on_captured(
        &mut self,
        slot: Slot,
        artifact: CaptureArtifact,
        event: &'static str,
    ) -> Result<Option<WorkflowEffect>, WorkflowError> {
        let expected = self
            .stage
            .slot()
            .ok_or_else(|| self.invalid(event, "not in a capture stage"))?;
        if slot != expected {
            return Err(WorkflowError::SlotMismatch {
                expected,
                got: slot,
            });
        }
        if artifact.payload.is_empty() {
            return Err(WorkflowError::EmptyPayload { slot });
        }

        let next = self
            .stage
            .after_capture()
            .ok_or_else(|| self.invalid(event, "no stage follows"))?;

        if next == WorkflowStage::Processing {
            let previous = self.artifacts.set(slot, artifact);
            return match self.enter_processing(true, event) {
                Ok(effect) => Ok(Some(effect)),
                Err(e) => {
                    self.restore(slot, previous);
                    Err(e)
                }
            };
        }

        self.artifacts.set(slot, artifact);
        self.stage = next;
        Ok(None)
    }

    fn restore(&mut self, slot: Slot, previous: Option<CaptureArtifact>) {
        match previous {
            Some(artifact) => {
                self.artifacts.set(slot, artifact);
            }
            None => {
                self.artifacts.remove(slot);
            }
        }
    }

    fn on_continue(&mut self, event: &'static str) -> Result<Option<WorkflowEffect>, WorkflowError> {
        let next = match self.stage {
            WorkflowStage::CaptureSelfie => WorkflowStage::CaptureDocumentFront,
            WorkflowStage::CaptureDocumentFront => WorkflowStage::CaptureDocumentBack,
            WorkflowStage::CaptureDocumentBack => {
                return Err(self.invalid(event, "document back must be captured or skipped"));
            }
            WorkflowStage::Intro | WorkflowStage::Processing | WorkflowStage::Result => {
                return Err(self.invalid(event, "not in a capture stage"));
            }
        };
        let slot = self
            .stage
            .slot()
            .ok_or_else(|| self.invalid(event, "not in a capture stage"))?;
        if !self.artifacts.contains(slot) {
            return Err(self.invalid(event, format!("{slot} has not been captured")));
        }
        self.stage = next;
        Ok(None)
    }

    fn on_navigate_back(
        &mut self,
        to: WorkflowStage,
        event: &'static str,
    ) -> Result<Option<WorkflowEffect>, WorkflowError> {
        if !self.stage.is_capture() {
            return Err(self.invalid(event, "back navigation only between capture stages"));
        }
        if !to.is_capture() || to >= self.stage {
            return Err(self.invalid(event, format!("{to} is not an earlier capture stage")));
        }
        self.stage = to;
        Ok(None)
    }

    /// Entry action of `Processing`: build the request and issue the
    /// one submission of this attempt.
    fn enter_processing(
        &mut self,
        include_back: bool,
        event: &'static str,
    ) -> Result<WorkflowEffect, WorkflowError> {
        if self.pending_submission.is_some() {
            return Err(self.invalid(event, "a submission is already outstanding"));
        }
        let request = self
            .artifacts
            .submission_request(include_back)
            .ok_or_else(|| self.invalid(event, "selfie and document front are required"))?;

        let ticket = self.allocate_ticket();
        self.pending_submission = Some(ticket);
        self.submissions_issued += 1;
        self.stage = WorkflowStage::Processing;
        Ok(WorkflowEffect::Submit { ticket, request })
    }

    fn on_submission_settled(
        &mut self,
        ticket: Ticket,
        result: Result<SubmissionReceipt, VerificationError>,
    ) -> Option<WorkflowEffect> {
        if self.stage != WorkflowStage::Processing || self.pending_submission != Some(ticket) {
            return None;
        }
        let outcome = match result {
            Ok(receipt) if receipt.is_accepted() => VerificationOutcome::approved(),
            Ok(receipt) => VerificationOutcome::failed(&VerificationError::RemoteRejection {
                status: None,
                message: receipt.error.or(receipt.message),
            }),
            Err(err) => VerificationOutcome::failed(&err),
        };
        self.pending_submission = None;
        self.outcome = Some(outcome);
        self.stage = WorkflowStage::Result;
        None
    }

    fn on_reset(&mut self, event: &'static str) -> Result<Option<WorkflowEffect>, WorkflowError> {
        self.require_stage(WorkflowStage::Result, event)?;
        if self.outcome.as_ref().map_or(false, |o| o.success) {
            return Err(self.invalid(event, "a successful outcome cannot be reset"));
        }
        self.artifacts.clear();
        self.outcome = None;
        self.stage = WorkflowStage::Intro;
        Ok(None)
    }

    fn on_confirm(&mut self, event: &'static str) -> Result<Option<WorkflowEffect>, WorkflowError> {
        self.require_stage(WorkflowStage::Result, event)?;
        if !self.outcome.as_ref().map_or(false, |o| o.success) {
            return Err(self.invalid(event, "only a successful outcome can be confirmed"));
        }
        if self.proceeded {
            return Err(self.invalid(event, "proceed was already signalled"));
        }
        self.proceeded = true;
        Ok(Some(WorkflowEffect::Proceed))
    }
}
