//! Workflow stages.

use std::fmt;

use idv_core::Slot;
use serde::{Deserialize, Serialize};

/// Exactly one stage is active at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkflowStage {
    /// Initial stage, explaining the process.
    Intro,
    CaptureSelfie,
    CaptureDocumentFront,
    CaptureDocumentBack,
    /// Submission outstanding.
    Processing,
    /// Outcome available. Terminal except for reset.
    Result,
}

impl WorkflowStage {
    /// The three capture stages in forward order.
    pub const CAPTURE_STAGES: [WorkflowStage; 3] = [
        WorkflowStage::CaptureSelfie,
        WorkflowStage::CaptureDocumentFront,
        WorkflowStage::CaptureDocumentBack,
    ];

    /// The canonical string name of this stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intro => "INTRO",
            Self::CaptureSelfie => "CAPTURE_SELFIE",
            Self::CaptureDocumentFront => "CAPTURE_DOCUMENT_FRONT",
            Self::CaptureDocumentBack => "CAPTURE_DOCUMENT_BACK",
            Self::Processing => "PROCESSING",
            Self::Result => "RESULT",
        }
    }

    /// The slot captured in this stage, if it is a capture stage.
    pub fn slot(&self) -> Option<Slot> {
        match self {
            Self::CaptureSelfie => Some(Slot::Selfie),
            Self::CaptureDocumentFront => Some(Slot::DocumentFront),
            Self::CaptureDocumentBack => Some(Slot::DocumentBack),
            Self::Intro | Self::Processing | Self::Result => None,
        }
    }

    /// The capture stage for a slot.
    pub fn for_slot(slot: Slot) -> Self {
        match slot {
            Slot::Selfie => Self::CaptureSelfie,
            Slot::DocumentFront => Self::CaptureDocumentFront,
            Slot::DocumentBack => Self::CaptureDocumentBack,
        }
    }

    pub fn is_capture(&self) -> bool {
        self.slot().is_some()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Result)
    }

    /// Stage entered after a successful capture in this stage.
    ///
    /// No wildcard so a new variant forces a decision here.
    pub(crate) fn after_capture(&self) -> Option<WorkflowStage> {
        match self {
            Self::CaptureSelfie => Some(Self::CaptureDocumentFront),
            Self::CaptureDocumentFront => Some(Self::CaptureDocumentBack),
            Self::CaptureDocumentBack => Some(Self::Processing),
            Self::Intro | Self::Processing | Self::Result => None,
        }
    }

    /// Progress label for capture stages: `(1, 3)`, `(2, 3)`, `(3, 3)`.
    pub fn step_indicator(&self) -> Option<(u8, u8)> {
        match self {
            Self::CaptureSelfie => Some((1, 3)),
            Self::CaptureDocumentFront => Some((2, 3)),
            Self::CaptureDocumentBack => Some((3, 3)),
            Self::Intro | Self::Processing | Self::Result => None,
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
