//! # Capture Slots and Artifacts
//!
//! A workflow instance collects at most one artifact per [`Slot`]. How the
//! image is obtained (camera, gallery, file on disk) is the business of a
//! [`CaptureSource`]; the workflow only sees the resulting bytes and a
//! display reference for previews.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

/// One of the three named artifact positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Slot {
    /// Face photo of the user.
    Selfie,
    /// Front page of the identity document. Mandatory.
    DocumentFront,
    /// Back page of the identity document. Optional, may be skipped.
    DocumentBack,
}

impl Slot {
    /// All slots in capture order.
    pub const ALL: [Slot; 3] = [Slot::Selfie, Slot::DocumentFront, Slot::DocumentBack];

    /// The canonical string name of this slot.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Selfie => "selfie",
            Self::DocumentFront => "documentFront",
            Self::DocumentBack => "documentBack",
        }
    }

    /// Whether a submission cannot be built without this slot.
    pub fn is_mandatory(&self) -> bool {
        match self {
            Self::Selfie | Self::DocumentFront => true,
            Self::DocumentBack => false,
        }
    }

    /// The framing the capture collaborator should use for this slot.
    pub fn aspect(&self) -> CaptureAspect {
        match self {
            Self::Selfie => CaptureAspect::Square,
            Self::DocumentFront | Self::DocumentBack => CaptureAspect::FourByThree,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested framing for a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureAspect {
    /// 1:1, used for the selfie.
    Square,
    /// 4:3, used for document pages.
    FourByThree,
}

impl CaptureAspect {
    /// Width and height of the aspect ratio.
    pub fn ratio(&self) -> (u32, u32) {
        match self {
            Self::Square => (1, 1),
            Self::FourByThree => (4, 3),
        }
    }
}

impl fmt::Display for CaptureAspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.ratio();
        write!(f, "{w}:{h}")
    }
}

/// Opaque image bytes destined for submission.
///
/// `Debug` prints the length only; image bytes never reach log output.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ImagePayload(Vec<u8>);

impl ImagePayload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for ImagePayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ImagePayload {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImagePayload({} bytes)", self.0.len())
    }
}

/// One captured image: the payload plus a reference the host can render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureArtifact {
    /// Bytes sent to the gateway.
    pub payload: ImagePayload,
    /// Display handle for previews (URI, file path, cache key).
    pub display_ref: String,
}

impl CaptureArtifact {
    pub fn new(payload: impl Into<ImagePayload>, display_ref: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            display_ref: display_ref.into(),
        }
    }
}

/// Result of a capture attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The user produced an image.
    Captured(CaptureArtifact),
    /// The user declined or permission was denied. Not an error: the
    /// workflow simply stays where it is.
    Cancelled,
}

/// Capture acquisition failed outright (device fault, unreadable file).
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// No capture device or backing source is available.
    #[error("capture source unavailable: {reason}")]
    Unavailable {
        /// Human-readable description of what is missing.
        reason: String,
    },

    /// Acquisition started but could not produce an image.
    #[error("failed to capture {slot} image: {reason}")]
    Failed {
        /// The slot being captured.
        slot: Slot,
        /// Description of the failure.
        reason: String,
    },
}

/// External collaborator that acquires an image for a slot.
///
/// Implementations must be `Send + Sync` so a controller can be driven
/// from any task.
pub trait CaptureSource: Send + Sync {
    /// Acquire an image for `slot`, framed at `aspect`.
    fn capture(
        &self,
        slot: Slot,
        aspect: CaptureAspect,
    ) -> impl Future<Output = Result<CaptureOutcome, CaptureError>> + Send;
}
