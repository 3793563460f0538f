//! In-memory artifact store: one authoritative artifact per slot.

use idv_core::{CaptureArtifact, Slot, SubmissionRequest};

/// Slot → artifact mapping for a single workflow instance.
///
/// Owned exclusively by the workflow, so no synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactStore {
    selfie: Option<CaptureArtifact>,
    document_front: Option<CaptureArtifact>,
    document_back: Option<CaptureArtifact>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, slot: Slot) -> &mut Option<CaptureArtifact> {
        match slot {
            Slot::Selfie => &mut self.selfie,
            Slot::DocumentFront => &mut self.document_front,
            Slot::DocumentBack => &mut self.document_back,
        }
    }

    /// Store an artifact, returning the one it replaced.
    pub fn set(&mut self, slot: Slot, artifact: CaptureArtifact) -> Option<CaptureArtifact> {
        self.entry(slot).replace(artifact)
    }

    pub fn get(&self, slot: Slot) -> Option<&CaptureArtifact> {
        match slot {
            Slot::Selfie => self.selfie.as_ref(),
            Slot::DocumentFront => self.document_front.as_ref(),
            Slot::DocumentBack => self.document_back.as_ref(),
        }
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.get(slot).is_some()
    }

    pub fn remove(&mut self, slot: Slot) -> Option<CaptureArtifact> {
        self.entry(slot).take()
    }

    pub fn clear(&mut self) {
        self.selfie = None;
        self.document_front = None;
        self.document_back = None;
    }

    pub fn is_empty(&self) -> bool {
        self.captured_slots().next().is_none()
    }

    /// Slots currently holding an artifact, in capture order.
    pub fn captured_slots(&self) -> impl Iterator<Item = Slot> + '_ {
        Slot::ALL.into_iter().filter(|slot| self.contains(*slot))
    }

    /// Build the submission from the current artifacts.
    ///
    /// Returns `None` when a mandatory slot is empty. With
    /// `include_back == false` the back page is sent as not provided even
    /// if one is held.
    pub fn submission_request(&self, include_back: bool) -> Option<SubmissionRequest> {
        Some(SubmissionRequest {
            selfie: self.selfie.as_ref()?.payload.clone(),
            document_front: self.document_front.as_ref()?.payload.clone(),
            document_back: if include_back {
                self.document_back.as_ref().map(|a| a.payload.clone())
            } else {
                None
            },
        })
    }
}
