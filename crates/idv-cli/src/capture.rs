//! Capture source backed by image files.

use std::path::{Path, PathBuf};

use idv_core::{CaptureArtifact, CaptureAspect, CaptureError, CaptureOutcome, CaptureSource, Slot};

/// Serves each slot from a file. A slot without a file is a cancelled
/// capture.
#[derive(Debug, Clone)]
pub struct FileCaptureSource {
    selfie: PathBuf,
    document_front: PathBuf,
    document_back: Option<PathBuf>,
}

impl FileCaptureSource {
    pub fn new(selfie: PathBuf, document_front: PathBuf, document_back: Option<PathBuf>) -> Self {
        Self {
            selfie,
            document_front,
            document_back,
        }
    }

    pub fn path(&self, slot: Slot) -> Option<&Path> {
        match slot {
            Slot::Selfie => Some(self.selfie.as_path()),
            Slot::DocumentFront => Some(self.document_front.as_path()),
            Slot::DocumentBack => self.document_back.as_deref(),
        }
    }
}

impl CaptureSource for FileCaptureSource {
    async fn capture(
        &self,
        slot: Slot,
        _aspect: CaptureAspect,
    ) -> Result<CaptureOutcome, CaptureError> {
        let Some(path) = self.path(slot) else {
            return Ok(CaptureOutcome::Cancelled);
        };
        let bytes = tokio::fs::read(path).await.map_err(|e| CaptureError::Failed {
            slot,
            reason: format!("{}: {e}", path.display()),
        })?;
        if bytes.is_empty() {
            return Err(CaptureError::Failed {
                slot,
                reason: format!("{} is empty", path.display()),
            });
        }
        tracing::debug!(%slot, bytes = bytes.len(), path = %path.display(), "image loaded");
        Ok(CaptureOutcome::Captured(CaptureArtifact::new(
            bytes,
            path.display().to_string(),
        )))
    }
}
