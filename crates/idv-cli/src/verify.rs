//! # Verify Subcommand
//!
//! Runs one workflow instance end to end: status check, selfie, document
//! front, then document back or skip, and the single submission. Nobody
//! is waiting to start capture here, so the status response is awaited
//! before the first capture.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use clap::Args;
use idv_core::{TokenProvider, VerificationGateway, VerificationOutcome};
use idv_session::{CaptureStep, VerificationController};
use idv_state::WorkflowStage;

use crate::capture::FileCaptureSource;
use crate::EXIT_NOT_VERIFIED;

/// Arguments for `idv verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Selfie image file.
    #[arg(long)]
    pub selfie: PathBuf,

    /// Identity document front image file.
    #[arg(long)]
    pub front: PathBuf,

    /// Identity document back image file.
    #[arg(long, conflicts_with = "skip_back", required_unless_present = "skip_back")]
    pub back: Option<PathBuf>,

    /// Submit without a document back image.
    #[arg(long)]
    pub skip_back: bool,

    /// Print the outcome as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Drive `controller` to a `Result` and print the outcome.
///
/// Returns 0 on success and [`EXIT_NOT_VERIFIED`] on a non-success
/// outcome.
pub async fn run_verify<G, T>(
    args: &VerifyArgs,
    controller: &mut VerificationController<G, T>,
    out: &mut impl Write,
) -> Result<u8>
where
    G: VerificationGateway + 'static,
    T: TokenProvider,
{
    controller.mount().await?;
    if controller.wait_for_status().await? != WorkflowStage::Result {
        let camera = FileCaptureSource::new(
            args.selfie.clone(),
            args.front.clone(),
            args.back.clone(),
        );
        controller.start().await?;
        loop {
            match controller.stage() {
                WorkflowStage::CaptureDocumentBack if args.back.is_none() => {
                    controller.skip_document_back().await?;
                }
                stage if stage.is_capture() => {
                    if controller.capture(&camera).await? == CaptureStep::Cancelled {
                        bail!("{stage} capture was cancelled");
                    }
                }
                _ => break,
            }
        }
    }

    let outcome = controller
        .outcome()
        .cloned()
        .ok_or_else(|| anyhow!("workflow stopped in {} without an outcome", controller.stage()))?;
    print_outcome(&outcome, args.json, out)?;

    if outcome.success {
        controller.confirm().await?;
        Ok(0)
    } else {
        Ok(EXIT_NOT_VERIFIED)
    }
}

fn print_outcome(outcome: &VerificationOutcome, json: bool, out: &mut impl Write) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, outcome)?;
        writeln!(out)?;
    } else if outcome.success {
        writeln!(out, "verified: {}", outcome.message)?;
    } else {
        writeln!(out, "not verified: {}", outcome.message)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use idv_core::outcome::{MSG_ALREADY_VERIFIED, MSG_APPROVED};
    use idv_core::{BearerToken, StatusReport, SubmissionReceipt, SubmissionRequest, VerificationError};
    use idv_session::StaticTokenProvider;

    struct Gateway {
        verified: bool,
        accept: bool,
        submissions: Mutex<Vec<SubmissionRequest>>,
    }

    impl Gateway {
        fn new(verified: bool, accept: bool) -> Self {
            Self {
                verified,
                accept,
                submissions: Mutex::new(Vec::new()),
            }
        }
    }

    impl VerificationGateway for Gateway {
        async fn query_status(&self, _: &BearerToken) -> Result<StatusReport, VerificationError> {
            Ok(StatusReport {
                verified: self.verified,
                ..StatusReport::default()
            })
        }

        async fn submit(
            &self,
            _: &BearerToken,
            request: &SubmissionRequest,
        ) -> Result<SubmissionReceipt, VerificationError> {
            self.submissions.lock().unwrap().push(request.clone());
            if self.accept {
                Ok(SubmissionReceipt::default())
            } else {
                Err(VerificationError::RemoteRejection {
                    status: Some(403),
                    message: Some("Document not authentic".into()),
                })
            }
        }
    }

    struct Images {
        _dir: tempfile::TempDir,
        selfie: PathBuf,
        front: PathBuf,
        back: PathBuf,
    }

    fn images() -> Images {
        let dir = tempfile::tempdir().unwrap();
        let selfie = dir.path().join("selfie.jpg");
        let front = dir.path().join("front.jpg");
        let back = dir.path().join("back.jpg");
        std::fs::write(&selfie, b"S").unwrap();
        std::fs::write(&front, b"F").unwrap();
        std::fs::write(&back, b"B").unwrap();
        Images {
            _dir: dir,
            selfie,
            front,
            back,
        }
    }

    fn args(images: &Images, with_back: bool, json: bool) -> VerifyArgs {
        VerifyArgs {
            selfie: images.selfie.clone(),
            front: images.front.clone(),
            back: with_back.then(|| images.back.clone()),
            skip_back: !with_back,
            json,
        }
    }

    #[tokio::test]
    async fn skip_back_run_succeeds_and_proceeds() {
        let images = images();
        let (mut controller, _h) =
            VerificationController::new(Gateway::new(false, true), StaticTokenProvider::new("t"));
        let mut out = Vec::new();

        let code = run_verify(&args(&images, false, false), &mut controller, &mut out)
            .await
            .unwrap();
        assert_eq!(code, 0);
        assert!(controller.has_proceeded());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("verified: {MSG_APPROVED}\n")
        );

        let submissions = controller.gateway().submissions.lock().unwrap();
        assert_eq!(submissions.len(), 1);
        assert!(submissions[0].document_back.is_none());
    }

    #[tokio::test]
    async fn back_page_is_submitted_when_given() {
        let images = images();
        let (mut controller, _h) =
            VerificationController::new(Gateway::new(false, true), StaticTokenProvider::new("t"));
        run_verify(&args(&images, true, false), &mut controller, &mut Vec::new())
            .await
            .unwrap();
        let submissions = controller.gateway().submissions.lock().unwrap();
        assert_eq!(submissions[0].document_back.as_ref().unwrap().as_bytes(), b"B");
    }

    #[tokio::test]
    async fn rejection_exits_with_not_verified_code() {
        let images = images();
        let (mut controller, _h) =
            VerificationController::new(Gateway::new(false, false), StaticTokenProvider::new("t"));
        let mut out = Vec::new();
        let code = run_verify(&args(&images, false, true), &mut controller, &mut out)
            .await
            .unwrap();
        assert_eq!(code, EXIT_NOT_VERIFIED);
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["message"], "Document not authentic");
    }

    #[tokio::test]
    async fn already_verified_reads_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let args = VerifyArgs {
            selfie: dir.path().join("absent-selfie.jpg"),
            front: dir.path().join("absent-front.jpg"),
            back: None,
            skip_back: true,
            json: false,
        };
        let (mut controller, _h) =
            VerificationController::new(Gateway::new(true, true), StaticTokenProvider::new("t"));
        let mut out = Vec::new();
        let code = run_verify(&args, &mut controller, &mut out).await.unwrap();
        assert_eq!(code, 0);
        assert!(String::from_utf8(out).unwrap().contains(MSG_ALREADY_VERIFIED));
        assert!(controller.gateway().submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreadable_selfie_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = VerifyArgs {
            selfie: dir.path().join("missing.jpg"),
            front: dir.path().join("missing-front.jpg"),
            back: None,
            skip_back: true,
            json: false,
        };
        let (mut controller, _h) =
            VerificationController::new(Gateway::new(false, true), StaticTokenProvider::new("t"));
        let err = run_verify(&args, &mut controller, &mut Vec::new())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("missing.jpg"));
        assert_eq!(controller.stage(), WorkflowStage::CaptureSelfie);
    }
}
