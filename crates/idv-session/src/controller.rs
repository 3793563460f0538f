//! The effect-executing host of one workflow instance.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use idv_core::{
    CaptureOutcome, CaptureSource, StatusReport, TokenProvider, VerificationError,
    VerificationGateway, VerificationOutcome,
};
use idv_state::{
    Ticket, VerificationWorkflow, WorkflowEffect, WorkflowError, WorkflowEvent, WorkflowStage,
};
use tokio::sync::watch;

use crate::error::ControllerError;

/// Result of one capture request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStep {
    /// Artifact stored; the workflow is now in this stage.
    Advanced(WorkflowStage),
    /// The user cancelled. Stage unchanged.
    Cancelled,
    /// The status query settled while the capture was outstanding and
    /// moved the workflow to this stage. The capture was dropped.
    Superseded(WorkflowStage),
}

/// Tears down the controller it was issued with.
///
/// Dropping the handle without calling [`tear_down`](Self::tear_down)
/// does not tear the instance down.
#[derive(Debug)]
pub struct TeardownHandle {
    tx: watch::Sender<bool>,
}

impl TeardownHandle {
    pub fn tear_down(&self) {
        self.tx.send_replace(true);
    }
}

/// Resolves once teardown is signalled. Never resolves if every handle
/// was dropped without signalling.
async fn teardown_signalled(mut rx: watch::Receiver<bool>) {
    if rx.wait_for(|down| *down).await.is_err() {
        std::future::pending::<()>().await;
    }
}

type StatusFuture = Pin<Box<dyn Future<Output = Result<StatusReport, VerificationError>> + Send>>;

/// The status query in flight, polled alongside user operations.
struct PendingStatus {
    ticket: Ticket,
    response: StatusFuture,
}

/// Drives a [`VerificationWorkflow`] against injected collaborators.
///
/// Operations take `&mut self`, so the instance processes one event at a
/// time. Each operation returns once the workflow has reached a state
/// that waits on the user again.
///
/// The status query issued by [`mount`](Self::mount) is never awaited on
/// its own. It makes progress while captures are outstanding and its
/// settlement is applied before the next event, so a slow status endpoint
/// never holds up the user.
pub struct VerificationController<G, T> {
    workflow: VerificationWorkflow,
    gateway: Arc<G>,
    tokens: T,
    /// Construction-time effect, executed by [`mount`](Self::mount).
    initial: Option<WorkflowEffect>,
    status: Option<PendingStatus>,
    teardown: watch::Receiver<bool>,
    proceeded: bool,
}

impl<G, T> VerificationController<G, T>
where
    G: VerificationGateway + 'static,
    T: TokenProvider,
{
    pub fn new(gateway: G, tokens: T) -> (Self, TeardownHandle) {
        let (workflow, initial) = VerificationWorkflow::new();
        let (tx, rx) = watch::channel(false);
        let controller = Self {
            workflow,
            gateway: Arc::new(gateway),
            tokens,
            initial: Some(initial),
            status: None,
            teardown: rx,
            proceeded: false,
        };
        (controller, TeardownHandle { tx })
    }

    pub fn stage(&self) -> WorkflowStage {
        self.workflow.stage()
    }

    pub fn outcome(&self) -> Option<&VerificationOutcome> {
        self.workflow.outcome()
    }

    pub fn workflow(&self) -> &VerificationWorkflow {
        &self.workflow
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Whether the status query is still outstanding.
    pub fn status_pending(&self) -> bool {
        self.status.is_some()
    }

    /// Whether the proceed signal has been emitted.
    pub fn has_proceeded(&self) -> bool {
        self.proceeded
    }

    pub fn is_torn_down(&self) -> bool {
        *self.teardown.borrow()
    }

    /// Issue the construction-time status query and return without
    /// waiting for it. A response that is already available is applied.
    /// Later calls are no-ops.
    pub async fn mount(&mut self) -> Result<WorkflowStage, ControllerError> {
        self.ensure_live()?;
        if let Some(effect) = self.initial.clone() {
            self.run(Some(effect)).await?;
            self.initial = None;
        }
        self.drain_status().await?;
        Ok(self.stage())
    }

    /// Wait for the outstanding status query, if any, and apply it.
    pub async fn wait_for_status(&mut self) -> Result<WorkflowStage, ControllerError> {
        self.ensure_live()?;
        if let Some(pending) = self.status.as_mut() {
            let ticket = pending.ticket;
            let result = tokio::select! {
                biased;
                _ = teardown_signalled(self.teardown.clone()) => {
                    tracing::debug!("session torn down, discarding outstanding status query");
                    return Err(ControllerError::TornDown);
                }
                result = pending.response.as_mut() => result,
            };
            self.status = None;
            let effect = self.settle_status(ticket, result)?;
            self.run(effect).await?;
        }
        Ok(self.stage())
    }

    pub async fn start(&mut self) -> Result<WorkflowStage, ControllerError> {
        self.dispatch(WorkflowEvent::Start).await
    }

    /// Ask `source` for the artifact the current stage needs and apply it.
    pub async fn capture<C: CaptureSource>(
        &mut self,
        source: &C,
    ) -> Result<CaptureStep, ControllerError> {
        self.ensure_live()?;
        let (slot, aspect) = self.workflow.capture_request().ok_or_else(|| {
            WorkflowError::InvalidTransition {
                from: self.stage(),
                event: "captured",
                reason: "not in a capture stage".into(),
            }
        })?;

        tracing::debug!(%slot, %aspect, "requesting capture");
        let capture = source.capture(slot, aspect);
        tokio::pin!(capture);
        let outcome = loop {
            let Some(pending) = self.status.as_mut() else {
                break self.until_teardown(&mut capture).await??;
            };
            let ticket = pending.ticket;
            tokio::select! {
                biased;
                _ = teardown_signalled(self.teardown.clone()) => {
                    tracing::debug!("session torn down, discarding outstanding capture");
                    return Err(ControllerError::TornDown);
                }
                result = pending.response.as_mut() => {
                    self.status = None;
                    let effect = self.settle_status(ticket, result)?;
                    self.run(effect).await?;
                    if self.workflow.capture_request() != Some((slot, aspect)) {
                        tracing::debug!(%slot, to = %self.stage(), "status settled during capture, dropping it");
                        return Ok(CaptureStep::Superseded(self.stage()));
                    }
                }
                outcome = &mut capture => break outcome?,
            }
        };

        match outcome {
            CaptureOutcome::Cancelled => {
                tracing::debug!(%slot, "capture cancelled");
                Ok(CaptureStep::Cancelled)
            }
            CaptureOutcome::Captured(artifact) => {
                let stage = self.apply(WorkflowEvent::Captured { slot, artifact }).await?;
                Ok(CaptureStep::Advanced(stage))
            }
        }
    }

    /// Advance past an already captured selfie or document front.
    pub async fn continue_(&mut self) -> Result<WorkflowStage, ControllerError> {
        self.dispatch(WorkflowEvent::Continue).await
    }

    /// Submit without a document back page.
    pub async fn skip_document_back(&mut self) -> Result<WorkflowStage, ControllerError> {
        self.dispatch(WorkflowEvent::SkipDocumentBack).await
    }

    pub async fn back_to(&mut self, to: WorkflowStage) -> Result<WorkflowStage, ControllerError> {
        self.dispatch(WorkflowEvent::NavigateBack { to }).await
    }

    /// Return to `Intro` after a non-success outcome.
    pub async fn reset(&mut self) -> Result<WorkflowStage, ControllerError> {
        self.dispatch(WorkflowEvent::Reset).await
    }

    /// Acknowledge a successful outcome and emit the proceed signal.
    pub async fn confirm(&mut self) -> Result<(), ControllerError> {
        self.dispatch(WorkflowEvent::ConfirmSuccess).await?;
        Ok(())
    }

    fn ensure_live(&self) -> Result<(), ControllerError> {
        if self.is_torn_down() {
            return Err(ControllerError::TornDown);
        }
        Ok(())
    }

    /// Apply a user event, after any status response that has arrived.
    async fn dispatch(&mut self, event: WorkflowEvent) -> Result<WorkflowStage, ControllerError> {
        self.ensure_live()?;
        self.drain_status().await?;
        self.apply(event).await
    }

    async fn apply(&mut self, event: WorkflowEvent) -> Result<WorkflowStage, ControllerError> {
        let name = event.name();
        let from = self.stage();
        let effect = self.workflow.handle(event).map_err(|e| {
            tracing::debug!(event = name, %from, "event rejected: {e}");
            e
        })?;
        if self.stage() != from {
            tracing::debug!(event = name, %from, to = %self.stage(), "stage transition");
        }
        self.run(effect).await?;
        Ok(self.stage())
    }

    /// Execute effects until the machine stops requesting them.
    async fn run(&mut self, mut effect: Option<WorkflowEffect>) -> Result<(), ControllerError> {
        while let Some(current) = effect.take() {
            effect = match current {
                WorkflowEffect::QueryStatus { ticket } => self.begin_status_query(ticket).await?,
                WorkflowEffect::Submit { ticket, request } => {
                    tracing::info!(
                        %ticket,
                        back_provided = request.has_document_back(),
                        "dispatching verification submission"
                    );
                    let result = match self.until_teardown(self.tokens.token()).await? {
                        Some(token) => {
                            self.until_teardown(self.gateway.submit(&token, &request))
                                .await?
                        }
                        None => Err(VerificationError::CredentialMissing),
                    };
                    match &result {
                        Ok(_) => tracing::info!(%ticket, "submission settled"),
                        Err(e) => tracing::info!(%ticket, kind = e.kind(), "submission failed: {e}"),
                    }
                    self.workflow
                        .handle(WorkflowEvent::SubmissionSettled { ticket, result })?
                }
                WorkflowEffect::Proceed => {
                    tracing::info!("verification confirmed, proceeding");
                    self.proceeded = true;
                    None
                }
            };
        }
        Ok(())
    }

    /// Issue the status query. Without a token no call is made and the
    /// query settles at once as a missing credential, which the machine
    /// treats as not verified.
    async fn begin_status_query(
        &mut self,
        ticket: Ticket,
    ) -> Result<Option<WorkflowEffect>, ControllerError> {
        let Some(token) = self.until_teardown(self.tokens.token()).await? else {
            tracing::info!("no token stored, skipping verification status query");
            return self.settle_status(ticket, Err(VerificationError::CredentialMissing));
        };
        let gateway = Arc::clone(&self.gateway);
        self.status = Some(PendingStatus {
            ticket,
            response: Box::pin(async move { gateway.query_status(&token).await }),
        });
        Ok(None)
    }

    /// Apply the status response if it has already arrived.
    async fn drain_status(&mut self) -> Result<(), ControllerError> {
        let Some(pending) = self.status.as_mut() else {
            return Ok(());
        };
        let ticket = pending.ticket;
        let result = tokio::select! {
            biased;
            result = pending.response.as_mut() => result,
            () = std::future::ready(()) => return Ok(()),
        };
        self.status = None;
        let effect = self.settle_status(ticket, result)?;
        self.run(effect).await
    }

    /// Feed a status response to the machine. Returns the effect it asks
    /// for, which the caller runs.
    fn settle_status(
        &mut self,
        ticket: Ticket,
        result: Result<StatusReport, VerificationError>,
    ) -> Result<Option<WorkflowEffect>, ControllerError> {
        match &result {
            Ok(report) => tracing::info!(
                verified = report.verified,
                status = report.status.as_deref().unwrap_or("-"),
                "verification status received"
            ),
            Err(VerificationError::CredentialMissing) => {}
            Err(e) => tracing::warn!(
                kind = e.kind(),
                "verification status query failed, continuing as not verified: {e}"
            ),
        }
        let from = self.stage();
        let effect = self
            .workflow
            .handle(WorkflowEvent::StatusResolved { ticket, result })?;
        if self.stage() != from {
            tracing::debug!(event = "status_resolved", %from, to = %self.stage(), "stage transition");
        }
        Ok(effect)
    }

    /// Await `fut` unless teardown wins; the dropped future's response is
    /// never observed.
    async fn until_teardown<F: Future>(&self, fut: F) -> Result<F::Output, ControllerError> {
        tokio::select! {
            biased;
            _ = teardown_signalled(self.teardown.clone()) => {
                tracing::debug!("session torn down, discarding outstanding response");
                Err(ControllerError::TornDown)
            }
            output = fut => Ok(output),
        }
    }
}

impl<G, T> std::fmt::Debug for VerificationController<G, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationController")
            .field("stage", &self.workflow.stage())
            .field("proceeded", &self.proceeded)
            .field("status_pending", &self.status.is_some())
            .field("torn_down", &*self.teardown.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use idv_core::outcome::{MSG_ALREADY_VERIFIED, MSG_APPROVED, MSG_CONNECTION_ERROR, MSG_CREDENTIAL_MISSING};
    use idv_core::{
        BearerToken, CaptureArtifact, CaptureAspect, CaptureError, Slot, StatusReport,
        SubmissionReceipt, SubmissionRequest,
    };

    use crate::token::StaticTokenProvider;

    // ── Fakes ────────────────────────────────────────────────────────

    /// `None` replies hang forever.
    #[derive(Default)]
    struct FakeGateway {
        status_reply: Mutex<Option<Result<StatusReport, VerificationError>>>,
        submit_reply: Mutex<Option<Result<SubmissionReceipt, VerificationError>>>,
        status_calls: AtomicU32,
        submissions: Mutex<Vec<SubmissionRequest>>,
    }

    impl FakeGateway {
        fn replying(
            status: Option<Result<StatusReport, VerificationError>>,
            submit: Option<Result<SubmissionReceipt, VerificationError>>,
        ) -> Self {
            Self {
                status_reply: Mutex::new(status),
                submit_reply: Mutex::new(submit),
                ..Self::default()
            }
        }

        fn not_verified_then_accept() -> Self {
            Self::replying(
                Some(Ok(StatusReport::not_verified())),
                Some(Ok(SubmissionReceipt {
                    success: Some(true),
                    ..SubmissionReceipt::default()
                })),
            )
        }

        fn submissions(&self) -> Vec<SubmissionRequest> {
            self.submissions.lock().unwrap().clone()
        }
    }

    impl VerificationGateway for FakeGateway {
        async fn query_status(
            &self,
            _token: &BearerToken,
        ) -> Result<StatusReport, VerificationError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let reply = self.status_reply.lock().unwrap().clone();
            match reply {
                Some(reply) => reply,
                None => std::future::pending().await,
            }
        }

        async fn submit(
            &self,
            _token: &BearerToken,
            request: &SubmissionRequest,
        ) -> Result<SubmissionReceipt, VerificationError> {
            self.submissions.lock().unwrap().push(request.clone());
            let reply = self.submit_reply.lock().unwrap().clone();
            match reply {
                Some(reply) => reply,
                None => std::future::pending().await,
            }
        }
    }

    /// Hands out scripted outcomes and records what was asked for.
    #[derive(Default)]
    struct ScriptedCapture {
        script: Mutex<VecDeque<Result<CaptureOutcome, CaptureError>>>,
        requests: Mutex<Vec<(Slot, CaptureAspect)>>,
    }

    impl ScriptedCapture {
        fn new(script: Vec<Result<CaptureOutcome, CaptureError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                ..Self::default()
            }
        }

        fn images(images: &[&[u8]]) -> Self {
            Self::new(
                images
                    .iter()
                    .map(|bytes| Ok(CaptureOutcome::Captured(CaptureArtifact::new(*bytes, "mem://"))))
                    .collect(),
            )
        }
    }

    impl CaptureSource for ScriptedCapture {
        async fn capture(
            &self,
            slot: Slot,
            aspect: CaptureAspect,
        ) -> Result<CaptureOutcome, CaptureError> {
            self.requests.lock().unwrap().push((slot, aspect));
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or(Ok(CaptureOutcome::Cancelled))
        }
    }

    fn controller(
        gateway: FakeGateway,
    ) -> (VerificationController<FakeGateway, StaticTokenProvider>, TeardownHandle) {
        VerificationController::new(gateway, StaticTokenProvider::new("tok"))
    }

    // ── Tests ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn skip_back_flow_submits_once_and_succeeds() {
        let (mut c, _h) = controller(FakeGateway::not_verified_then_accept());
        let camera = ScriptedCapture::images(&[b"S", b"F"]);

        assert_eq!(c.mount().await.unwrap(), WorkflowStage::Intro);
        c.start().await.unwrap();
        c.capture(&camera).await.unwrap();
        assert_eq!(
            c.capture(&camera).await.unwrap(),
            CaptureStep::Advanced(WorkflowStage::CaptureDocumentBack)
        );
        assert_eq!(c.skip_document_back().await.unwrap(), WorkflowStage::Result);

        let submissions = c.gateway().submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].selfie.as_bytes(), b"S");
        assert_eq!(submissions[0].document_front.as_bytes(), b"F");
        assert!(submissions[0].document_back.is_none());

        let outcome = c.outcome().unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.message, MSG_APPROVED);

        assert_eq!(
            *camera.requests.lock().unwrap(),
            vec![
                (Slot::Selfie, CaptureAspect::Square),
                (Slot::DocumentFront, CaptureAspect::FourByThree),
            ]
        );
    }

    #[tokio::test]
    async fn capturing_back_page_submits_it() {
        let (mut c, _h) = controller(FakeGateway::not_verified_then_accept());
        let camera = ScriptedCapture::images(&[b"S", b"F", b"B"]);
        c.mount().await.unwrap();
        c.start().await.unwrap();
        c.capture(&camera).await.unwrap();
        c.capture(&camera).await.unwrap();
        assert_eq!(
            c.capture(&camera).await.unwrap(),
            CaptureStep::Advanced(WorkflowStage::Result)
        );
        let submissions = c.gateway().submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].document_back.as_ref().unwrap().as_bytes(), b"B");
    }

    #[tokio::test]
    async fn already_verified_skips_capture_and_submission() {
        let gateway = FakeGateway::replying(
            Some(Ok(StatusReport {
                verified: true,
                ..StatusReport::default()
            })),
            None,
        );
        let (mut c, _h) = controller(gateway);
        assert_eq!(c.mount().await.unwrap(), WorkflowStage::Result);
        assert_eq!(c.outcome().unwrap().message, MSG_ALREADY_VERIFIED);
        assert!(c.gateway().submissions().is_empty());

        c.confirm().await.unwrap();
        assert!(c.has_proceeded());
    }

    #[tokio::test]
    async fn mount_is_idempotent() {
        let (mut c, _h) = controller(FakeGateway::not_verified_then_accept());
        c.mount().await.unwrap();
        c.mount().await.unwrap();
        assert_eq!(c.gateway().status_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn status_failure_is_swallowed() {
        let gateway = FakeGateway::replying(
            Some(Err(VerificationError::TransportFailure {
                reason: "timeout".into(),
            })),
            None,
        );
        let (mut c, _h) = controller(gateway);
        assert_eq!(c.mount().await.unwrap(), WorkflowStage::Intro);
        assert!(c.outcome().is_none());
    }

    #[tokio::test]
    async fn missing_token_skips_status_and_fails_submission() {
        let gateway = FakeGateway::not_verified_then_accept();
        let (mut c, _h) = VerificationController::new(gateway, StaticTokenProvider::none());
        let camera = ScriptedCapture::images(&[b"S", b"F"]);

        assert_eq!(c.mount().await.unwrap(), WorkflowStage::Intro);
        assert_eq!(c.gateway().status_calls.load(Ordering::SeqCst), 0);

        c.start().await.unwrap();
        c.capture(&camera).await.unwrap();
        c.capture(&camera).await.unwrap();
        assert_eq!(c.skip_document_back().await.unwrap(), WorkflowStage::Result);
        assert!(c.gateway().submissions().is_empty());
        let outcome = c.outcome().unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, MSG_CREDENTIAL_MISSING);
    }

    #[tokio::test]
    async fn cancelled_capture_leaves_stage_unchanged() {
        let (mut c, _h) = controller(FakeGateway::not_verified_then_accept());
        let camera = ScriptedCapture::new(vec![Ok(CaptureOutcome::Cancelled)]);
        c.mount().await.unwrap();
        c.start().await.unwrap();
        assert_eq!(c.capture(&camera).await.unwrap(), CaptureStep::Cancelled);
        assert_eq!(c.stage(), WorkflowStage::CaptureSelfie);
        assert!(c.workflow().artifacts().is_empty());
    }

    #[tokio::test]
    async fn capture_failure_surfaces_without_transition() {
        let (mut c, _h) = controller(FakeGateway::not_verified_then_accept());
        let camera = ScriptedCapture::new(vec![Err(CaptureError::Unavailable {
            reason: "camera permission denied".into(),
        })]);
        c.mount().await.unwrap();
        c.start().await.unwrap();
        let err = c.capture(&camera).await.unwrap_err();
        assert!(matches!(err, ControllerError::Capture(_)));
        assert_eq!(c.stage(), WorkflowStage::CaptureSelfie);
    }

    #[tokio::test]
    async fn capture_outside_capture_stage_is_rejected() {
        let (mut c, _h) = controller(FakeGateway::not_verified_then_accept());
        let camera = ScriptedCapture::images(&[b"S"]);
        c.mount().await.unwrap();
        let err = c.capture(&camera).await.unwrap_err();
        assert!(matches!(err, ControllerError::Workflow(_)));
        assert!(camera.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_then_reset_allows_second_attempt() {
        let gateway = FakeGateway::replying(
            Some(Ok(StatusReport::not_verified())),
            Some(Err(VerificationError::TransportFailure {
                reason: "connection reset".into(),
            })),
        );
        let (mut c, _h) = controller(gateway);
        let camera = ScriptedCapture::images(&[b"S", b"F", b"S2", b"F2"]);
        c.mount().await.unwrap();
        c.start().await.unwrap();
        c.capture(&camera).await.unwrap();
        c.capture(&camera).await.unwrap();
        c.skip_document_back().await.unwrap();
        assert_eq!(c.outcome().unwrap().message, MSG_CONNECTION_ERROR);
        assert!(c.confirm().await.is_err());

        assert_eq!(c.reset().await.unwrap(), WorkflowStage::Intro);
        assert!(c.workflow().artifacts().is_empty());

        c.start().await.unwrap();
        c.capture(&camera).await.unwrap();
        c.capture(&camera).await.unwrap();
        c.skip_document_back().await.unwrap();
        let submissions = c.gateway().submissions();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[1].selfie.as_bytes(), b"S2");
        // Status is queried once per instance, not per attempt.
        assert_eq!(c.gateway().status_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn back_then_continue_keeps_artifacts() {
        let (mut c, _h) = controller(FakeGateway::not_verified_then_accept());
        let camera = ScriptedCapture::images(&[b"S", b"F"]);
        c.mount().await.unwrap();
        c.start().await.unwrap();
        c.capture(&camera).await.unwrap();
        c.capture(&camera).await.unwrap();
        c.back_to(WorkflowStage::CaptureSelfie).await.unwrap();
        c.continue_().await.unwrap();
        assert_eq!(c.continue_().await.unwrap(), WorkflowStage::CaptureDocumentBack);
        c.skip_document_back().await.unwrap();
        assert_eq!(c.gateway().submissions()[0].selfie.as_bytes(), b"S");
    }

    #[tokio::test]
    async fn teardown_discards_outstanding_submission() {
        let gateway = FakeGateway::replying(Some(Ok(StatusReport::not_verified())), None);
        let (mut c, handle) = controller(gateway);
        let camera = ScriptedCapture::images(&[b"S", b"F"]);
        c.mount().await.unwrap();
        c.start().await.unwrap();
        c.capture(&camera).await.unwrap();
        c.capture(&camera).await.unwrap();

        let (result, ()) = tokio::join!(c.skip_document_back(), async { handle.tear_down() });
        assert!(matches!(result, Err(ControllerError::TornDown)));
        assert_eq!(c.stage(), WorkflowStage::Processing);
        assert!(c.outcome().is_none());
        assert!(c.is_torn_down());
        assert!(matches!(c.reset().await, Err(ControllerError::TornDown)));
    }

    #[tokio::test]
    async fn teardown_during_status_query_leaves_intro() {
        let gateway = FakeGateway::replying(None, None);
        let (mut c, handle) = controller(gateway);
        assert_eq!(c.mount().await.unwrap(), WorkflowStage::Intro);
        let (result, ()) = tokio::join!(c.wait_for_status(), async { handle.tear_down() });
        assert!(matches!(result, Err(ControllerError::TornDown)));
        assert_eq!(c.stage(), WorkflowStage::Intro);
    }

    /// Holds the status response until released.
    #[derive(Default)]
    struct HeldStatus {
        release: tokio::sync::Notify,
        verified: bool,
        submissions: AtomicU32,
    }

    impl VerificationGateway for HeldStatus {
        async fn query_status(
            &self,
            _token: &BearerToken,
        ) -> Result<StatusReport, VerificationError> {
            self.release.notified().await;
            Ok(StatusReport {
                verified: self.verified,
                ..StatusReport::default()
            })
        }

        async fn submit(
            &self,
            _token: &BearerToken,
            _request: &SubmissionRequest,
        ) -> Result<SubmissionReceipt, VerificationError> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            Ok(SubmissionReceipt::default())
        }
    }

    #[tokio::test]
    async fn unanswered_status_query_does_not_block_capture() {
        let (mut c, _h) = VerificationController::new(
            HeldStatus::default(),
            StaticTokenProvider::new("tok"),
        );
        let camera = ScriptedCapture::images(&[b"S", b"F"]);

        assert_eq!(c.mount().await.unwrap(), WorkflowStage::Intro);
        assert!(c.status_pending());
        assert_eq!(c.start().await.unwrap(), WorkflowStage::CaptureSelfie);
        c.capture(&camera).await.unwrap();
        assert_eq!(
            c.capture(&camera).await.unwrap(),
            CaptureStep::Advanced(WorkflowStage::CaptureDocumentBack)
        );
        assert_eq!(c.skip_document_back().await.unwrap(), WorkflowStage::Result);
        assert!(c.outcome().unwrap().success);
        assert_eq!(c.gateway().submissions.load(Ordering::SeqCst), 1);
        assert!(c.status_pending());
    }

    #[tokio::test]
    async fn late_verified_status_supersedes_capture() {
        let gateway = HeldStatus {
            verified: true,
            ..HeldStatus::default()
        };
        let (mut c, _h) = VerificationController::new(gateway, StaticTokenProvider::new("tok"));
        let camera = ScriptedCapture::images(&[b"S", b"F", b"B"]);

        c.mount().await.unwrap();
        c.start().await.unwrap();
        c.capture(&camera).await.unwrap();
        c.capture(&camera).await.unwrap();
        assert_eq!(c.stage(), WorkflowStage::CaptureDocumentBack);

        c.gateway().release.notify_one();
        assert_eq!(
            c.capture(&camera).await.unwrap(),
            CaptureStep::Superseded(WorkflowStage::Result)
        );
        assert!(!c.status_pending());
        assert_eq!(c.outcome().unwrap().message, MSG_ALREADY_VERIFIED);
        assert!(c.workflow().artifacts().is_empty());
        assert_eq!(c.gateway().submissions.load(Ordering::SeqCst), 0);

        c.confirm().await.unwrap();
        assert!(c.has_proceeded());
    }

    #[tokio::test]
    async fn late_verified_status_applies_before_next_event() {
        let gateway = HeldStatus {
            verified: true,
            ..HeldStatus::default()
        };
        let (mut c, _h) = VerificationController::new(gateway, StaticTokenProvider::new("tok"));
        c.mount().await.unwrap();
        c.start().await.unwrap();

        c.gateway().release.notify_one();
        assert_eq!(c.wait_for_status().await.unwrap(), WorkflowStage::Result);
        assert!(c.back_to(WorkflowStage::CaptureSelfie).await.is_err());
        assert_eq!(c.outcome().unwrap().message, MSG_ALREADY_VERIFIED);
    }

    /// A credential store that never answers.
    struct StalledTokens;

    impl TokenProvider for StalledTokens {
        async fn token(&self) -> Option<BearerToken> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn teardown_interrupts_token_lookup() {
        let (mut c, handle) =
            VerificationController::new(FakeGateway::not_verified_then_accept(), StalledTokens);
        let (result, ()) = tokio::join!(c.mount(), async { handle.tear_down() });
        assert!(matches!(result, Err(ControllerError::TornDown)));
        assert_eq!(c.gateway().status_calls.load(Ordering::SeqCst), 0);
        assert!(c.is_torn_down());
    }

    #[tokio::test]
    async fn dropped_handle_does_not_tear_down() {
        let (mut c, handle) = controller(FakeGateway::not_verified_then_accept());
        drop(handle);
        assert_eq!(c.mount().await.unwrap(), WorkflowStage::Intro);
        assert!(!c.is_torn_down());
    }
}
