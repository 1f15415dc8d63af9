use futures::stream::BoxStream;

use crate::{
    application::{
        completion::CompletionWatch,
        download_orchestrator::DownloadOrchestrator,
        permission_gate::{GateDecision, PermissionGate},
        ports::{DocumentRenderer, DownloadService, PermissionProbe},
        presentation::PresentationState,
        render_orchestrator::RenderOrchestrator,
    },
    domain::{
        DownloadCompletion, DownloadId, LaunchParameters, LoadStatus, Notice, QualityHint, RenderConfig,
        RenderEvent, RequestCode, TransferOutcome, ViewerError,
    },
};

/// What the host must do in response to a session event.
#[derive(Debug)]
pub enum Effect {
    ShowNotice(Notice),
    RequestPermission(RequestCode),
    WatchCompletion(CompletionWatch),
    /// Close the screen. `after_notice` keeps a fatal notice readable first.
    Finish { after_notice: bool },
}

/// Result of [`ViewerSession::activate`].
pub struct Activation {
    pub effects: Vec<Effect>,
    /// Render status stream, absent when the load failed up front.
    pub events: Option<BoxStream<'static, RenderEvent>>,
}

enum PendingAction {
    Download,
}

/// One document screen: launch parameters plus the three orchestrators.
pub struct ViewerSession<R, P, S> {
    params: LaunchParameters,
    config: RenderConfig,
    request_code: RequestCode,
    render: RenderOrchestrator<R>,
    gate: PermissionGate<P, PendingAction>,
    downloads: DownloadOrchestrator<S>,
    finished: bool,
}

impl<R, P, S> ViewerSession<R, P, S>
where
    R: DocumentRenderer,
    P: PermissionProbe,
    S: DownloadService,
{
    pub fn new(
        params: LaunchParameters,
        request_code: RequestCode,
        quality: QualityHint,
        renderer: R,
        probe: P,
        service: S,
    ) -> Self {
        let config = RenderConfig::from_params(&params, quality);
        Self {
            params,
            config,
            request_code,
            render: RenderOrchestrator::new(renderer),
            gate: PermissionGate::new(probe),
            downloads: DownloadOrchestrator::new(service),
            finished: false,
        }
    }

    pub fn params(&self) -> &LaunchParameters {
        &self.params
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn status(&self) -> &LoadStatus {
        self.render.status()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn presentation(&self) -> PresentationState {
        PresentationState::derive(self.render.status(), &self.params)
    }

    pub fn activate(&mut self) -> Activation {
        let permission = self.gate.probe();
        tracing::debug!(?permission, "storage permission probed");

        match self.render.initiate(&self.params.source_url, &self.config) {
            Ok(events) => Activation {
                effects: Vec::new(),
                events: Some(events),
            },
            Err(e) => Activation {
                effects: self.fail(e),
                events: None,
            },
        }
    }

    pub fn on_render_event(&mut self, event: RenderEvent) -> Vec<Effect> {
        match self.render.handle(event) {
            Some(e) => self.fail(e),
            None => Vec::new(),
        }
    }

    pub fn on_download_requested(&mut self) -> Vec<Effect> {
        if !self.params.download_enabled {
            tracing::debug!("download requested while disabled");
            return Vec::new();
        }

        match self.gate.check_and_run(self.request_code, PendingAction::Download) {
            GateDecision::Run(action) => self.run(action),
            GateDecision::Requested(code) => vec![Effect::RequestPermission(code)],
            GateDecision::Waiting => Vec::new(),
        }
    }

    pub fn on_permission_result(&mut self, code: RequestCode, granted: bool) -> Vec<Effect> {
        match self.gate.on_request_result(code, granted) {
            Some(action) => self.run(action),
            None => Vec::new(),
        }
    }

    /// `None` means the watch for `id` ended without a completion; its slot
    /// is freed so the user can try again.
    pub fn on_download_completed(
        &mut self,
        id: DownloadId,
        completion: Option<DownloadCompletion>,
    ) -> Vec<Effect> {
        let Some(completion) = completion else {
            self.downloads.abandon(id);
            return Vec::new();
        };
        if !self.downloads.on_completion(&completion) {
            return Vec::new();
        }

        match completion.outcome {
            TransferOutcome::Saved(path) => {
                tracing::info!(path = %path.display(), "document saved");
                vec![Effect::ShowNotice(Notice::DownloadComplete)]
            }
            TransferOutcome::Failed(reason) => {
                tracing::error!(reason, "document transfer failed");
                vec![Effect::ShowNotice(Notice::DownloadFailed)]
            }
        }
    }

    pub fn on_navigate_up(&mut self) -> Vec<Effect> {
        self.teardown();
        self.finished = true;
        vec![Effect::Finish {
            after_notice: false,
        }]
    }

    /// Drop the completion watch. Safe to call more than once.
    pub fn teardown(&mut self) {
        self.downloads.release();
    }

    fn run(&mut self, action: PendingAction) -> Vec<Effect> {
        match action {
            PendingAction::Download => self.start_download(),
        }
    }

    fn start_download(&mut self) -> Vec<Effect> {
        match self.downloads.submit(&self.params, self.gate.state()) {
            Ok(watch) => vec![Effect::WatchCompletion(watch)],
            Err(e @ ViewerError::DownloadSubmission(_)) => {
                tracing::error!(error = %e, "download submission failed");
                vec![Effect::ShowNotice(Notice::DownloadFailed)]
            }
            Err(e) => {
                tracing::debug!(error = %e, "download not started");
                Vec::new()
            }
        }
    }

    fn fail(&mut self, error: ViewerError) -> Vec<Effect> {
        if self.finished {
            return Vec::new();
        }
        debug_assert!(error.is_fatal());
        tracing::warn!(error = %error, "closing viewer");

        self.teardown();
        self.finished = true;
        vec![
            Effect::ShowNotice(Notice::Corrupted),
            Effect::Finish { after_notice: true },
        ]
    }
}
