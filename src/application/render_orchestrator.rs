use futures::stream::BoxStream;

use crate::{
    application::ports::DocumentRenderer,
    domain::{LoadStatus, RenderConfig, RenderEvent, ViewerError},
};

/// Drives a single document load and tracks its [`LoadStatus`].
pub struct RenderOrchestrator<R> {
    renderer: R,
    status: LoadStatus,
}

impl<R: DocumentRenderer> RenderOrchestrator<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            status: LoadStatus::Idle,
        }
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    /// Begin loading `url`. An empty URL fails without touching the renderer.
    pub fn initiate(
        &mut self,
        url: &str,
        config: &RenderConfig,
    ) -> Result<BoxStream<'static, RenderEvent>, ViewerError> {
        if url.is_empty() {
            self.status = LoadStatus::Failed(ViewerError::EmptySource.to_string());
            return Err(ViewerError::EmptySource);
        }

        tracing::info!(url, engine = ?config.engine, quality = ?config.quality, "loading document");

        self.renderer.init_with_url(url, config).map_err(|e| {
            self.status = LoadStatus::Failed(e.to_string());
            ViewerError::LoadFailure(e.to_string())
        })
    }

    /// Apply one collaborator event. Returns the failure when the load dies.
    ///
    /// Events after a failure are dropped so a load fails at most once.
    pub fn handle(&mut self, event: RenderEvent) -> Option<ViewerError> {
        if matches!(self.status, LoadStatus::Failed(_)) {
            tracing::debug!(?event, "ignoring render event after failure");
            return None;
        }

        match event {
            RenderEvent::DownloadStarted => {
                self.status = LoadStatus::Downloading {
                    progress_pct: 0,
                    bytes_so_far: 0,
                    total_bytes: None,
                };
            }
            RenderEvent::DownloadProgress {
                progress_pct,
                downloaded_bytes,
                total_bytes,
            } => {
                self.status = LoadStatus::Downloading {
                    progress_pct,
                    bytes_so_far: downloaded_bytes,
                    total_bytes,
                };
            }
            RenderEvent::DownloadSucceeded => {
                self.status = LoadStatus::Succeeded;
            }
            RenderEvent::Error(e) => {
                tracing::warn!(error = %e, "document load failed");
                self.status = LoadStatus::Failed(e.to_string());
                return Some(ViewerError::LoadFailure(e.to_string()));
            }
            RenderEvent::PageChanged { current, total } => {
                tracing::debug!(current, total, "page changed");
            }
        }
        None
    }
}
