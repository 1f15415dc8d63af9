//! Interfaces of the collaborators the viewer core drives.

use futures::stream::BoxStream;
use tokio::sync::broadcast;

use crate::domain::{
    DownloadCompletion, DownloadId, DownloadRequest, DownloadServiceError, PermissionState,
    RenderConfig, RenderError, RenderEvent,
};

/// The view/engine that fetches and paints a document.
pub trait DocumentRenderer {
    /// Start loading `url`. Status is reported on the returned stream.
    fn init_with_url(
        &mut self,
        url: &str,
        config: &RenderConfig,
    ) -> Result<BoxStream<'static, RenderEvent>, RenderError>;
}

/// Host side of the storage-write permission.
pub trait PermissionProbe {
    fn check(&self) -> PermissionState;

    /// Record the outcome of a consent flow so later checks see it.
    fn remember(&self, granted: bool);
}

/// Background transfer queue that outlives the screen.
pub trait DownloadService {
    fn subscribe(&self) -> broadcast::Receiver<DownloadCompletion>;

    fn enqueue(&self, request: DownloadRequest) -> Result<DownloadId, DownloadServiceError>;
}
