pub mod error;
pub mod model;

pub use error::{DownloadServiceError, RenderError, ViewerError};
pub use model::{
    DownloadCompletion, DownloadId, DownloadJob, DownloadRequest, EngineSelection,
    LaunchParameters, LoadStatus, Notice, PermissionState, QualityHint, RenderConfig,
    RenderEvent, RequestCode, TransferOutcome, STORAGE_PERMISSION_CODE,
};
