use std::{
    path::{Component, Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use futures::StreamExt;
use thiserror::Error;
use tokio::{io::AsyncWriteExt, runtime::Handle, sync::broadcast};

use super::client::{progress_pct, ApiClient, ApiError};
use crate::{
    application::DownloadService,
    domain::{
        DownloadCompletion, DownloadId, DownloadRequest, DownloadServiceError, TransferOutcome,
    },
};

const COMPLETION_CAPACITY: usize = 16;
/// Progress entries are reported in steps of this many percent.
const PROGRESS_STEP: u8 = 25;

#[derive(Error, Debug)]
enum TransferError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Download queue backed by tokio tasks.
///
/// Jobs are not tied to any screen: a transfer keeps running after the
/// subscriber that asked for it has gone, and its completion is broadcast to
/// whoever is still listening.
#[derive(Clone)]
pub struct LocalDownloadManager {
    api: ApiClient,
    downloads_root: PathBuf,
    next_id: Arc<AtomicU64>,
    completions: broadcast::Sender<DownloadCompletion>,
}

impl LocalDownloadManager {
    pub fn new(api: ApiClient, downloads_root: PathBuf) -> Self {
        let (completions, _) = broadcast::channel(COMPLETION_CAPACITY);
        Self {
            api,
            downloads_root,
            next_id: Arc::new(AtomicU64::new(1)),
            completions,
        }
    }

    /// Place `destination_path` under the downloads root.
    ///
    /// The path is kept as given; only components that would leave the root
    /// are refused.
    pub fn resolve_target(&self, destination_path: &str) -> Result<PathBuf, DownloadServiceError> {
        let relative = Path::new(destination_path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if relative.as_os_str().is_empty() || escapes {
            return Err(DownloadServiceError::InvalidDestination(
                destination_path.to_string(),
            ));
        }

        Ok(self.downloads_root.join(relative))
    }
}

impl DownloadService for LocalDownloadManager {
    fn subscribe(&self) -> broadcast::Receiver<DownloadCompletion> {
        self.completions.subscribe()
    }

    fn enqueue(&self, request: DownloadRequest) -> Result<DownloadId, DownloadServiceError> {
        if request.network_types.is_empty() {
            return Err(DownloadServiceError::InvalidRequest(
                "no allowed network types".to_string(),
            ));
        }

        let runtime = Handle::try_current().map_err(|_| DownloadServiceError::Unavailable)?;
        let target = self.resolve_target(&request.job.destination_path)?;
        let id = DownloadId(self.next_id.fetch_add(1, Ordering::Relaxed));

        tracing::info!(
            id = id.0,
            url = %request.job.url,
            target = %target.display(),
            networks = ?request.network_types,
            roaming = request.allow_roaming,
            "{}",
            request.description
        );

        let api = self.api.clone();
        let completions = self.completions.clone();
        let url = request.job.url.to_string();
        let title = request.job.display_title.clone();
        let show_progress = request.show_progress;
        let notify_on_completion = request.notify_on_completion;

        runtime.spawn(async move {
            let outcome = match transfer(&api, &url, &target, id, show_progress).await {
                Ok(bytes) => {
                    tracing::info!(id = id.0, bytes, path = %target.display(), "download finished");
                    TransferOutcome::Saved(target)
                }
                Err(e) => {
                    tracing::error!(id = id.0, error = %e, "download failed");
                    TransferOutcome::Failed(e.to_string())
                }
            };

            if let Some(text) = completion_notification(&title, notify_on_completion, &outcome) {
                tracing::info!(id = id.0, "{}", text);
            }

            // No subscribers left is fine: the screen may be gone.
            let _ = completions.send(DownloadCompletion { id, outcome });
        });

        Ok(id)
    }
}

/// Stream `url` into `target`, writing through a `.part` file.
///
/// The partial file is removed when the transfer fails.
async fn transfer(
    api: &ApiClient,
    url: &str,
    target: &Path,
    id: DownloadId,
    show_progress: bool,
) -> Result<u64, TransferError> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let (total, stream) = api.download_file_stream(url).await?;

    let mut partial = target.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let result = async {
        let mut file = tokio::fs::File::create(&partial).await?;
        let mut stream = stream;
        let mut written = 0u64;
        let mut reported = 0u8;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;

            if show_progress {
                if let Some(step) = progress_step(reported, progress_pct(written, total)) {
                    tracing::info!(id = id.0, progress = step, "download progress");
                    reported = step;
                }
            }
        }

        file.sync_all().await?;
        Ok::<u64, TransferError>(written)
    }
    .await;

    match result {
        Ok(written) => {
            tokio::fs::rename(&partial, target).await?;
            Ok(written)
        }
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %partial.display(), error = %cleanup, "could not remove partial download");
                }
            }
            Err(e)
        }
    }
}

/// Next progress step to report, if `pct` has crossed one since `reported`.
fn progress_step(reported: u8, pct: u8) -> Option<u8> {
    let step = pct / PROGRESS_STEP * PROGRESS_STEP;
    (step > reported).then_some(step)
}

/// Desktop stand-in for the platform's completion notification.
fn completion_notification(
    title: &str,
    notify: bool,
    outcome: &TransferOutcome,
) -> Option<String> {
    if !notify {
        return None;
    }
    Some(match outcome {
        TransferOutcome::Saved(path) => format!("{} saved to {}", title, path.display()),
        TransferOutcome::Failed(reason) => format!("{} could not be downloaded: {}", title, reason),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::models::ViewerSettings,
        domain::{DownloadJob, LaunchParameters},
    };
    use std::{io::Write, time::Duration};

    fn manager(root: &Path) -> LocalDownloadManager {
        LocalDownloadManager::new(
            ApiClient::new(&ViewerSettings::default()),
            root.to_path_buf(),
        )
    }

    fn request(url: &str, title: &str, directory: Option<&str>) -> DownloadRequest {
        let mut params = LaunchParameters::new(url);
        params.title = title.to_string();
        params.destination_directory = directory.map(str::to_string);
        DownloadRequest::new(DownloadJob::from_params(&params).unwrap())
    }

    async fn next_completion(
        rx: &mut broadcast::Receiver<DownloadCompletion>,
    ) -> DownloadCompletion {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("completion timed out")
            .unwrap()
    }

    #[test]
    fn test_resolve_target() {
        let manager = manager(Path::new("/data/Downloads"));
        assert_eq!(
            manager.resolve_target("/Report.pdf").unwrap(),
            PathBuf::from("/data/Downloads/Report.pdf")
        );
        assert_eq!(
            manager.resolve_target("/2024/Q1/Report.pdf").unwrap(),
            PathBuf::from("/data/Downloads/2024/Q1/Report.pdf")
        );
        assert!(matches!(
            manager.resolve_target("/../etc/passwd.pdf"),
            Err(DownloadServiceError::InvalidDestination(_))
        ));
        assert!(manager.resolve_target("/").is_err());
    }

    #[test]
    fn test_enqueue_without_runtime_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = manager(dir.path())
            .enqueue(request("https://example.com/a.pdf", "a", None))
            .unwrap_err();
        assert_eq!(err, DownloadServiceError::Unavailable);
    }

    #[tokio::test]
    async fn test_download_saves_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/report.pdf")
            .with_status(200)
            .with_body("%PDF-1.4 report")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        let mut rx = manager.subscribe();

        let id = manager
            .enqueue(request(
                &format!("{}/report.pdf", server.url()),
                "Report",
                Some("2024/Q1"),
            ))
            .unwrap();

        let completion = next_completion(&mut rx).await;
        let expected = dir.path().join("2024/Q1/Report.pdf");
        assert_eq!(completion.id, id);
        assert_eq!(completion.outcome, TransferOutcome::Saved(expected.clone()));
        assert_eq!(std::fs::read(&expected).unwrap(), b"%PDF-1.4 report");
        assert!(!dir.path().join("2024/Q1/Report.pdf.part").exists());
    }

    #[tokio::test]
    async fn test_failed_transfer_is_broadcast() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gone.pdf")
            .with_status(500)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        let mut rx = manager.subscribe();

        let id = manager
            .enqueue(request(&format!("{}/gone.pdf", server.url()), "gone", None))
            .unwrap();

        let completion = next_completion(&mut rx).await;
        assert_eq!(completion.id, id);
        assert!(matches!(completion.outcome, TransferOutcome::Failed(_)));
        assert!(!dir.path().join("gone.pdf").exists());
    }

    #[tokio::test]
    async fn test_interrupted_transfer_leaves_no_partial_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/cut.pdf")
            .with_status(200)
            .with_chunked_body(|w| {
                w.write_all(b"%PDF-1.4 partial")?;
                Err(std::io::Error::new(std::io::ErrorKind::Other, "connection cut"))
            })
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        let mut rx = manager.subscribe();

        let id = manager
            .enqueue(request(&format!("{}/cut.pdf", server.url()), "cut", None))
            .unwrap();

        let completion = next_completion(&mut rx).await;
        assert_eq!(completion.id, id);
        assert!(matches!(completion.outcome, TransferOutcome::Failed(_)));
        assert!(!dir.path().join("cut.pdf").exists());
        assert!(!dir.path().join("cut.pdf.part").exists());
    }

    #[test]
    fn test_progress_step() {
        assert_eq!(progress_step(0, 10), None);
        assert_eq!(progress_step(0, 30), Some(25));
        assert_eq!(progress_step(25, 49), None);
        assert_eq!(progress_step(25, 100), Some(100));
        assert_eq!(progress_step(100, 100), None);
    }

    #[test]
    fn test_completion_notification() {
        let saved = TransferOutcome::Saved(PathBuf::from("/d/Report.pdf"));
        assert_eq!(
            completion_notification("Report", true, &saved).as_deref(),
            Some("Report saved to /d/Report.pdf")
        );
        assert_eq!(completion_notification("Report", false, &saved), None);

        let failed = TransferOutcome::Failed("500".to_string());
        assert!(completion_notification("Report", true, &failed)
            .unwrap()
            .contains("could not be downloaded"));
    }

    #[tokio::test]
    async fn test_ids_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        let first = manager
            .enqueue(request("http://127.0.0.1:9/a.pdf", "a", None))
            .unwrap();
        let second = manager
            .enqueue(request("http://127.0.0.1:9/b.pdf", "b", None))
            .unwrap();
        assert_ne!(first, second);
    }
}
