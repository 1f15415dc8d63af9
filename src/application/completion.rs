use std::fmt;

use futures::{
    future::{AbortHandle, Abortable, BoxFuture},
    FutureExt,
};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::domain::{DownloadCompletion, DownloadId};

/// Waits for the single completion of one download job.
///
/// Resolves to `None` when aborted, when the service goes away, or when the
/// subscriber fell behind and may have missed its completion.
pub struct CompletionWatch {
    id: DownloadId,
    inner: Abortable<BoxFuture<'static, Option<DownloadCompletion>>>,
}

impl CompletionWatch {
    /// `completions` must be subscribed before the job is enqueued.
    pub fn new(
        mut completions: broadcast::Receiver<DownloadCompletion>,
        id: DownloadId,
    ) -> (Self, AbortHandle) {
        let (handle, registration) = AbortHandle::new_pair();

        let wait = async move {
            loop {
                match completions.recv().await {
                    Ok(completion) if completion.id == id => return Some(completion),
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        // The completion may have been among the skipped ones.
                        tracing::warn!(skipped, "completion subscriber lagged");
                        return None;
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        }
        .boxed();

        (
            Self {
                id,
                inner: Abortable::new(wait, registration),
            },
            handle,
        )
    }

    pub fn id(&self) -> DownloadId {
        self.id
    }

    pub async fn wait(self) -> Option<DownloadCompletion> {
        self.inner.await.ok().flatten()
    }
}

impl fmt::Debug for CompletionWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionWatch").field("id", &self.id).finish()
    }
}
