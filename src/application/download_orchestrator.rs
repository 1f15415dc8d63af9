use futures::future::AbortHandle;

use crate::{
    application::{completion::CompletionWatch, ports::DownloadService},
    domain::{
        DownloadCompletion, DownloadId, DownloadJob, DownloadRequest, LaunchParameters,
        PermissionState, ViewerError,
    },
};

/// The one job this screen is waiting on. Dropping it stops the watch.
struct InFlightDownload {
    id: DownloadId,
    abort: AbortHandle,
}

impl Drop for InFlightDownload {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

pub struct DownloadOrchestrator<S> {
    service: S,
    in_flight: Option<InFlightDownload>,
}

impl<S: DownloadService> DownloadOrchestrator<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            in_flight: None,
        }
    }

    #[cfg(test)]
    pub fn in_flight(&self) -> Option<DownloadId> {
        self.in_flight.as_ref().map(|job| job.id)
    }

    /// Save the document described by `params` to the public downloads area.
    ///
    /// The completion subscriber is registered before the job is enqueued.
    pub fn submit(
        &mut self,
        params: &LaunchParameters,
        permission: PermissionState,
    ) -> Result<CompletionWatch, ViewerError> {
        if !params.download_enabled {
            return Err(ViewerError::DownloadDisabled);
        }
        if permission != PermissionState::Granted {
            return Err(ViewerError::PermissionDenied);
        }
        if self.in_flight.is_some() {
            return Err(ViewerError::DownloadInProgress);
        }

        let job = DownloadJob::from_params(params)?;
        let request = DownloadRequest::new(job);
        let destination = request.job.destination_path.clone();

        let completions = self.service.subscribe();
        let id = self
            .service
            .enqueue(request)
            .map_err(|e| ViewerError::DownloadSubmission(e.to_string()))?;

        tracing::info!(id = id.0, destination, "download enqueued");

        let (watch, abort) = CompletionWatch::new(completions, id);
        self.in_flight = Some(InFlightDownload { id, abort });
        Ok(watch)
    }

    /// Returns true only for the first completion of the in-flight job.
    pub fn on_completion(&mut self, completion: &DownloadCompletion) -> bool {
        match &self.in_flight {
            Some(job) if job.id == completion.id => {
                self.in_flight = None;
                true
            }
            _ => false,
        }
    }

    /// Free the slot of a job whose watch ended without a completion.
    pub fn abandon(&mut self, id: DownloadId) -> bool {
        match &self.in_flight {
            Some(job) if job.id == id => {
                tracing::warn!(id = id.0, "lost track of download completion");
                self.in_flight = None;
                true
            }
            _ => false,
        }
    }

    /// Stop watching. The transfer itself keeps going.
    pub fn release(&mut self) {
        if let Some(job) = self.in_flight.take() {
            tracing::debug!(id = job.id.0, "releasing completion watch");
        }
    }
}
