use futures::{stream::BoxStream, StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

use super::models::ViewerSettings;
use crate::{
    application::DocumentRenderer,
    domain::{EngineSelection, RenderConfig, RenderError, RenderEvent},
};

/// How many leading bytes are kept to look for the PDF header.
const HEADER_PROBE_LEN: usize = 1024;
const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Server returned {0}")]
    Status(StatusCode),
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    pub fn new(settings: &ViewerSettings) -> Self {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });

        Self { client }
    }

    /// Stream a remote file.
    /// Returns (total_size, stream)
    pub async fn download_file_stream(
        &self,
        url: &str,
    ) -> Result<(Option<u64>, BoxStream<'static, Result<bytes::Bytes>>)> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }

        let total_size = response.content_length();
        let stream = response.bytes_stream().map_err(ApiError::RequestError);

        Ok((total_size, stream.boxed()))
    }
}

/// Rendering collaborator that pulls the document over HTTP.
///
/// The internal engine checks the bytes for a PDF header. The alternate
/// engine leaves decoding to the remote viewer.
#[derive(Clone)]
pub struct HttpDocumentFetcher {
    api: ApiClient,
}

impl HttpDocumentFetcher {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn fetch_stream(&self, url: Url, engine: EngineSelection) -> BoxStream<'static, RenderEvent> {
        futures::stream::unfold(
            FetchState::Start {
                api: self.api.clone(),
                url,
                engine,
            },
            |state| async move {
                match state {
                    FetchState::Start { api, url, engine } => Some((
                        RenderEvent::DownloadStarted,
                        FetchState::Connect { api, url, engine },
                    )),
                    FetchState::Connect { api, url, engine } => {
                        match api.download_file_stream(url.as_str()).await {
                            Ok((total, stream)) => Some((
                                RenderEvent::DownloadProgress {
                                    progress_pct: 0,
                                    downloaded_bytes: 0,
                                    total_bytes: total,
                                },
                                FetchState::Downloading {
                                    stream,
                                    downloaded: 0,
                                    total,
                                    head: Vec::with_capacity(HEADER_PROBE_LEN),
                                    engine,
                                },
                            )),
                            Err(e) => Some((
                                RenderEvent::Error(RenderError::Network(e.to_string())),
                                FetchState::Finished,
                            )),
                        }
                    }
                    FetchState::Downloading {
                        mut stream,
                        mut downloaded,
                        total,
                        mut head,
                        engine,
                    } => match stream.next().await {
                        Some(Ok(chunk)) => {
                            let room = HEADER_PROBE_LEN.saturating_sub(head.len());
                            head.extend_from_slice(&chunk[..room.min(chunk.len())]);
                            downloaded += chunk.len() as u64;

                            Some((
                                RenderEvent::DownloadProgress {
                                    progress_pct: progress_pct(downloaded, total),
                                    downloaded_bytes: downloaded,
                                    total_bytes: total,
                                },
                                FetchState::Downloading {
                                    stream,
                                    downloaded,
                                    total,
                                    head,
                                    engine,
                                },
                            ))
                        }
                        Some(Err(e)) => Some((
                            RenderEvent::Error(RenderError::Network(e.to_string())),
                            FetchState::Finished,
                        )),
                        None => {
                            let undecodable =
                                engine == EngineSelection::Internal && !looks_like_pdf(&head);
                            let event = if undecodable {
                                RenderEvent::Error(RenderError::Decode(
                                    "missing PDF header".to_string(),
                                ))
                            } else {
                                RenderEvent::DownloadSucceeded
                            };
                            Some((event, FetchState::Finished))
                        }
                    },
                    FetchState::Finished => None,
                }
            },
        )
        .boxed()
    }
}

impl DocumentRenderer for HttpDocumentFetcher {
    fn init_with_url(
        &mut self,
        url: &str,
        config: &RenderConfig,
    ) -> std::result::Result<BoxStream<'static, RenderEvent>, RenderError> {
        let url = Url::parse(url).map_err(|e| RenderError::InvalidUrl(e.to_string()))?;
        Ok(self.fetch_stream(url, config.engine))
    }
}

enum FetchState {
    Start {
        api: ApiClient,
        url: Url,
        engine: EngineSelection,
    },
    Connect {
        api: ApiClient,
        url: Url,
        engine: EngineSelection,
    },
    Downloading {
        stream: BoxStream<'static, Result<bytes::Bytes>>,
        downloaded: u64,
        total: Option<u64>,
        head: Vec<u8>,
        engine: EngineSelection,
    },
    Finished,
}

pub(super) fn progress_pct(downloaded: u64, total: Option<u64>) -> u8 {
    match total {
        Some(total) if total > 0 => (downloaded.min(total) * 100 / total) as u8,
        _ => 0,
    }
}

fn looks_like_pdf(head: &[u8]) -> bool {
    head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}
