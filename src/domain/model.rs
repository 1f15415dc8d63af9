use std::{path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};
use url::Url;

use super::error::{RenderError, ViewerError};

pub const DEFAULT_TITLE: &str = "PDF";
const ALTERNATE_VIEWER_URL: &str = "https://docs.google.com/viewer";

/// Values supplied by the host when a document screen is activated.
///
/// Decoded once from the activation extras and never mutated afterwards.
/// Absent or `null` extras fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LaunchExtras")]
pub struct LaunchParameters {
    #[serde(rename = "pdf_file_url")]
    pub source_url: String,
    #[serde(rename = "pdf_file_title")]
    pub title: String,
    #[serde(rename = "pdf_file_directory", skip_serializing_if = "Option::is_none")]
    pub destination_directory: Option<String>,
    #[serde(rename = "enable_download")]
    pub download_enabled: bool,
    #[serde(rename = "is_google_engine")]
    pub use_alternate_engine: bool,
}

impl Default for LaunchParameters {
    fn default() -> Self {
        Self {
            source_url: String::new(),
            title: DEFAULT_TITLE.to_string(),
            destination_directory: None,
            download_enabled: true,
            use_alternate_engine: true,
        }
    }
}

impl LaunchParameters {
    #[cfg(test)]
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..Default::default()
        }
    }

    pub fn from_extras(extras: serde_json::Map<String, serde_json::Value>) -> Result<Self, ViewerError> {
        serde_json::from_value(serde_json::Value::Object(extras))
            .map_err(|e| ViewerError::LaunchParameters(e.to_string()))
    }

    /// Encode back into activation extras, for hosts that launch a viewer.
    pub fn to_extras(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }

    pub fn engine(&self) -> EngineSelection {
        EngineSelection::from_flag(self.use_alternate_engine)
    }
}

/// Raw activation extras, every key optional.
#[derive(Debug, Default, Deserialize)]
struct LaunchExtras {
    pdf_file_url: Option<String>,
    pdf_file_title: Option<String>,
    pdf_file_directory: Option<String>,
    enable_download: Option<bool>,
    is_google_engine: Option<bool>,
}

impl From<LaunchExtras> for LaunchParameters {
    fn from(extras: LaunchExtras) -> Self {
        let defaults = LaunchParameters::default();
        Self {
            source_url: extras.pdf_file_url.unwrap_or(defaults.source_url),
            title: extras.pdf_file_title.unwrap_or(defaults.title),
            destination_directory: extras.pdf_file_directory,
            download_enabled: extras.enable_download.unwrap_or(defaults.download_enabled),
            use_alternate_engine: extras
                .is_google_engine
                .unwrap_or(defaults.use_alternate_engine),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineSelection {
    Internal,
    AlternateEngine,
}

impl EngineSelection {
    pub fn from_flag(use_alternate_engine: bool) -> Self {
        if use_alternate_engine {
            EngineSelection::AlternateEngine
        } else {
            EngineSelection::Internal
        }
    }
}

/// Rendering quality requested from the engine. The viewer asks for
/// `Enhanced` unless configured otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityHint {
    Fast,
    Normal,
    #[default]
    Enhanced,
}

impl FromStr for QualityHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(QualityHint::Fast),
            "normal" => Ok(QualityHint::Normal),
            "enhanced" => Ok(QualityHint::Enhanced),
            other => Err(format!("unknown quality hint: {}", other)),
        }
    }
}

/// Per-activation configuration handed to the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    pub engine: EngineSelection,
    pub quality: QualityHint,
}

impl RenderConfig {
    pub fn from_params(params: &LaunchParameters, quality: QualityHint) -> Self {
        Self {
            engine: params.engine(),
            quality,
        }
    }

    /// Embedded remote viewer address for the alternate engine.
    pub fn viewer_url(&self, source_url: &str) -> Option<Url> {
        match self.engine {
            EngineSelection::Internal => None,
            EngineSelection::AlternateEngine => Url::parse_with_params(
                ALTERNATE_VIEWER_URL,
                &[("embedded", "true"), ("url", source_url)],
            )
            .ok(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    #[default]
    Unknown,
    Granted,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Downloading {
        progress_pct: u8,
        bytes_so_far: u64,
        total_bytes: Option<u64>,
    },
    Succeeded,
    Failed(String),
}

impl LoadStatus {
    pub fn is_downloading(&self) -> bool {
        matches!(self, LoadStatus::Downloading { .. })
    }
}

/// Status stream emitted by the rendering collaborator, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    DownloadStarted,
    DownloadProgress {
        progress_pct: u8,
        downloaded_bytes: u64,
        total_bytes: Option<u64>,
    },
    DownloadSucceeded,
    Error(RenderError),
    PageChanged {
        current: u32,
        total: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestCode(pub u32);

pub const STORAGE_PERMISSION_CODE: RequestCode = RequestCode(4040);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DownloadId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub url: Url,
    pub destination_path: String,
    pub display_title: String,
}

impl DownloadJob {
    pub fn from_params(params: &LaunchParameters) -> Result<Self, ViewerError> {
        let url = Url::parse(&params.source_url)
            .map_err(|e| ViewerError::DownloadSubmission(format!("malformed URL: {}", e)))?;

        Ok(Self {
            url,
            destination_path: destination_path(
                &params.title,
                params.destination_directory.as_deref(),
            ),
            display_title: params.title.clone(),
        })
    }
}

/// Path of the saved document relative to the public downloads area.
///
/// Title and directory are joined verbatim.
pub fn destination_path(title: &str, directory: Option<&str>) -> String {
    match directory {
        Some(dir) if !dir.is_empty() => format!("/{}/{}.pdf", dir, title),
        _ => format!("/{}.pdf", title),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    Metered,
    Unmetered,
}

/// A job as handed to the platform download service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub job: DownloadJob,
    pub description: String,
    pub network_types: Vec<NetworkType>,
    pub allow_roaming: bool,
    /// Keep a user-visible progress entry while the transfer runs.
    pub show_progress: bool,
    /// Tell the user when the transfer leaves the queue.
    pub notify_on_completion: bool,
}

impl DownloadRequest {
    pub fn new(job: DownloadJob) -> Self {
        Self {
            description: format!("Downloading {}", job.display_title),
            job,
            network_types: vec![NetworkType::Unmetered, NetworkType::Metered],
            allow_roaming: true,
            show_progress: true,
            notify_on_completion: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Saved(PathBuf),
    Failed(String),
}

/// Broadcast by the download service when a job leaves the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadCompletion {
    pub id: DownloadId,
    pub outcome: TransferOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Corrupted,
    DownloadComplete,
    DownloadFailed,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::Corrupted => "Pdf has been corrupted",
            Notice::DownloadComplete => "File is Downloaded Successfully",
            Notice::DownloadFailed => "Unable to download file",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extras(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_defaults_when_keys_absent() {
        let params =
            LaunchParameters::from_extras(extras(json!({ "pdf_file_url": "https://a.b/c.pdf" })))
                .unwrap();
        assert_eq!(params.title, "PDF");
        assert!(params.download_enabled);
        assert_eq!(params.destination_directory, None);
        assert_eq!(params.engine(), EngineSelection::AlternateEngine);
    }

    #[test]
    fn test_null_extras_fall_back() {
        let params = LaunchParameters::from_extras(extras(json!({
            "pdf_file_url": "https://a.b/c.pdf",
            "pdf_file_title": null,
            "is_google_engine": null
        })))
        .unwrap();
        assert_eq!(params.title, "PDF");
        assert_eq!(params.engine(), EngineSelection::AlternateEngine);
    }

    #[test]
    fn test_engine_selection() {
        let internal = LaunchParameters::from_extras(extras(json!({ "is_google_engine": false })))
            .unwrap();
        assert_eq!(internal.engine(), EngineSelection::Internal);

        let alternate = LaunchParameters::from_extras(extras(json!({ "is_google_engine": true })))
            .unwrap();
        assert_eq!(alternate.engine(), EngineSelection::AlternateEngine);
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let err = LaunchParameters::from_extras(extras(json!({ "enable_download": "yes" })))
            .unwrap_err();
        assert!(matches!(err, ViewerError::LaunchParameters(_)));
    }

    #[test]
    fn test_extras_keys() {
        let params = LaunchParameters {
            source_url: "https://a.b/c.pdf".to_string(),
            title: "Report".to_string(),
            destination_directory: Some("2024/Q1".to_string()),
            download_enabled: false,
            use_alternate_engine: false,
        };
        let map = params.to_extras();
        assert_eq!(map["pdf_file_url"], json!("https://a.b/c.pdf"));
        assert_eq!(map["pdf_file_directory"], json!("2024/Q1"));
        assert_eq!(map["enable_download"], json!(false));
        assert_eq!(LaunchParameters::from_extras(map).unwrap(), params);
    }

    #[test]
    fn test_destination_path() {
        assert_eq!(destination_path("Report", None), "/Report.pdf");
        assert_eq!(destination_path("Report", Some("")), "/Report.pdf");
        assert_eq!(
            destination_path("Report", Some("2024/Q1")),
            "/2024/Q1/Report.pdf"
        );
        // no normalisation
        assert_eq!(destination_path("a:b", Some("x//y")), "/x//y/a:b.pdf");
    }

    #[test]
    fn test_download_job_rejects_malformed_url() {
        let params = LaunchParameters::new("not a url");
        let err = DownloadJob::from_params(&params).unwrap_err();
        assert!(matches!(err, ViewerError::DownloadSubmission(_)));
    }

    #[test]
    fn test_download_request_policy() {
        let mut params = LaunchParameters::new("https://a.b/c.pdf");
        params.title = "Report".to_string();
        let request = DownloadRequest::new(DownloadJob::from_params(&params).unwrap());
        assert_eq!(request.description, "Downloading Report");
        assert!(request.network_types.contains(&NetworkType::Metered));
        assert!(request.network_types.contains(&NetworkType::Unmetered));
        assert!(request.allow_roaming);
        assert!(request.show_progress);
        assert!(request.notify_on_completion);
    }

    #[test]
    fn test_quality_hint_from_str() {
        assert_eq!(QualityHint::default(), QualityHint::Enhanced);
        assert_eq!("fast".parse::<QualityHint>(), Ok(QualityHint::Fast));
        assert_eq!(" Normal ".parse::<QualityHint>(), Ok(QualityHint::Normal));
        assert_eq!("ENHANCED".parse::<QualityHint>(), Ok(QualityHint::Enhanced));
        assert!("ultra".parse::<QualityHint>().is_err());
    }

    #[test]
    fn test_viewer_url() {
        let params = LaunchParameters::new("https://a.b/c d.pdf");
        let config = RenderConfig::from_params(&params, QualityHint::Enhanced);
        let url = config.viewer_url(&params.source_url).unwrap();
        assert_eq!(url.host_str(), Some("docs.google.com"));
        assert!(url
            .query_pairs()
            .any(|(k, v)| k == "url" && v == "https://a.b/c d.pdf"));

        let mut internal = config;
        internal.engine = EngineSelection::Internal;
        assert!(internal.viewer_url(&params.source_url).is_none());
    }
}
