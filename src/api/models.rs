use std::{env, path::PathBuf, time::Duration};

use crate::domain::{QualityHint, RequestCode, STORAGE_PERMISSION_CODE};

const DOWNLOADS_DIR_VAR: &str = "PDF_VIEWER_DOWNLOADS_DIR";
const NOTICE_MS_VAR: &str = "PDF_VIEWER_NOTICE_MS";
const STORAGE_GRANTED_VAR: &str = "PDF_VIEWER_STORAGE_GRANTED";
const QUALITY_VAR: &str = "PDF_VIEWER_QUALITY";

/// Runtime configuration for the viewer and its collaborators
#[derive(Debug, Clone)]
pub struct ViewerSettings {
    /// Public downloads area that destination paths are resolved against.
    pub downloads_root: PathBuf,
    pub permission_request_code: RequestCode,
    /// How long a notice stays on screen.
    pub notice_duration: Duration,
    pub user_agent: String,
    /// Treat storage access as already granted.
    pub storage_preapproved: bool,
    pub quality: QualityHint,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            downloads_root: default_downloads_root(),
            permission_request_code: STORAGE_PERMISSION_CODE,
            notice_duration: Duration::from_millis(2000),
            user_agent: format!("pdf-viewer/{}", env!("CARGO_PKG_VERSION")),
            storage_preapproved: false,
            quality: QualityHint::Enhanced,
        }
    }
}

impl ViewerSettings {
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(DOWNLOADS_DIR_VAR).filter(|d| !d.is_empty()) {
            self.downloads_root = PathBuf::from(dir);
        }

        if let Some(ms) = lookup(NOTICE_MS_VAR) {
            match ms.parse::<u64>() {
                Ok(ms) => self.notice_duration = Duration::from_millis(ms),
                Err(e) => tracing::warn!("Ignoring {}={:?}: {}", NOTICE_MS_VAR, ms, e),
            }
        }

        if let Some(flag) = lookup(STORAGE_GRANTED_VAR) {
            self.storage_preapproved = matches!(flag.as_str(), "1" | "true" | "yes");
        }

        if let Some(quality) = lookup(QUALITY_VAR) {
            match quality.parse() {
                Ok(quality) => self.quality = quality,
                Err(e) => tracing::warn!("Ignoring {}: {}", QUALITY_VAR, e),
            }
        }

        self
    }
}

fn default_downloads_root() -> PathBuf {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join("Downloads"))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
}
