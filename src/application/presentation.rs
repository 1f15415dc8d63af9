use crate::domain::{LaunchParameters, LoadStatus};

/// Chrome state derived from the load status and launch parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PresentationState {
    pub progress_visible: bool,
    pub download_menu_visible: bool,
}

impl PresentationState {
    pub fn derive(status: &LoadStatus, params: &LaunchParameters) -> Self {
        Self {
            progress_visible: status.is_downloading(),
            download_menu_visible: params.download_enabled,
        }
    }
}
