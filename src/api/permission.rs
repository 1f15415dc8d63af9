use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use rfd::{AsyncMessageDialog, MessageButtons, MessageDialogResult, MessageLevel};

use crate::{application::PermissionProbe, domain::PermissionState};

/// Write access to the downloads root, granted once per process by the user.
#[derive(Clone)]
pub struct StoragePermission {
    downloads_root: PathBuf,
    granted: Arc<AtomicBool>,
}

impl StoragePermission {
    pub fn new(downloads_root: PathBuf, preapproved: bool) -> Self {
        Self {
            downloads_root,
            granted: Arc::new(AtomicBool::new(preapproved)),
        }
    }
}

impl PermissionProbe for StoragePermission {
    fn check(&self) -> PermissionState {
        if self.granted.load(Ordering::Acquire) && root_writable(&self.downloads_root) {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        }
    }

    fn remember(&self, granted: bool) {
        self.granted.store(granted, Ordering::Release);
    }
}

/// The closest existing ancestor decides, since the root may not exist yet.
fn root_writable(root: &Path) -> bool {
    root.ancestors()
        .find(|p| p.exists())
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|meta| meta.is_dir() && !meta.permissions().readonly())
        .unwrap_or(false)
}

/// Ask the user whether documents may be saved under `downloads_root`.
pub async fn request_consent(downloads_root: PathBuf) -> bool {
    let answer = AsyncMessageDialog::new()
        .set_level(MessageLevel::Info)
        .set_title("Storage access")
        .set_description(format!(
            "Allow saving documents to {}?",
            downloads_root.display()
        ))
        .set_buttons(MessageButtons::YesNo)
        .show()
        .await;

    matches!(answer, MessageDialogResult::Yes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_granted_until_remembered() {
        let dir = tempfile::tempdir().unwrap();
        let permission = StoragePermission::new(dir.path().to_path_buf(), false);
        assert_eq!(permission.check(), PermissionState::Denied);

        permission.remember(true);
        assert_eq!(permission.check(), PermissionState::Granted);

        permission.remember(false);
        assert_eq!(permission.check(), PermissionState::Denied);
    }

    #[test]
    fn test_missing_root_uses_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let permission = StoragePermission::new(dir.path().join("not/yet/created"), true);
        assert_eq!(permission.check(), PermissionState::Granted);
    }

    #[test]
    fn test_file_as_root_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();

        let permission = StoragePermission::new(file, true);
        assert_eq!(permission.check(), PermissionState::Denied);
    }
}
