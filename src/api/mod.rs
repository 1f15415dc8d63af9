pub mod client;
pub mod download_manager;
pub mod models;
pub mod permission;

pub use client::{ApiClient, HttpDocumentFetcher};
pub use download_manager::LocalDownloadManager;
pub use models::ViewerSettings;
pub use permission::{request_consent, StoragePermission};
