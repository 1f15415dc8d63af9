pub mod completion;
pub mod download_orchestrator;
pub mod permission_gate;
pub mod ports;
pub mod presentation;
pub mod render_orchestrator;
pub mod session;

pub use ports::{DocumentRenderer, DownloadService, PermissionProbe};
pub use presentation::PresentationState;
pub use session::{Effect, ViewerSession};
