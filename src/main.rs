mod api;
mod app;
mod application;
mod domain;
mod ui;
mod utils;

use iced::{window, Size};
use tracing_subscriber::EnvFilter;

use crate::{api::ViewerSettings, domain::LaunchParameters};

fn main() -> iced::Result {
    init_tracing();

    let settings = ViewerSettings::from_env();
    let params = utils::parse_launch_args(std::env::args().skip(1)).unwrap_or_else(|e| {
        // Falls through to the empty-source path, which closes the screen.
        tracing::error!("{}", e);
        LaunchParameters::default()
    });

    tracing::info!(
        url = %params.source_url,
        engine = ?params.engine(),
        quality = ?settings.quality,
        downloads = %settings.downloads_root.display(),
        "starting pdf viewer"
    );
    tracing::debug!(extras = ?params.to_extras(), "launch parameters");

    iced::application(
        move || app::ViewerApp::new(params.clone(), settings.clone()),
        app::update,
        app::view,
    )
    .title(app::ViewerApp::title)
    .window(window::Settings {
        size: Size::new(900.0, 700.0),
        ..Default::default()
    })
    .run()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
