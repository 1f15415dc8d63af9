use iced::{
    widget::{button, column, container, progress_bar, row, text, Space},
    Alignment, Element, Length,
};

use crate::{application::PresentationState, domain::LoadStatus};

/// Screen chrome: toolbar, progress indicator, status line and notices.
pub struct ViewerView {
    pub title: String,
    pub status_message: String,
    pub progress: f32,
    pub notice: Option<String>,
    pub viewer_url: Option<String>,
}

impl ViewerView {
    pub fn new(title: String) -> Self {
        Self {
            title,
            status_message: "Opening document...".to_string(),
            progress: 0.0,
            notice: None,
            viewer_url: None,
        }
    }

    /// Refresh the status line from the current load status.
    pub fn sync(&mut self, status: &LoadStatus) {
        match status {
            LoadStatus::Idle => {
                self.status_message = "Opening document...".to_string();
            }
            LoadStatus::Downloading {
                progress_pct,
                bytes_so_far,
                total_bytes,
            } => {
                self.progress = f32::from(*progress_pct);
                self.status_message = match total_bytes {
                    Some(total) => format!("Loading: {}% ({} / {} bytes)", progress_pct, bytes_so_far, total),
                    None => format!("Loading: {} bytes", bytes_so_far),
                };
            }
            LoadStatus::Succeeded => {
                self.progress = 100.0;
                self.status_message = "Document ready".to_string();
            }
            LoadStatus::Failed(_) => {
                self.status_message.clear();
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum ViewerMessage {
    NavigateUp,
    DownloadPressed,
}

impl ViewerView {
    pub fn view(&self, presentation: PresentationState) -> Element<'_, ViewerMessage> {
        let mut toolbar = row![
            button("Back")
                .on_press(ViewerMessage::NavigateUp)
                .padding([6, 12]),
            text(&self.title).size(22),
            Space::new().width(Length::Fill),
        ]
        .spacing(12)
        .align_y(Alignment::Center);

        if presentation.download_menu_visible {
            toolbar = toolbar.push(
                button("Download")
                    .on_press(ViewerMessage::DownloadPressed)
                    .padding([6, 12]),
            );
        }

        let mut body = column![toolbar, Space::new().height(Length::Fixed(20.0))]
            .padding(20)
            .spacing(10);

        if presentation.progress_visible {
            body = body.push(progress_bar(0.0..=100.0, self.progress));
        }

        body = body.push(text(&self.status_message).size(14));

        if let Some(url) = &self.viewer_url {
            body = body.push(text(format!("Viewer: {}", url)).size(12));
        }

        if let Some(notice) = &self.notice {
            body = body.push(container(text(notice).size(14)).padding(10));
        }

        body.into()
    }
}
