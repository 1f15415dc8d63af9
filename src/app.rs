use crate::api::{
    request_consent, ApiClient, HttpDocumentFetcher, LocalDownloadManager, StoragePermission,
    ViewerSettings,
};
use crate::application::{Effect, ViewerSession};
use crate::domain::{DownloadCompletion, DownloadId, LaunchParameters, RenderEvent, RequestCode};
use crate::ui::{ViewerMessage, ViewerView};
use futures::StreamExt;
use iced::Task;

type Session = ViewerSession<HttpDocumentFetcher, StoragePermission, LocalDownloadManager>;

pub struct ViewerApp {
    view: ViewerView,
    session: Session,
    settings: ViewerSettings,
    // Bumped per notice so a stale timer does not clear a newer one
    notice_seq: u64,
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(ViewerMessage),
    /// Status event from the document fetcher
    Render(RenderEvent),
    /// Answer to a storage consent request
    PermissionAnswered(RequestCode, bool),
    /// Completion watch for a job resolved (None when it was stopped or lost)
    DownloadFinished(DownloadId, Option<DownloadCompletion>),
    NoticeExpired(u64),
    Close,
}

impl ViewerApp {
    pub fn new(params: LaunchParameters, settings: ViewerSettings) -> (Self, Task<Message>) {
        let api_client = ApiClient::new(&settings);
        let session = ViewerSession::new(
            params.clone(),
            settings.permission_request_code,
            settings.quality,
            HttpDocumentFetcher::new(api_client.clone()),
            StoragePermission::new(settings.downloads_root.clone(), settings.storage_preapproved),
            LocalDownloadManager::new(api_client, settings.downloads_root.clone()),
        );

        let mut view = ViewerView::new(params.title.clone());
        view.viewer_url = session
            .config()
            .viewer_url(&params.source_url)
            .map(|url| url.to_string());

        let mut app = Self {
            view,
            session,
            settings,
            notice_seq: 0,
        };

        let activation = app.session.activate();
        app.view.sync(app.session.status());

        let mut tasks = Vec::new();
        if let Some(events) = activation.events {
            tasks.push(Task::stream(events.map(Message::Render)));
        }
        tasks.push(app.apply(activation.effects));

        (app, Task::batch(tasks))
    }

    pub fn title(&self) -> String {
        self.session.params().title.clone()
    }

    fn apply(&mut self, effects: Vec<Effect>) -> Task<Message> {
        let tasks: Vec<Task<Message>> = effects
            .into_iter()
            .map(|effect| self.effect_task(effect))
            .collect();
        Task::batch(tasks)
    }

    fn effect_task(&mut self, effect: Effect) -> Task<Message> {
        match effect {
            Effect::ShowNotice(notice) => {
                self.notice_seq += 1;
                let seq = self.notice_seq;
                self.view.notice = Some(notice.message().to_string());

                Task::perform(tokio::time::sleep(self.settings.notice_duration), move |_| {
                    Message::NoticeExpired(seq)
                })
            }
            Effect::RequestPermission(code) => Task::perform(
                request_consent(self.settings.downloads_root.clone()),
                move |granted| Message::PermissionAnswered(code, granted),
            ),
            Effect::WatchCompletion(watch) => {
                let id = watch.id();
                Task::perform(watch.wait(), move |completion| {
                    Message::DownloadFinished(id, completion)
                })
            }
            Effect::Finish { after_notice } => {
                self.session.teardown();
                if after_notice && self.view.notice.is_some() {
                    // Leave the notice up before closing
                    Task::perform(tokio::time::sleep(self.settings.notice_duration), |_| {
                        Message::Close
                    })
                } else {
                    iced::exit()
                }
            }
        }
    }
}

pub fn update(app: &mut ViewerApp, message: Message) -> Task<Message> {
    let effects = match message {
        // The window may linger on a closing notice
        Message::UiMessage(_) if app.session.is_finished() => return Task::none(),
        Message::UiMessage(ViewerMessage::NavigateUp) => app.session.on_navigate_up(),
        Message::UiMessage(ViewerMessage::DownloadPressed) => app.session.on_download_requested(),
        Message::Render(event) => app.session.on_render_event(event),
        Message::PermissionAnswered(code, granted) => {
            app.session.on_permission_result(code, granted)
        }
        Message::DownloadFinished(id, completion) => {
            app.session.on_download_completed(id, completion)
        }
        Message::NoticeExpired(seq) => {
            if seq == app.notice_seq {
                app.view.notice = None;
            }
            return Task::none();
        }
        Message::Close => return iced::exit(),
    };

    app.view.sync(app.session.status());
    app.apply(effects)
}

pub fn view(app: &ViewerApp) -> iced::Element<'_, Message> {
    app.view
        .view(app.session.presentation())
        .map(Message::UiMessage)
}
