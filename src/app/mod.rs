//! TUIのイベントループと共有アプリケーション状態。

mod handlers;
mod render;

use anyhow::Result;
use crossterm::event::{self, Event};
use std::{path::PathBuf, time::Duration};
use tokio::sync::mpsc;

use crate::{
    api::{HttpBackend, token_store::FileTokenStore},
    config::Config,
    events::{Screen, Severity, UiState},
    input::InputBoxState,
    shortcuts::Shortcuts,
    ui::Tui,
    workflow::{Phase, Workflow},
    worker::{self, WorkerCmd, WorkerEvent},
};

use handlers::{handle_key, is_ctrl_c};
use render::draw;

/// キー処理と描画で共有する状態
pub struct App {
    pub cfg_path: PathBuf,
    pub cfg: Config,
    /// 編集中の設定。保存時に `cfg` へコピーする。
    pub draft: Config,
    pub ui: UiState,
    pub workflow: Workflow,
    pub worker_tx: mpsc::Sender<WorkerCmd>,
    pub worker_rx: mpsc::Receiver<WorkerEvent>,
    pub username: String,
    pub password: String,
    /// ログイン応答待ち
    pub logging_in: bool,
    pub input_box: Option<InputBoxState>,
    pub shortcuts: Shortcuts,
}

impl App {
    pub fn new(
        cfg_path: PathBuf,
        cfg: Config,
        shortcuts: Shortcuts,
        worker_tx: mpsc::Sender<WorkerCmd>,
        worker_rx: mpsc::Receiver<WorkerEvent>,
    ) -> Self {
        Self {
            cfg_path,
            draft: cfg.clone(),
            workflow: Workflow::new(cfg.rename.default_mode, cfg.rename.non_image_reason.clone()),
            username: cfg.session.username.clone(),
            cfg,
            ui: UiState::new(Screen::Login),
            worker_tx,
            worker_rx,
            password: String::new(),
            logging_in: false,
            input_box: None,
            shortcuts,
        }
    }

    /// 操作ログへ追記
    pub fn note(&mut self, severity: Severity, msg: impl Into<String>) {
        self.ui.log.push(severity, msg);
    }
}

/// 終了されるまでTUIを実行する
pub async fn run_app(terminal: &mut Tui) -> Result<()> {
    let cfg_path = PathBuf::from("config.toml");
    let cfg = Config::load_or_default(&cfg_path)?;
    let shortcuts = Shortcuts::load_or_default("shortcut.toml")?;

    let (tx_cmd, rx_cmd) = mpsc::channel::<WorkerCmd>(64);
    let (tx_ev, rx_ev) = mpsc::channel::<WorkerEvent>(256);

    tokio::spawn(worker::run(
        rx_cmd,
        tx_ev,
        cfg.clone(),
        HttpBackend::new(),
        FileTokenStore::new("token.json"),
    ));

    let mut app = App::new(cfg_path, cfg, shortcuts, tx_cmd, rx_ev);
    app.note(Severity::Info, format!("server: {}", app.cfg.server.base_url));

    loop {
        terminal.draw(|f| draw(f, &app))?;

        while let Ok(ev) = app.worker_rx.try_recv() {
            handle_worker_event(&mut app, ev);
        }

        if event::poll(Duration::from_millis(50))?
            && let Event::Key(k) = event::read()?
        {
            if is_ctrl_c(&k) {
                break;
            }
            if handle_key(&mut app, k).await? {
                break;
            }
        }
    }
    Ok(())
}

/// ワーカーからのイベントをUIとワークフローへ反映する
pub(crate) fn handle_worker_event(app: &mut App, ev: WorkerEvent) {
    match ev {
        WorkerEvent::LoggedIn => {
            app.logging_in = false;
            app.password.clear();
            app.ui.error = None;
            let target = workflow_screen(app);
            match app.ui.screen {
                Screen::Login => app.ui.screen = target,
                Screen::Settings if app.ui.settings_return == Screen::Login => {
                    app.ui.settings_return = target;
                }
                _ => {}
            }
            app.note(Severity::Success, "session active");
        }
        WorkerEvent::LoginFailed(msg) => {
            app.logging_in = false;
            app.note(Severity::Error, format!("login failed: {msg}"));
            app.ui.error = Some(msg);
        }
        WorkerEvent::SessionExpired => {
            app.logging_in = false;
            if app.ui.screen != Screen::Login {
                app.note(Severity::Warning, "session expired, please log in again");
            }
            if app.ui.screen != Screen::Settings {
                app.ui.screen = Screen::Login;
            }
        }
        WorkerEvent::CountriesLoaded(countries) => {
            let n = countries.len();
            app.workflow.set_catalog(countries);
            app.ui.country_cursor = 0;
            app.note(Severity::Info, format!("{n} countries available"));
        }
        WorkerEvent::PreviewSettled(outcome) => match app.workflow.settle_preview(outcome) {
            Ok(()) => {
                app.ui.preview_cursor = 0;
                show_workflow_screen(app);
                if let Some(p) = app.workflow.preview() {
                    let msg = format!(
                        "preview: {} valid, {} invalid, {} png to convert",
                        p.summary.total_valid, p.summary.total_invalid, p.summary.total_pngs_to_convert
                    );
                    app.note(Severity::Success, msg);
                }
            }
            Err(e) => app.note(Severity::Error, format!("analysis failed: {e}")),
        },
        WorkerEvent::ProcessSettled(outcome) => match app.workflow.settle_commit(outcome) {
            Ok(done) => {
                let (severity, msg) = match (done.succeeded, done.total) {
                    (Some(ok), Some(total)) => (
                        if ok < total { Severity::Warning } else { Severity::Success },
                        format!("processed {ok} of {total} folders"),
                    ),
                    _ => (Severity::Success, "rename finished".to_string()),
                };
                app.note(severity, msg);
                app.ui.slot_cursor = 0;
                show_workflow_screen(app);
            }
            Err(e) => {
                app.note(Severity::Error, format!("rename failed: {e}"));
                show_workflow_screen(app);
            }
        },
        WorkerEvent::Log(s) => app.note(Severity::Info, s),
        WorkerEvent::Error(s) => app.note(Severity::Error, s),
    }
}

/// ワークフローの状態に対応する画面（プレビュー中ならPreview、それ以外はForm）
fn workflow_screen(app: &App) -> Screen {
    match app.workflow.phase() {
        Phase::PreviewReady => Screen::Preview,
        _ => Screen::Form,
    }
}

/// 処理結果の画面へ戻す。ログイン画面はそのまま、設定画面は戻り先だけ差し替える。
fn show_workflow_screen(app: &mut App) {
    let target = workflow_screen(app);
    match app.ui.screen {
        Screen::Login => {}
        Screen::Settings => app.ui.settings_return = target,
        _ => app.ui.screen = target,
    }
}
