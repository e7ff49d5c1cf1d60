//! セッションとAPI呼び出しをすべて受け持つバックグラウンドワーカー。

use std::time::Duration;
use tokio::{
    sync::mpsc,
    time::{self, Instant, MissedTickBehavior},
};

use crate::{
    api::{ProcessOutcome, RenameBackend, RenameRequest, Session, token_store::FileTokenStore},
    config::Config,
    error::WorkflowError,
    preview::PreviewResult,
};

/// UIからワーカーへ送るコマンド
#[derive(Debug)]
pub enum WorkerCmd {
    /// 認証情報でトークンを取得
    Login { username: String, password: String },
    /// トークンを破棄（メモリとファイル）
    Logout,
    /// 国一覧を取得
    LoadCountries,
    /// 事前解析
    Preview(RenameRequest),
    /// 本実行
    Process(RenameRequest),
    /// 設定を保存して反映
    SaveSettings(Config),
}

/// UI更新のためにワーカーが送るイベント
#[derive(Clone, Debug)]
pub enum WorkerEvent {
    /// 有効なトークンがある
    LoggedIn,
    /// ログイン失敗
    LoginFailed(String),
    /// 有効なトークンが無くなった。UIは再ログインを求める。
    SessionExpired,
    /// 国一覧の取得完了
    CountriesLoaded(Vec<String>),
    /// `Preview` コマンドの結果
    PreviewSettled(Result<PreviewResult, WorkflowError>),
    /// `Process` コマンドの結果
    ProcessSettled(Result<ProcessOutcome, WorkflowError>),
    /// 情報ログ
    Log(String),
    /// ユーザー向けエラーメッセージ
    Error(String),
}

/// コマンド間で保持するワーカーの状態
pub struct Worker<B> {
    backend: B,
    store: FileTokenStore,
    cfg: Config,
    session: Option<Session>,
    tx: mpsc::Sender<WorkerEvent>,
}

/// ワーカーのメインループ。セッションを復元した後、コマンドを1件ずつ処理し、
/// 一定間隔でトークンを更新する。
pub async fn run<B: RenameBackend>(
    mut rx: mpsc::Receiver<WorkerCmd>,
    tx: mpsc::Sender<WorkerEvent>,
    cfg: Config,
    backend: B,
    store: FileTokenStore,
) {
    tracing::info!("worker started");
    let mut worker = Worker::new(backend, store, cfg, tx);
    worker.restore_session().await;

    let mut secs = worker.refresh_secs();
    let mut refresh = refresh_timer(secs);

    loop {
        tokio::select! {
            cmd = rx.recv() => {
                let Some(cmd) = cmd else { break };
                worker.handle(cmd).await;
                // 設定変更で更新間隔が変わることがある。
                if worker.refresh_secs() != secs {
                    secs = worker.refresh_secs();
                    refresh = refresh_timer(secs);
                }
            }
            _ = refresh.tick() => {
                worker.refresh_token().await;
            }
        }
    }
    tracing::info!("worker stopped");
}

/// 初回のtickが1周期後になるinterval
fn refresh_timer(secs: u64) -> time::Interval {
    let period = Duration::from_secs(secs.max(1));
    let mut t = time::interval_at(Instant::now() + period, period);
    t.set_missed_tick_behavior(MissedTickBehavior::Delay);
    t
}

impl<B: RenameBackend> Worker<B> {
    pub fn new(backend: B, store: FileTokenStore, cfg: Config, tx: mpsc::Sender<WorkerEvent>) -> Self {
        Self {
            backend,
            store,
            cfg,
            session: None,
            tx,
        }
    }

    fn refresh_secs(&self) -> u64 {
        self.cfg.session.refresh_interval_secs
    }

    async fn emit(&self, ev: WorkerEvent) {
        let _ = self.tx.send(ev).await;
    }

    /// 前回保存したトークンを読み込む
    pub async fn restore_session(&mut self) {
        let base_url = self.cfg.server.base_url.clone();
        match self.store.get(&base_url).await {
            Some(token) => {
                tracing::info!("restored saved session for {base_url}");
                self.session = Some(Session::new(base_url, token));
                self.emit(WorkerEvent::LoggedIn).await;
                self.load_countries().await;
            }
            None => {
                tracing::info!("no saved session for {base_url}");
                self.emit(WorkerEvent::SessionExpired).await;
            }
        }
    }

    pub async fn handle(&mut self, cmd: WorkerCmd) {
        match cmd {
            WorkerCmd::Login { username, password } => self.login(&username, &password).await,

            WorkerCmd::Logout => {
                tracing::info!("logout");
                self.drop_session().await;
                self.emit(WorkerEvent::Log("logged out".into())).await;
            }

            WorkerCmd::LoadCountries => self.load_countries().await,

            WorkerCmd::Preview(req) => {
                tracing::info!("preview start: {} files", req.entries.len());
                let r = match &self.session {
                    Some(s) => self.backend.preview(s, &req).await,
                    None => Err(WorkflowError::SessionExpired),
                };
                self.expire_on_unauthorized(&r).await;
                match &r {
                    Ok(p) => tracing::info!("preview done: {} folders", p.summary.total_folders),
                    Err(e) => tracing::error!("preview failed: {e}"),
                }
                self.emit(WorkerEvent::PreviewSettled(r)).await;
            }

            WorkerCmd::Process(req) => {
                tracing::info!(
                    "process start: {} files (only_images={})",
                    req.entries.len(),
                    req.only_images
                );
                let r = match &self.session {
                    Some(s) => self.backend.process(s, &req).await,
                    None => Err(WorkflowError::SessionExpired),
                };
                self.expire_on_unauthorized(&r).await;
                match &r {
                    Ok(_) => tracing::info!("process done"),
                    Err(e) => tracing::error!("process failed: {e}"),
                }
                self.emit(WorkerEvent::ProcessSettled(r)).await;
            }

            WorkerCmd::SaveSettings(new_cfg) => {
                tracing::info!("settings updated");
                let server_changed = new_cfg.server.base_url != self.cfg.server.base_url;
                self.cfg = new_cfg;
                self.emit(WorkerEvent::Log("settings updated".into())).await;
                if server_changed {
                    self.session = None;
                    self.restore_session().await;
                }
            }
        }
    }

    async fn login(&mut self, username: &str, password: &str) {
        let base_url = self.cfg.server.base_url.clone();
        tracing::info!("login as {username} at {base_url}");
        match self.backend.login(&base_url, username, password).await {
            Ok(token) => {
                if let Err(e) = self.store.set(&base_url, &token).await {
                    tracing::warn!("token not saved: {e}");
                }
                self.session = Some(Session::new(base_url, token));
                self.emit(WorkerEvent::LoggedIn).await;
                self.emit(WorkerEvent::Log(format!("logged in as {username}"))).await;
                self.load_countries().await;
            }
            Err(e) => {
                tracing::warn!("login failed: {e}");
                self.emit(WorkerEvent::LoginFailed(e.to_string())).await;
            }
        }
    }

    async fn load_countries(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let r = self.backend.countries(session).await;
        self.expire_on_unauthorized(&r).await;
        match r {
            Ok(countries) => {
                tracing::info!("countries loaded: {}", countries.len());
                self.emit(WorkerEvent::CountriesLoaded(countries)).await;
            }
            Err(WorkflowError::SessionExpired) => {}
            Err(e) => {
                tracing::error!("countries failed: {e}");
                self.emit(WorkerEvent::Error(format!("countries failed: {e}")))
                    .await;
            }
        }
    }

    /// 定期更新。通信エラーは無視し、401ならセッション終了。
    pub async fn refresh_token(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        match self.backend.refresh(session).await {
            Ok(token) => {
                tracing::info!("token refreshed");
                let base_url = session.base_url().to_string();
                if let Err(e) = self.store.set(&base_url, &token).await {
                    tracing::warn!("token not saved: {e}");
                }
                if let Some(s) = self.session.as_mut() {
                    s.set_token(token);
                }
            }
            Err(WorkflowError::SessionExpired) => {
                tracing::warn!("refresh rejected, session over");
                self.drop_session().await;
                self.emit(WorkerEvent::SessionExpired).await;
            }
            Err(e) => tracing::warn!("token refresh failed: {e}"),
        }
    }

    async fn expire_on_unauthorized<T>(&mut self, r: &Result<T, WorkflowError>) {
        if matches!(r, Err(WorkflowError::SessionExpired)) {
            tracing::warn!("unauthorized response, dropping session");
            self.drop_session().await;
            self.emit(WorkerEvent::SessionExpired).await;
        }
    }

    async fn drop_session(&mut self) {
        if let Some(s) = self.session.take() {
            if let Err(e) = self.store.remove(s.base_url()).await {
                tracing::warn!("token not removed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{api::fake::FakeBackend, preview::tests::result};
    use std::sync::Arc;

    #[async_trait::async_trait]
    impl RenameBackend for Arc<FakeBackend> {
        async fn login(&self, b: &str, u: &str, p: &str) -> Result<String, WorkflowError> {
            self.as_ref().login(b, u, p).await
        }
        async fn refresh(&self, s: &Session) -> Result<String, WorkflowError> {
            self.as_ref().refresh(s).await
        }
        async fn countries(&self, s: &Session) -> Result<Vec<String>, WorkflowError> {
            self.as_ref().countries(s).await
        }
        async fn preview(&self, s: &Session, r: &RenameRequest) -> Result<PreviewResult, WorkflowError> {
            self.as_ref().preview(s, r).await
        }
        async fn process(&self, s: &Session, r: &RenameRequest) -> Result<ProcessOutcome, WorkflowError> {
            self.as_ref().process(s, r).await
        }
    }

    struct Harness {
        worker: Worker<Arc<FakeBackend>>,
        backend: Arc<FakeBackend>,
        rx: mpsc::Receiver<WorkerEvent>,
        store: FileTokenStore,
        _tmp: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = FileTokenStore::new(tmp.path().join("token.json"));
        let backend = Arc::new(FakeBackend::default());
        let (tx, rx) = mpsc::channel(64);
        let worker = Worker::new(backend.clone(), store.clone(), Config::default(), tx);
        Harness {
            worker,
            backend,
            rx,
            store,
            _tmp: tmp,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<WorkerEvent>) -> Vec<WorkerEvent> {
        let mut out = vec![];
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    fn request() -> RenameRequest {
        RenameRequest {
            article: "A".into(),
            codes: vec!["B000000001".into()],
            entries: vec![],
            only_images: false,
        }
    }

    const URL: &str = "http://localhost:8000/api";

    #[tokio::test]
    async fn login_saves_token_and_loads_countries() {
        let mut h = harness();
        h.backend.logins.lock().unwrap().push_back(Ok("tok".into()));
        h.backend
            .countries
            .lock()
            .unwrap()
            .push_back(Ok(vec!["ESPAÑA".into()]));

        h.worker
            .handle(WorkerCmd::Login {
                username: "ana".into(),
                password: "pw".into(),
            })
            .await;

        let evs = drain(&mut h.rx);
        assert!(matches!(evs[0], WorkerEvent::LoggedIn));
        assert!(evs
            .iter()
            .any(|e| matches!(e, WorkerEvent::CountriesLoaded(c) if c == &vec!["ESPAÑA".to_string()])));
        assert_eq!(h.store.get(URL).await.as_deref(), Some("tok"));
        assert_eq!(h.backend.tokens_seen.lock().unwrap().as_slice(), &["tok".to_string()]);
    }

    #[tokio::test]
    async fn failed_login_reports_and_keeps_no_session() {
        let mut h = harness();
        h.backend
            .logins
            .lock()
            .unwrap()
            .push_back(Err(WorkflowError::ServerRejection {
                message: "Invalid credentials".into(),
                code: "AUTH_ERROR".into(),
            }));
        h.worker
            .handle(WorkerCmd::Login {
                username: "ana".into(),
                password: "bad".into(),
            })
            .await;
        let evs = drain(&mut h.rx);
        assert!(matches!(&evs[0], WorkerEvent::LoginFailed(m) if m.contains("Invalid credentials")));

        h.worker.handle(WorkerCmd::Preview(request())).await;
        let evs = drain(&mut h.rx);
        assert!(evs.iter().any(|e| matches!(
            e,
            WorkerEvent::PreviewSettled(Err(WorkflowError::SessionExpired))
        )));
        assert!(h.backend.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unauthorized_preview_drops_the_session() {
        let mut h = harness();
        h.store.set(URL, "old").await.unwrap();
        h.backend.countries.lock().unwrap().push_back(Ok(vec![]));
        h.worker.restore_session().await;
        drain(&mut h.rx);

        h.backend
            .previews
            .lock()
            .unwrap()
            .push_back(Err(WorkflowError::SessionExpired));
        h.worker.handle(WorkerCmd::Preview(request())).await;

        let evs = drain(&mut h.rx);
        assert!(evs.iter().any(|e| matches!(e, WorkerEvent::SessionExpired)));
        assert!(evs.iter().any(|e| matches!(
            e,
            WorkerEvent::PreviewSettled(Err(WorkflowError::SessionExpired))
        )));
        assert_eq!(h.store.get(URL).await, None);
    }

    #[tokio::test]
    async fn process_settles_with_server_outcome() {
        let mut h = harness();
        h.store.set(URL, "tok").await.unwrap();
        h.backend.countries.lock().unwrap().push_back(Ok(vec![]));
        h.worker.restore_session().await;
        drain(&mut h.rx);

        h.backend.processes.lock().unwrap().push_back(Ok(ProcessOutcome {
            total: Some(2),
            succeeded: Some(2),
        }));
        let mut req = request();
        req.only_images = true;
        h.worker.handle(WorkerCmd::Process(req.clone())).await;

        let evs = drain(&mut h.rx);
        assert!(evs.iter().any(|e| matches!(
            e,
            WorkerEvent::ProcessSettled(Ok(ProcessOutcome { total: Some(2), .. }))
        )));
        let sent = h.backend.sent.lock().unwrap();
        assert_eq!(sent[0], ("process".to_string(), req));
    }

    #[tokio::test]
    async fn preview_result_is_forwarded() {
        let mut h = harness();
        h.store.set(URL, "tok").await.unwrap();
        h.backend.countries.lock().unwrap().push_back(Ok(vec![]));
        h.worker.restore_session().await;
        drain(&mut h.rx);

        h.backend
            .previews
            .lock()
            .unwrap()
            .push_back(Ok(result(1, &[], &[])));
        h.worker.handle(WorkerCmd::Preview(request())).await;
        let evs = drain(&mut h.rx);
        assert!(evs
            .iter()
            .any(|e| matches!(e, WorkerEvent::PreviewSettled(Ok(p)) if p.summary.total_valid == 1)));
    }

    #[tokio::test]
    async fn refresh_replaces_token_and_ignores_network_errors() {
        let mut h = harness();
        h.store.set(URL, "t1").await.unwrap();
        h.backend.countries.lock().unwrap().push_back(Ok(vec![]));
        h.worker.restore_session().await;

        h.backend.refreshes.lock().unwrap().push_back(Ok("t2".into()));
        h.worker.refresh_token().await;
        assert_eq!(h.store.get(URL).await.as_deref(), Some("t2"));

        h.backend
            .refreshes
            .lock()
            .unwrap()
            .push_back(Err(WorkflowError::Transport("offline".into())));
        h.worker.refresh_token().await;
        assert_eq!(h.store.get(URL).await.as_deref(), Some("t2"));

        h.backend
            .refreshes
            .lock()
            .unwrap()
            .push_back(Err(WorkflowError::SessionExpired));
        drain(&mut h.rx);
        h.worker.refresh_token().await;
        assert_eq!(h.store.get(URL).await, None);
        assert!(drain(&mut h.rx)
            .iter()
            .any(|e| matches!(e, WorkerEvent::SessionExpired)));

        let seen = h.backend.tokens_seen.lock().unwrap().clone();
        assert_eq!(&seen[1..], &["t1".to_string(), "t2".into(), "t2".into()]);
    }

    #[tokio::test]
    async fn logout_forgets_the_token() {
        let mut h = harness();
        h.store.set(URL, "tok").await.unwrap();
        h.backend.countries.lock().unwrap().push_back(Ok(vec![]));
        h.worker.restore_session().await;
        h.worker.handle(WorkerCmd::Logout).await;
        assert_eq!(h.store.get(URL).await, None);
    }
}
