//! テスト用のスクリプト式インメモリバックエンド。

use async_trait::async_trait;
use std::{collections::VecDeque, sync::Mutex};

use super::{ProcessOutcome, RenameBackend, RenameRequest, Session};
use crate::{error::WorkflowError, preview::PreviewResult};

/// 呼び出しを記録し、登録済みの応答を順に返す
#[derive(Default)]
pub struct FakeBackend {
    pub logins: Mutex<VecDeque<Result<String, WorkflowError>>>,
    pub refreshes: Mutex<VecDeque<Result<String, WorkflowError>>>,
    pub countries: Mutex<VecDeque<Result<Vec<String>, WorkflowError>>>,
    pub previews: Mutex<VecDeque<Result<PreviewResult, WorkflowError>>>,
    pub processes: Mutex<VecDeque<Result<ProcessOutcome, WorkflowError>>>,
    pub sent: Mutex<Vec<(String, RenameRequest)>>,
    pub tokens_seen: Mutex<Vec<String>>,
}

fn next<T>(queue: &Mutex<VecDeque<Result<T, WorkflowError>>>) -> Result<T, WorkflowError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(WorkflowError::Transport("no scripted response".into())))
}

#[async_trait]
impl RenameBackend for FakeBackend {
    async fn login(&self, _base_url: &str, _username: &str, _password: &str) -> Result<String, WorkflowError> {
        next(&self.logins)
    }

    async fn refresh(&self, session: &Session) -> Result<String, WorkflowError> {
        self.tokens_seen.lock().unwrap().push(session.token().to_string());
        next(&self.refreshes)
    }

    async fn countries(&self, session: &Session) -> Result<Vec<String>, WorkflowError> {
        self.tokens_seen.lock().unwrap().push(session.token().to_string());
        next(&self.countries)
    }

    async fn preview(&self, session: &Session, req: &RenameRequest) -> Result<PreviewResult, WorkflowError> {
        self.tokens_seen.lock().unwrap().push(session.token().to_string());
        self.sent.lock().unwrap().push(("preview".into(), req.clone()));
        next(&self.previews)
    }

    async fn process(&self, session: &Session, req: &RenameRequest) -> Result<ProcessOutcome, WorkflowError> {
        self.tokens_seen.lock().unwrap().push(session.token().to_string());
        self.sent.lock().unwrap().push(("process".into(), req.clone()));
        next(&self.processes)
    }
}
