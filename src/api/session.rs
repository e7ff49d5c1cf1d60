//! 認証付きリクエストの文脈とログイン・更新処理。

use reqwest::Client;
use serde::Deserialize;

use super::client::ensure_success;
use crate::error::WorkflowError;

/// 認証付き呼び出しに渡すベースURLとBearerトークン
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    base_url: String,
    token: String,
}

impl Session {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }

    /// `/rename/preview` などのAPIパスの絶対URL
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResp {
    access_token: String,
}

/// `POST /auth/token`（フォーム送信）。失敗はすべて認証エラー扱い。
pub async fn login(
    http: &Client,
    base_url: &str,
    username: &str,
    password: &str,
) -> Result<String, WorkflowError> {
    let url = format!("{}/auth/token", base_url.trim_end_matches('/'));
    let form = reqwest::multipart::Form::new()
        .text("username", username.to_string())
        .text("password", password.to_string());

    let resp = http.post(url).multipart(form).send().await?;
    if !resp.status().is_success() {
        tracing::warn!("login rejected: HTTP {}", resp.status());
        return Err(WorkflowError::ServerRejection {
            message: "Invalid credentials".into(),
            code: "AUTH_ERROR".into(),
        });
    }
    Ok(resp.json::<TokenResp>().await?.access_token)
}

/// 現在のBearerトークンで `POST /auth/refresh`
pub async fn refresh(http: &Client, session: &Session) -> Result<String, WorkflowError> {
    let resp = http
        .post(session.url("/auth/refresh"))
        .bearer_auth(session.token())
        .send()
        .await?;
    let resp = ensure_success(resp).await?;
    Ok(resp.json::<TokenResp>().await?.access_token)
}
