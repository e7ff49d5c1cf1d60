//! リネームAPI（リクエスト、multipart組み立て、HTTPバックエンド）。

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::path::PathBuf;

use super::session::{self, Session};
use crate::{error::WorkflowError, expand::VirtualEntry, preview::PreviewResult};

/// 解析・実行の1回分のリクエスト内容
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenameRequest {
    /// trim・大文字化済みの品名
    pub article: String,
    /// 解析済みコード一覧（trim・大文字化、重複はそのまま）
    pub codes: Vec<String>,
    pub entries: Vec<VirtualEntry>,
    /// 画像以外と判定されたファイルを除外させる
    pub only_images: bool,
}

/// ファイル読み込み前のmultipartフィールド
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlannedPart {
    Text {
        name: &'static str,
        value: String,
    },
    File {
        filename: String,
        content_type: String,
        path: PathBuf,
    },
}

impl RenameRequest {
    /// multipartの構成（送信順）
    pub fn plan(&self) -> Vec<PlannedPart> {
        let mut parts = vec![
            PlannedPart::Text {
                name: "articulo",
                value: self.article.clone(),
            },
            PlannedPart::Text {
                name: "codigos",
                value: self.codes.join(","),
            },
        ];
        if self.only_images {
            parts.push(PlannedPart::Text {
                name: "only_images",
                value: "true".into(),
            });
        }
        parts.extend(self.entries.iter().map(|e| PlannedPart::File {
            filename: e.path(),
            content_type: e.file.content_type.clone(),
            path: e.file.path.clone(),
        }));
        parts
    }

    /// 各ファイルを1回ずつ読み、reqwestのフォームを作る
    async fn into_form(&self) -> Result<reqwest::multipart::Form, WorkflowError> {
        let mut form = reqwest::multipart::Form::new();
        for part in self.plan() {
            form = match part {
                PlannedPart::Text { name, value } => form.text(name, value),
                PlannedPart::File {
                    filename,
                    content_type,
                    path,
                } => {
                    let bytes = tokio::fs::read(&path).await?;
                    form.part(
                        "folders",
                        reqwest::multipart::Part::bytes(bytes)
                            .file_name(filename)
                            .mime_str(&content_type)?,
                    )
                }
            };
        }
        Ok(form)
    }
}

/// `/rename/process` の成功レスポンス
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ProcessOutcome {
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default, rename = "exitosas")]
    pub succeeded: Option<u32>,
}

/// エラーレスポンス：`{"error": {"message", "code"}}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
    #[serde(default)]
    code: String,
}

#[derive(Debug, Deserialize)]
struct CountriesResp {
    countries: Vec<String>,
}

/// ワークフローが利用するリモートサービス
#[async_trait]
pub trait RenameBackend: Send + Sync {
    /// 認証情報をアクセストークンに交換する
    async fn login(
        &self,
        base_url: &str,
        username: &str,
        password: &str,
    ) -> Result<String, WorkflowError>;

    /// 現在のトークンを新しいものに更新する
    async fn refresh(&self, session: &Session) -> Result<String, WorkflowError>;

    async fn countries(&self, session: &Session) -> Result<Vec<String>, WorkflowError>;

    async fn preview(
        &self,
        session: &Session,
        req: &RenameRequest,
    ) -> Result<PreviewResult, WorkflowError>;

    async fn process(
        &self,
        session: &Session,
        req: &RenameRequest,
    ) -> Result<ProcessOutcome, WorkflowError>;
}

/// reqwestによる実装
#[derive(Clone, Default)]
pub struct HttpBackend {
    http: Client,
}

impl HttpBackend {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }
}

#[async_trait]
impl RenameBackend for HttpBackend {
    async fn login(
        &self,
        base_url: &str,
        username: &str,
        password: &str,
    ) -> Result<String, WorkflowError> {
        session::login(&self.http, base_url, username, password).await
    }

    async fn refresh(&self, session: &Session) -> Result<String, WorkflowError> {
        session::refresh(&self.http, session).await
    }

    async fn countries(&self, session: &Session) -> Result<Vec<String>, WorkflowError> {
        let resp = self
            .http
            .get(session.url("/folders/countries"))
            .bearer_auth(session.token())
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json::<CountriesResp>().await?.countries)
    }

    async fn preview(
        &self,
        session: &Session,
        req: &RenameRequest,
    ) -> Result<PreviewResult, WorkflowError> {
        let form = req.into_form().await?;
        let resp = self
            .http
            .post(session.url("/rename/preview"))
            .bearer_auth(session.token())
            .multipart(form)
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json::<PreviewResult>().await?)
    }

    async fn process(
        &self,
        session: &Session,
        req: &RenameRequest,
    ) -> Result<ProcessOutcome, WorkflowError> {
        let form = req.into_form().await?;
        let resp = self
            .http
            .post(session.url("/rename/process"))
            .bearer_auth(session.token())
            .multipart(form)
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json::<ProcessOutcome>().await?)
    }
}

/// 2xx以外のレスポンスをワークフローエラーに変換
pub(crate) async fn ensure_success(
    resp: reqwest::Response,
) -> Result<reqwest::Response, WorkflowError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(rejection_from(status, &body))
}

/// 401はセッション切れ、それ以外はサーバー側の拒否
pub(crate) fn rejection_from(status: StatusCode, body: &str) -> WorkflowError {
    if status == StatusCode::UNAUTHORIZED {
        return WorkflowError::SessionExpired;
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(b) => WorkflowError::ServerRejection {
            message: b.error.message,
            code: b.error.code,
        },
        Err(_) => WorkflowError::ServerRejection {
            message: format!("HTTP status {status} error: {body}"),
            code: format!("HTTP_{}", status.as_u16()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::tests::file;

    fn entry(folder: &str, name: &str) -> VirtualEntry {
        VirtualEntry {
            folder: folder.into(),
            filename: name.into(),
            file: file(name),
        }
    }

    #[test]
    fn plan_lists_fields_then_files() {
        let req = RenameRequest {
            article: "CAMISETA".into(),
            codes: vec!["B000000001".into(), "B000000002".into()],
            entries: vec![entry("ROJO ES", "a.MAIN.jpg"), entry("ROJO ES", "notes.txt")],
            only_images: false,
        };
        let plan = req.plan();
        assert_eq!(plan.len(), 4);
        assert_eq!(
            plan[1],
            PlannedPart::Text {
                name: "codigos",
                value: "B000000001,B000000002".into()
            }
        );
        assert_eq!(
            plan[3],
            PlannedPart::File {
                filename: "ROJO ES/notes.txt".into(),
                content_type: "text/plain".into(),
                path: PathBuf::from("/photos/notes.txt"),
            }
        );
    }

    #[test]
    fn only_images_flag_is_sent_when_requested() {
        let mut req = RenameRequest {
            article: "A".into(),
            codes: vec![],
            entries: vec![],
            only_images: false,
        };
        let has_flag = |plan: &[PlannedPart]| {
            plan.iter().any(|p| {
                matches!(p, PlannedPart::Text { name: "only_images", value } if value == "true")
            })
        };
        assert!(!has_flag(&req.plan()));
        req.only_images = true;
        assert!(has_flag(&req.plan()));
    }

    #[test]
    fn structured_errors_keep_message_and_code() {
        let body = r#"{"error": {"code": "VALIDATION_ERROR", "message": "bad codes", "details": {}}}"#;
        assert_eq!(
            rejection_from(StatusCode::BAD_REQUEST, body),
            WorkflowError::ServerRejection {
                message: "bad codes".into(),
                code: "VALIDATION_ERROR".into()
            }
        );
    }

    #[test]
    fn unstructured_errors_fall_back_to_status() {
        let e = rejection_from(StatusCode::BAD_GATEWAY, "upstream down");
        let WorkflowError::ServerRejection { message, code } = e else {
            panic!("expected rejection");
        };
        assert_eq!(code, "HTTP_502");
        assert!(message.contains("upstream down"));
    }

    #[test]
    fn unauthorized_is_session_expired() {
        assert_eq!(
            rejection_from(StatusCode::UNAUTHORIZED, "{}"),
            WorkflowError::SessionExpired
        );
    }

    #[test]
    fn process_outcome_reads_counts() {
        let body = r#"{"success": true, "results": [], "total": 2, "exitosas": 1}"#;
        let o: ProcessOutcome = serde_json::from_str(body).unwrap();
        assert_eq!(o.total, Some(2));
        assert_eq!(o.succeeded, Some(1));
    }

    #[tokio::test]
    async fn missing_file_is_a_transport_error() {
        let req = RenameRequest {
            article: "A".into(),
            codes: vec![],
            entries: vec![entry("X", "definitely-missing-file.jpg")],
            only_images: false,
        };
        let err = req.into_form().await.err();
        assert!(matches!(err, Some(WorkflowError::Transport(_))));
    }
}
