//! リネーム処理のエラー型。

use thiserror::Error;

/// ローカル検証の失敗。通信は行わない。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Enter the article name")]
    MissingArticle,

    #[error("Enter at least one code")]
    MissingCodes,

    #[error("Codes must be exactly 10 characters: {}", .0.join(", "))]
    CodeLength(Vec<String>),

    #[error("Select at least one folder")]
    MissingFolder,

    #[error("Select at least one country")]
    MissingCountry,

    #[error("Enter the color")]
    MissingColor,

    #[error("Add at least one photo")]
    MissingPhoto,

    #[error("Only image files are allowed: {name}")]
    NotAnImage { name: String },

    #[error("Slot {index} does not exist")]
    SlotOutOfRange { index: usize },
}

/// ワークフローの遷移を終わらせうるエラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Connection error: {0}")]
    Transport(String),

    #[error("{message} ({code})")]
    ServerRejection { message: String, code: String },

    #[error("Session expired, please log in again")]
    SessionExpired,

    #[error("A request is already in progress ({phase})")]
    Busy { phase: &'static str },

    #[error("Action not available: {0}")]
    NotAvailable(&'static str),
}

impl From<reqwest::Error> for WorkflowError {
    fn from(e: reqwest::Error) -> Self {
        WorkflowError::Transport(e.to_string())
    }
}

impl From<std::io::Error> for WorkflowError {
    fn from(e: std::io::Error) -> Self {
        WorkflowError::Transport(e.to_string())
    }
}
