//! リネームAPIクライアント。

/// リクエストとHTTPバックエンド
pub mod client;
/// 認証情報、ログインと更新
pub mod session;
/// トークンの永続化
pub mod token_store;

pub use client::{HttpBackend, ProcessOutcome, RenameBackend, RenameRequest};
pub use session::Session;

#[cfg(test)]
pub(crate) mod fake;
