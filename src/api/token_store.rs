//! アクセストークンの保存（token.json）。サーバーごとに1件。

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{collections::HashMap, io::ErrorKind, path::PathBuf};
use tokio::{
    fs,
    io::{AsyncWriteExt, BufWriter},
};

/// 保存トークンと書き込み時刻（unix秒）
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub saved_at: i64,
}

/// アクセストークンをローカルのJSONファイルに保存する
#[derive(Clone)]
pub struct FileTokenStore {
    /// トークンキャッシュのパス
    path: PathBuf,
}

impl FileTokenStore {
    /// 指定パスでストアを作成
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// サーバーURLのハッシュ（末尾のスラッシュは無視）
    fn server_key(base_url: &str) -> String {
        let normalized = base_url.trim_end_matches('/');
        let hash = Sha256::digest(normalized.as_bytes());
        format!("session:{}", URL_SAFE_NO_PAD.encode(hash))
    }

    /// トークンマップ全体を読み込む
    async fn load_map(&self) -> std::io::Result<HashMap<String, StoredToken>> {
        match fs::read(&self.path).await {
            Ok(data) => {
                if data.is_empty() {
                    return Ok(HashMap::new());
                }
                serde_json::from_slice(&data)
                    .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e),
        }
    }

    /// トークンマップを保存する。必要ならディレクトリも作成する。
    async fn save_map(&self, map: &HashMap<String, StoredToken>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let data = serde_json::to_vec_pretty(map)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
        let file = fs::File::create(&self.path).await?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&data).await?;
        writer.flush().await?;
        Ok(())
    }

    /// このサーバーの保存済みトークン。読めないファイルは空扱い。
    pub async fn get(&self, base_url: &str) -> Option<String> {
        let mut map = self.load_map().await.ok()?;
        map.remove(&Self::server_key(base_url))
            .map(|t| t.access_token)
    }

    /// このサーバーのトークンを保存（上書き）
    pub async fn set(&self, base_url: &str, token: &str) -> std::io::Result<()> {
        let mut map = self.load_map().await.unwrap_or_default();
        map.insert(
            Self::server_key(base_url),
            StoredToken {
                access_token: token.to_string(),
                saved_at: chrono::Utc::now().timestamp(),
            },
        );
        self.save_map(&map).await
    }

    /// このサーバーのトークンを削除
    pub async fn remove(&self, base_url: &str) -> std::io::Result<()> {
        let mut map = self.load_map().await.unwrap_or_default();
        if map.remove(&Self::server_key(base_url)).is_some() {
            self.save_map(&map).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tokens_are_kept_per_server() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = FileTokenStore::new(tmp.path().join("nested").join("token.json"));

        assert_eq!(store.get("http://a/api").await, None);
        store.set("http://a/api", "tok-a").await.unwrap();
        store.set("http://b/api", "tok-b").await.unwrap();

        assert_eq!(store.get("http://a/api/").await.as_deref(), Some("tok-a"));
        assert_eq!(store.get("http://b/api").await.as_deref(), Some("tok-b"));

        store.remove("http://a/api").await.unwrap();
        assert_eq!(store.get("http://a/api").await, None);
        assert_eq!(store.get("http://b/api").await.as_deref(), Some("tok-b"));
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("token.json");
        std::fs::write(&path, b"not json").unwrap();
        let store = FileTokenStore::new(&path);
        assert_eq!(store.get("http://a").await, None);
        store.set("http://a", "t").await.unwrap();
        assert_eq!(store.get("http://a").await.as_deref(), Some("t"));
    }
}
