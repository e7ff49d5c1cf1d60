//! 設定モデルと保存処理。

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::selection::Mode;

/// `config.toml` に保存する設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// リネームAPIの接続先
    pub server: ServerCfg,
    /// ログインとトークン更新
    pub session: SessionCfg,
    /// フォームの既定値
    pub rename: RenameCfg,
}

/// リネームAPIのエンドポイント
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCfg {
    /// API root, e.g. `http://localhost:8000/api`.
    pub base_url: String,
}

/// セッション設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCfg {
    /// ログイン画面の初期値
    pub username: String,
    /// トークン更新の間隔（秒）
    pub refresh_interval_secs: u64,
}

/// リネーム処理の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameCfg {
    /// フォームの初期モード
    pub default_mode: Mode,
    /// 画像以外のファイルに対してサーバーが返す理由
    pub non_image_reason: String,
}

impl Config {
    /// 読み込む。無ければデフォルトを作成する。
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)?;
            Ok(toml::from_str(&s)?)
        } else {
            let cfg = Self::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// 整形したTOMLで保存する
    pub fn save(&self, path: &Path) -> Result<()> {
        let s = toml::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerCfg {
                base_url: "http://localhost:8000/api".into(),
            },
            session: SessionCfg {
                username: "".into(),
                refresh_interval_secs: 300,
            },
            rename: RenameCfg {
                default_mode: Mode::FolderBatch,
                non_image_reason: "not an image file".into(),
            },
        }
    }
}
