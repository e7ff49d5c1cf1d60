//! `shortcut.toml` から読み込むキーバインド。

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 全キーバインド（画面ごとのテーブル）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shortcuts {
    pub login: LoginShortcuts,
    pub form: FormShortcuts,
    pub preview: PreviewShortcuts,
    pub settings: SettingsShortcuts,
    pub input_box: InputBoxShortcuts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginShortcuts {
    pub quit: Vec<String>,
    pub settings: Vec<String>,
    pub username: Vec<String>,
    pub password: Vec<String>,
    pub submit: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormShortcuts {
    pub quit: Vec<String>,
    pub settings: Vec<String>,
    pub logout: Vec<String>,
    pub toggle_mode: Vec<String>,
    pub next_field: Vec<String>,
    pub prev_field: Vec<String>,
    pub up: Vec<String>,
    pub down: Vec<String>,
    /// フォーカス中の項目を編集、またはパスを選択
    pub edit: Vec<String>,
    /// カーソル位置の国を切り替え
    pub toggle: Vec<String>,
    pub toggle_all: Vec<String>,
    pub search: Vec<String>,
    /// フォルダを外す、またはカーソル位置のスロットを空にする
    pub remove: Vec<String>,
    /// 解析（フォルダモード）または実行（直接モード）
    pub run: Vec<String>,
    /// 国一覧を再取得
    pub reload_countries: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewShortcuts {
    pub quit: Vec<String>,
    pub back: Vec<String>,
    pub commit: Vec<String>,
    pub commit_only_valid: Vec<String>,
    pub up: Vec<String>,
    pub down: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsShortcuts {
    pub cancel: Vec<String>,
    pub save: Vec<String>,
    pub base_url: Vec<String>,
    pub username: Vec<String>,
    pub refresh_interval: Vec<String>,
    pub default_mode: Vec<String>,
    pub non_image_reason: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputBoxShortcuts {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub backspace: Vec<String>,
    pub delete: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub home: Vec<String>,
    pub end: Vec<String>,
    pub clear_line: Vec<String>,
}

impl Shortcuts {
    /// キーバインドを読み込む。初回はデフォルトを書き出す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let shortcuts = Self::default();
            shortcuts.save(path)?;
            Ok(shortcuts)
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

impl Default for Shortcuts {
    fn default() -> Self {
        Self {
            login: LoginShortcuts {
                quit: keys(&["q"]),
                settings: keys(&["t"]),
                username: keys(&["u"]),
                password: keys(&["p"]),
                submit: keys(&["Enter"]),
            },
            form: FormShortcuts {
                quit: keys(&["q"]),
                settings: keys(&["t"]),
                logout: keys(&["x"]),
                toggle_mode: keys(&["m"]),
                next_field: keys(&["Tab"]),
                prev_field: keys(&["BackTab"]),
                up: keys(&["Up", "k"]),
                down: keys(&["Down", "j"]),
                edit: keys(&["Enter", "e"]),
                toggle: keys(&["Space"]),
                toggle_all: keys(&["a"]),
                search: keys(&["/"]),
                remove: keys(&["d", "Delete"]),
                run: keys(&["r"]),
                reload_countries: keys(&["c"]),
            },
            preview: PreviewShortcuts {
                quit: keys(&["q"]),
                back: keys(&["Esc"]),
                commit: keys(&["c"]),
                commit_only_valid: keys(&["v"]),
                up: keys(&["Up", "k"]),
                down: keys(&["Down", "j"]),
            },
            settings: SettingsShortcuts {
                cancel: keys(&["Esc"]),
                save: keys(&["Enter"]),
                base_url: keys(&["b"]),
                username: keys(&["u"]),
                refresh_interval: keys(&["i"]),
                default_mode: keys(&["m"]),
                non_image_reason: keys(&["n"]),
            },
            input_box: InputBoxShortcuts {
                confirm: keys(&["Enter"]),
                cancel: keys(&["Esc"]),
                backspace: keys(&["Backspace"]),
                delete: keys(&["Delete"]),
                left: keys(&["Left"]),
                right: keys(&["Right"]),
                home: keys(&["Home"]),
                end: keys(&["End"]),
                clear_line: keys(&["Ctrl+u"]),
            },
        }
    }
}

/// `key` がいずれかのバインドに一致すればtrue
pub fn matches_shortcut(key: &KeyEvent, shortcuts: &[String]) -> bool {
    shortcuts.iter().any(|s| matches_single_shortcut(key, s))
}

/// `"Ctrl+u"`、`"a"`、`"Enter"` などのバインド1つと照合する
fn matches_single_shortcut(key: &KeyEvent, shortcut: &str) -> bool {
    let parts: Vec<&str> = shortcut.split('+').collect();

    let (modifiers_str, key_str) = if parts.len() > 1 {
        (&parts[0..parts.len() - 1], parts[parts.len() - 1])
    } else {
        (&[][..], parts[0])
    };

    let mut expected_modifiers = KeyModifiers::empty();
    for modifier in modifiers_str {
        match *modifier {
            "Ctrl" | "ctrl" => expected_modifiers |= KeyModifiers::CONTROL,
            "Alt" | "alt" => expected_modifiers |= KeyModifiers::ALT,
            "Shift" | "shift" => expected_modifiers |= KeyModifiers::SHIFT,
            _ => return false,
        }
    }

    // BackTabはShift付きで届く。
    let actual = if key.code == KeyCode::BackTab {
        key.modifiers.difference(KeyModifiers::SHIFT)
    } else {
        key.modifiers
    };
    if actual != expected_modifiers {
        return false;
    }

    match key_str {
        "Enter" | "enter" => key.code == KeyCode::Enter,
        "Esc" | "esc" => key.code == KeyCode::Esc,
        "Tab" | "tab" => key.code == KeyCode::Tab,
        "BackTab" | "backtab" => key.code == KeyCode::BackTab,
        "Space" | "space" => key.code == KeyCode::Char(' '),
        "Backspace" | "backspace" => key.code == KeyCode::Backspace,
        "Delete" | "delete" => key.code == KeyCode::Delete,
        "Up" | "up" => key.code == KeyCode::Up,
        "Down" | "down" => key.code == KeyCode::Down,
        "Left" | "left" => key.code == KeyCode::Left,
        "Right" | "right" => key.code == KeyCode::Right,
        "Home" | "home" => key.code == KeyCode::Home,
        "End" | "end" => key.code == KeyCode::End,
        s if s.chars().count() == 1 => s.chars().next().is_some_and(|c| key.code == KeyCode::Char(c)),
        _ => false,
    }
}
