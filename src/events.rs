//! 画面遷移、フォームのフォーカス、操作ログ。

use std::collections::VecDeque;

use crate::selection::Mode;

/// 操作ログの保持件数
pub const LOG_CAPACITY: usize = 200;

/// 現在表示中の画面
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    /// ログイン画面
    Login,
    /// リネームフォーム
    Form,
    /// 事前解析結果と実行操作
    Preview,
    /// 設定画面
    Settings,
}

impl Screen {
    pub fn label(&self) -> &'static str {
        match self {
            Screen::Login => "Login",
            Screen::Form => "Form",
            Screen::Preview => "Preview",
            Screen::Settings => "Settings",
        }
    }
}

/// フォーム内でフォーカスできる項目
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormField {
    Article,
    Codes,
    Folder,
    Countries,
    Color,
    Slots,
}

impl FormField {
    /// `mode` で表示する項目（上から順）
    pub fn order(mode: Mode) -> &'static [FormField] {
        match mode {
            Mode::FolderBatch => &[
                FormField::Article,
                FormField::Codes,
                FormField::Folder,
                FormField::Countries,
            ],
            Mode::DirectUpload => &[
                FormField::Article,
                FormField::Codes,
                FormField::Countries,
                FormField::Color,
                FormField::Slots,
            ],
        }
    }

    /// 次の項目（末尾の次は先頭）。該当しない項目なら先頭へ。
    pub fn next(self, mode: Mode) -> FormField {
        let order = Self::order(mode);
        match order.iter().position(|f| *f == self) {
            Some(i) => order[(i + 1) % order.len()],
            None => order[0],
        }
    }

    pub fn prev(self, mode: Mode) -> FormField {
        let order = Self::order(mode);
        match order.iter().position(|f| *f == self) {
            Some(i) => order[(i + order.len() - 1) % order.len()],
            None => order[0],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    /// ローカル時刻 `HH:MM:SS`
    pub time: String,
    pub severity: Severity,
    pub message: String,
}

/// 件数上限つきの操作ログ。古いものから削除する。
#[derive(Clone, Debug)]
pub struct LogPane {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for LogPane {
    fn default() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }
}

impl LogPane {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            time: chrono::Local::now().format("%H:%M:%S").to_string(),
            severity,
            message: message.into(),
        });
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// 新しい順
    pub fn newest(&self, n: usize) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().rev().take(n)
    }
}

/// 描画と共有するUI状態
#[derive(Clone, Debug)]
pub struct UiState {
    pub screen: Screen,
    /// フォーカス中の項目
    pub focus: FormField,
    /// 絞り込み後の国リストの行
    pub country_cursor: usize,
    /// 直接モードのスロット行（0..10）
    pub slot_cursor: usize,
    /// プレビュー画面のフォルダ行
    pub preview_cursor: usize,
    /// 国の絞り込み文字列
    pub search: String,
    pub log: LogPane,
    /// 設定を閉じたときの戻り先
    pub settings_return: Screen,
    /// ログイン画面に表示するエラー
    pub error: Option<String>,
}

impl UiState {
    pub fn new(screen: Screen) -> Self {
        Self {
            screen,
            focus: FormField::Article,
            country_cursor: 0,
            slot_cursor: 0,
            preview_cursor: 0,
            search: String::new(),
            log: LogPane::default(),
            settings_return: screen,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_drops_oldest_beyond_capacity() {
        let mut log = LogPane::with_capacity(3);
        for i in 0..5 {
            log.push(Severity::Info, format!("m{i}"));
        }
        assert_eq!(log.newest(10).count(), 3);
        let newest: Vec<_> = log.newest(10).map(|e| e.message.as_str()).collect();
        assert_eq!(newest, ["m4", "m3", "m2"]);
        assert_eq!(log.latest().map(|e| e.message.as_str()), Some("m4"));
    }

    #[test]
    fn entries_carry_clock_time() {
        let mut log = LogPane::default();
        log.push(Severity::Success, "done");
        let e = log.latest().unwrap();
        assert_eq!(e.time.len(), 8);
        assert_eq!(e.time.matches(':').count(), 2);
        assert_eq!(e.severity, Severity::Success);
    }

    #[test]
    fn focus_cycles_per_mode() {
        assert_eq!(FormField::Countries.next(Mode::FolderBatch), FormField::Article);
        assert_eq!(FormField::Codes.next(Mode::DirectUpload), FormField::Countries);
        assert_eq!(FormField::Article.prev(Mode::DirectUpload), FormField::Slots);
        // 直接モードにFolder項目は無い。
        assert_eq!(FormField::Folder.next(Mode::DirectUpload), FormField::Article);
    }
}
