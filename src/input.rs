//! TUI内での一行テキスト入力ポップアップ（InputBox）。

use ratatui::{
    layout::Alignment,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

/// InputBox入力状態
#[derive(Clone, Debug)]
pub struct InputBoxState {
    pub prompt: String,
    pub value: String,
    /// カーソル位置（文字単位）
    pub cursor: usize,
    /// 入力完了時のコールバック識別子
    pub callback_id: InputCallbackId,
    /// 値を `*` で伏せて表示する
    pub masked: bool,
}

/// 入力完了時のコールバック識別子
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputCallbackId {
    // Login画面用
    LoginUsername,
    LoginPassword,

    // Form画面用
    Article,
    Codes,
    FolderPath,
    CountrySearch,
    Color,
    SlotPath(usize), // 0..10 の範囲

    // Settings画面用
    SettingsBaseUrl,
    SettingsUsername,
    SettingsRefreshInterval,
    SettingsNonImageReason,
}

impl InputBoxState {
    /// カーソルを `value` の末尾に置いて開く
    pub fn new(prompt: impl Into<String>, value: impl Into<String>, callback_id: InputCallbackId) -> Self {
        let value = value.into();
        Self {
            prompt: prompt.into(),
            cursor: value.chars().count(),
            value,
            callback_id,
            masked: false,
        }
    }

    pub fn masked(mut self) -> Self {
        self.masked = true;
        self
    }

    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_at(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Backspace（カーソル前の文字を削除）
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_at(self.cursor);
            self.value.remove(at);
        }
    }

    /// Delete（カーソル位置の文字を削除）
    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_at(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.value.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    pub fn clear_line(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// `idx` 文字目のバイト位置（範囲外なら末尾）
    fn byte_at(&self, idx: usize) -> usize {
        self.value
            .char_indices()
            .nth(idx)
            .map(|(b, _)| b)
            .unwrap_or(self.value.len())
    }

    /// 描画用の文字列。必要なら伏せ字にし、カーソル位置に `|` を入れる。
    fn display(&self, width: usize) -> String {
        let chars: Vec<char> = if self.masked {
            self.value.chars().map(|_| '*').collect()
        } else {
            self.value.chars().collect()
        };
        // カーソルが見える位置までスクロールする。
        let offset = self.cursor.saturating_sub(width.saturating_sub(2));
        let visible: Vec<char> = chars.iter().skip(offset).take(width).copied().collect();
        let at = (self.cursor - offset).min(visible.len());
        let before: String = visible[..at].iter().collect();
        let after: String = visible[at..].iter().collect();
        format!("{before}|{after}")
    }
}

/// InputBoxをポップアップとして描画
pub fn render_input_box(f: &mut Frame, state: &InputBoxState) {
    let popup_area = centered_popup(f.area(), 70, 7);
    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Input")
        .style(Style::default().bg(Color::DarkGray));
    f.render_widget(block, popup_area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // プロンプト
            Constraint::Length(1), // 入力値
            Constraint::Length(1),
            Constraint::Length(1), // ヘルプ
        ])
        .split(popup_area);

    let prompt = Paragraph::new(state.prompt.clone()).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(prompt, rows[0]);

    let value = Paragraph::new(state.display(rows[1].width as usize))
        .style(Style::default().fg(Color::Green));
    f.render_widget(value, rows[1]);

    let help = Paragraph::new("Enter=confirm | Esc=cancel | Ctrl+U=clear")
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(help, rows[3]);
}

/// 幅 `width_percent`%、高さ `height` 行の中央寄せ領域
pub fn centered_popup(area: Rect, width_percent: u16, height: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(value: &str) -> InputBoxState {
        InputBoxState::new("p", value, InputCallbackId::Article)
    }

    #[test]
    fn editing_handles_multibyte_chars() {
        let mut b = boxed("ESPAÑA");
        b.move_left();
        b.backspace();
        assert_eq!(b.value, "ESPAA");
        b.insert_char('Ñ');
        assert_eq!(b.value, "ESPAÑA");
        b.move_home();
        b.delete();
        assert_eq!(b.value, "SPAÑA");
        assert_eq!(b.cursor, 0);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut b = boxed("ab");
        b.move_right();
        assert_eq!(b.cursor, 2);
        b.clear_line();
        b.move_left();
        b.backspace();
        assert_eq!((b.value.as_str(), b.cursor), ("", 0));
    }

    #[test]
    fn masked_value_is_hidden() {
        let b = InputBoxState::new("Password:", "secret", InputCallbackId::LoginPassword).masked();
        assert_eq!(b.display(40), "******|");
        assert_eq!(boxed("abc").display(40), "abc|");
    }
}
