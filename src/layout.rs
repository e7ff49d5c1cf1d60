//! レイアウト補助関数。

use ratatui::prelude::*;

/// 本体と下部の2本のバー
pub struct MainLayout {
    pub body: Rect,
    pub help_bar: Rect,
    pub status_bar: Rect,
}

/// 左に画面本体、右にINFOパネル
pub struct BodyLayout {
    pub main_panel: Rect,
    pub info_panel: Rect,
}

/// プレビュー画面の区画
pub struct PreviewLayout {
    pub summary: Rect,
    pub folders: Rect,
    pub files: Rect,
    pub actions: Rect,
}

pub fn create_main_layout(area: Rect) -> MainLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(3), // HELP
            Constraint::Length(3), // STATUS
        ])
        .split(area);

    MainLayout {
        body: chunks[0],
        help_bar: chunks[1],
        status_bar: chunks[2],
    }
}

/// 本体65%、INFO35%
pub fn create_body_layout(area: Rect) -> BodyLayout {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    BodyLayout {
        main_panel: chunks[0],
        info_panel: chunks[1],
    }
}

pub fn create_preview_layout(area: Rect) -> PreviewLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Percentage(45),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(area);

    PreviewLayout {
        summary: chunks[0],
        folders: chunks[1],
        files: chunks[2],
        actions: chunks[3],
    }
}
