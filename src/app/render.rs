//! 各画面の描画。

use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap},
};

use crate::{
    events::{FormField, Screen, Severity},
    expand, input, layout, naming,
    selection::{self, Mode},
    shortcuts::Shortcuts,
};

use super::App;

fn highlight() -> Style {
    Style::default()
        .bg(Color::Rgb(255, 140, 0))
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

fn severity_color(s: Severity) -> Color {
    match s {
        Severity::Info => Color::White,
        Severity::Success => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let main_layout = layout::create_main_layout(f.area());

    match app.ui.screen {
        Screen::Login => draw_login(f, app, main_layout.body),
        Screen::Settings => draw_settings(f, app, main_layout.body),
        Screen::Form | Screen::Preview => {
            let body = layout::create_body_layout(main_layout.body);
            if app.ui.screen == Screen::Form {
                draw_form(f, app, body.main_panel);
            } else {
                draw_preview(f, app, body.main_panel);
            }
            draw_info(f, app, body.info_panel);
        }
    }

    let help = Paragraph::new(help_text(app.ui.screen, &app.shortcuts))
        .block(Block::default().borders(Borders::ALL).title("HELP"))
        .wrap(Wrap { trim: true });
    f.render_widget(help, main_layout.help_bar);
    f.render_widget(status_bar(app), main_layout.status_bar);

    if let Some(input_state) = &app.input_box {
        input::render_input_box(f, input_state);
    }
}

fn draw_login(f: &mut Frame, app: &App, area: Rect) {
    let popup = input::centered_popup(area, 60, 11);
    let mut lines = vec![
        Line::from(format!("Server:   {}", app.cfg.server.base_url)),
        Line::from(""),
        Line::from(format!("Username: {}", app.username)),
        Line::from(format!("Password: {}", "*".repeat(app.password.chars().count()))),
        Line::from(""),
    ];
    if app.logging_in {
        lines.push(Line::styled("Logging in...", Style::default().fg(Color::Cyan)));
    } else if let Some(err) = &app.ui.error {
        lines.push(Line::styled(err.clone(), Style::default().fg(Color::Red)));
    }

    let p = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("LOGIN"))
        .wrap(Wrap { trim: true });
    f.render_widget(p, popup);
}

fn draw_settings(f: &mut Frame, app: &App, area: Rect) {
    let d = &app.draft;
    let sc = &app.shortcuts.settings;
    let rows = [
        (&sc.base_url, "Server URL", d.server.base_url.clone()),
        (&sc.username, "Default username", d.session.username.clone()),
        (
            &sc.refresh_interval,
            "Token refresh (s)",
            d.session.refresh_interval_secs.to_string(),
        ),
        (&sc.default_mode, "Default mode", d.rename.default_mode.label().to_string()),
        (&sc.non_image_reason, "Non-image reason", d.rename.non_image_reason.clone()),
    ];
    let lines: Vec<Line> = rows
        .iter()
        .map(|(keys, name, value)| Line::from(format!("[{}] {:<18} {}", format_keys(keys), name, value)))
        .collect();

    let p = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("SETTINGS"))
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

fn field_line(app: &App, field: FormField, label: &str, value: String) -> Line<'static> {
    let text = format!("{label:<9} {value}");
    if app.ui.focus == field {
        Line::styled(text, highlight())
    } else {
        Line::from(text)
    }
}

fn draw_form(f: &mut Frame, app: &App, area: Rect) {
    let sel = app.workflow.selection();
    let mode = sel.mode();

    let codes = sel.codes();
    let bad = codes.iter().filter(|c| !naming::validate_code_length(c)).count();
    let codes_value = if bad > 0 {
        format!("{} ({bad} not {} chars)", sel.codes_input(), naming::CODE_LEN)
    } else {
        sel.codes_input().to_string()
    };

    let mut lines = vec![
        Line::from(format!("{:<9} {}", "Mode:", mode.label())),
        field_line(app, FormField::Article, "Article:", sel.article().to_string()),
        field_line(app, FormField::Codes, "Codes:", codes_value),
    ];
    match mode {
        Mode::FolderBatch => {
            let folder = sel
                .folder()
                .map(|fo| format!("{} ({} files)", fo.name, fo.files.len()))
                .unwrap_or_else(|| "-".into());
            lines.push(field_line(app, FormField::Folder, "Folder:", folder));
        }
        Mode::DirectUpload => {
            lines.push(field_line(app, FormField::Color, "Color:", sel.color().to_string()));
        }
    }
    lines.push(Line::from(format!(
        "{:<9} {}",
        "Sending:",
        expand::expand(sel).len()
    )));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(lines.len() as u16 + 2), Constraint::Min(3)])
        .split(area);

    let title = if app.workflow.is_busy() {
        format!("RENAME ({})", app.workflow.phase().label())
    } else {
        "RENAME".to_string()
    };
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title)),
        chunks[0],
    );

    match mode {
        Mode::FolderBatch => draw_countries(f, app, chunks[1]),
        Mode::DirectUpload => {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(chunks[1]);
            draw_countries(f, app, cols[0]);
            draw_slots(f, app, cols[1]);
        }
    }
}

fn draw_countries(f: &mut Frame, app: &App, area: Rect) {
    let sel = app.workflow.selection();
    let visible = selection::filter_countries(app.workflow.catalog(), &app.ui.search);
    let items: Vec<ListItem> = visible
        .iter()
        .map(|c| {
            let mark = if sel.is_country_selected(c) { "[x]" } else { "[ ]" };
            ListItem::new(format!("{mark} {c} {}", naming::suffix_for(c).trim()))
        })
        .collect();

    let selected = match sel.mode() {
        Mode::FolderBatch => sel.folder_countries().len().to_string(),
        Mode::DirectUpload => sel.direct_country().to_string(),
    };
    let mut title = format!("COUNTRIES ({selected})");
    if !app.ui.search.is_empty() {
        title.push_str(&format!(" filter: {}", app.ui.search));
    }

    let focused = app.ui.focus == FormField::Countries;
    let mut block = Block::default().borders(Borders::ALL).title(title);
    if focused {
        block = block.border_style(Style::default().fg(Color::Rgb(255, 140, 0)));
    }
    let list = List::new(items).block(block).highlight_style(highlight());

    let mut state = ListState::default();
    if focused && !visible.is_empty() {
        state.select(Some(app.ui.country_cursor.min(visible.len() - 1)));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_slots(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .workflow
        .selection()
        .slots()
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            let name = slot.as_ref().map_or("-", |s| s.name.as_str());
            ListItem::new(format!("{:<5} {name}", naming::slot_label(i)))
        })
        .collect();

    let focused = app.ui.focus == FormField::Slots;
    let mut block = Block::default().borders(Borders::ALL).title("PHOTOS");
    if focused {
        block = block.border_style(Style::default().fg(Color::Rgb(255, 140, 0)));
    }
    let mut state = ListState::default();
    if focused {
        state.select(Some(app.ui.slot_cursor));
    }
    f.render_stateful_widget(
        List::new(items).block(block).highlight_style(highlight()),
        area,
        &mut state,
    );
}

fn draw_preview(f: &mut Frame, app: &App, area: Rect) {
    let Some(p) = app.workflow.preview() else {
        f.render_widget(
            Paragraph::new("No preview").block(Block::default().borders(Borders::ALL)),
            area,
        );
        return;
    };
    let pl = layout::create_preview_layout(area);

    let s = &p.summary;
    let mut summary = vec![
        Line::from(format!(
            "Folders: {}  Files: {}  Valid: {}  Invalid: {}  PNG to convert: {}",
            s.total_folders, s.total_files, s.total_valid, s.total_invalid, s.total_pngs_to_convert
        )),
        Line::from(format!("Codes accepted: {}", p.codes_validation.valid.join(", "))),
    ];
    if p.has_invalid_codes() {
        summary.push(Line::styled(
            format!("Codes rejected: {}", p.codes_validation.invalid.join(", ")),
            Style::default().fg(Color::Red),
        ));
    }
    f.render_widget(
        Paragraph::new(summary)
            .block(Block::default().borders(Borders::ALL).title("SUMMARY"))
            .wrap(Wrap { trim: true }),
        pl.summary,
    );

    let rows = p.folders.iter().map(|fo| {
        Row::new(vec![
            fo.name.clone(),
            fo.detected_country.clone().unwrap_or_else(|| "-".into()),
            fo.detected_color.clone().unwrap_or_else(|| "-".into()),
            fo.stats.total.to_string(),
            fo.stats.valid.to_string(),
            fo.stats.invalid.to_string(),
            fo.stats.pngs_to_convert.to_string(),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(8),
            Constraint::Length(5),
        ],
    )
    .block(Block::default().borders(Borders::ALL).title("FOLDERS"))
    .header(Row::new(vec!["folder", "country", "color", "total", "valid", "invalid", "png"]).bold())
    .row_highlight_style(highlight());
    let mut table_state = TableState::default();
    if !p.folders.is_empty() {
        table_state.select(Some(app.ui.preview_cursor.min(p.folders.len() - 1)));
    }
    f.render_stateful_widget(table, pl.folders, &mut table_state);

    let mut files: Vec<Line> = Vec::new();
    if let Some(fo) = p.folders.get(app.ui.preview_cursor) {
        for name in &fo.files.valid {
            files.push(Line::styled(format!("ok  {name}"), Style::default().fg(Color::Green)));
        }
        for bad in &fo.files.invalid {
            files.push(Line::styled(
                format!("bad {}: {}", bad.name, bad.reason),
                Style::default().fg(Color::Red),
            ));
        }
    }
    f.render_widget(
        Paragraph::new(files).block(Block::default().borders(Borders::ALL).title("FILES")),
        pl.files,
    );

    f.render_widget(actions_line(app), pl.actions);
}

fn actions_line(app: &App) -> Paragraph<'static> {
    let sc = &app.shortcuts.preview;
    let enabled = Style::default().fg(Color::Green).add_modifier(Modifier::BOLD);
    let disabled = Style::default().fg(Color::DarkGray);

    let mut spans = Vec::new();
    if app.workflow.offers_commit() {
        spans.push(Span::styled(
            format!("[{}] Rename all", format_keys(&sc.commit)),
            if app.workflow.can_commit() { enabled } else { disabled },
        ));
        spans.push(Span::raw("   "));
    }
    if app.workflow.offers_commit_only_valid() {
        spans.push(Span::styled(
            format!("[{}] Rename only valid", format_keys(&sc.commit_only_valid)),
            if app.workflow.can_commit_only_valid() { enabled } else { disabled },
        ));
        spans.push(Span::raw("   "));
    }
    spans.push(Span::raw(format!("[{}] Back", format_keys(&sc.back))));
    if app.workflow.is_busy() {
        spans.push(Span::styled(
            format!("   {}...", app.workflow.phase().label()),
            Style::default().fg(Color::Cyan),
        ));
    }

    Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL).title("ACTIONS"))
}

/// 操作ログ（新しい順）
fn draw_info(f: &mut Frame, app: &App, area: Rect) {
    let rows = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = app
        .ui
        .log
        .newest(rows)
        .map(|e| {
            Line::styled(
                format!("{} {}", e.time, e.message),
                Style::default().fg(severity_color(e.severity)),
            )
        })
        .collect();

    let p = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("INFO"))
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

/// 画面・モード・処理状態と最新ログ
fn status_bar(app: &App) -> Paragraph<'static> {
    let mut text = format!(
        "[{}] {}",
        app.ui.screen.label(),
        app.workflow.selection().mode().label()
    );
    if app.workflow.is_busy() {
        text.push_str(&format!(" | {}...", app.workflow.phase().label()));
    }
    let mut style = Style::default();
    if let Some(last) = app.ui.log.latest() {
        text.push_str(&format!(" | {}", last.message));
        style = style.fg(severity_color(last.severity));
    }

    Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("STATUS"))
        .style(style)
        .wrap(Wrap { trim: true })
}

fn help_text(screen: Screen, sc: &Shortcuts) -> String {
    match screen {
        Screen::Login => format!(
            "{}: username | {}: password | {}: log in | {}: settings | {}: quit",
            format_keys(&sc.login.username),
            format_keys(&sc.login.password),
            format_keys(&sc.login.submit),
            format_keys(&sc.login.settings),
            format_keys(&sc.login.quit),
        ),
        Screen::Form => format!(
            "{}/{}: field | {}: edit | {}: toggle | {}: all | {}: filter | {}: reload countries | {}: remove | {}: mode | {}: run | {}: settings | {}: logout | {}: quit",
            format_keys(&sc.form.next_field),
            format_keys(&sc.form.prev_field),
            format_keys(&sc.form.edit),
            format_keys(&sc.form.toggle),
            format_keys(&sc.form.toggle_all),
            format_keys(&sc.form.search),
            format_keys(&sc.form.reload_countries),
            format_keys(&sc.form.remove),
            format_keys(&sc.form.toggle_mode),
            format_keys(&sc.form.run),
            format_keys(&sc.form.settings),
            format_keys(&sc.form.logout),
            format_keys(&sc.form.quit),
        ),
        Screen::Preview => format!(
            "{}: rename all | {}: rename only valid | {}/{}: folders | {}: back | {}: quit",
            format_keys(&sc.preview.commit),
            format_keys(&sc.preview.commit_only_valid),
            format_keys(&sc.preview.up),
            format_keys(&sc.preview.down),
            format_keys(&sc.preview.back),
            format_keys(&sc.preview.quit),
        ),
        Screen::Settings => format!(
            "{}: save | {}: cancel",
            format_keys(&sc.settings.save),
            format_keys(&sc.settings.cancel),
        ),
    }
}

fn format_keys(keys: &[String]) -> String {
    keys.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use ratatui::{Terminal, backend::TestBackend};

    fn screen_text(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buf = terminal.backend().buffer();
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn status_bar_shows_latest_log_entry() {
        let (mut app, _rx, _tx) = test_app();
        app.ui.screen = Screen::Form;
        app.note(Severity::Info, "first");
        app.note(Severity::Warning, "Enter the color");
        let text = screen_text(&app);
        assert!(text.contains("[Form] folder-batch | Enter the color"));
    }

    fn preview_app(invalid: &[(&str, &str)]) -> App {
        let (mut app, _rx, _tx) = test_app();
        *app.workflow.selection_mut().unwrap() = crate::selection::tests::ready_folder_selection();
        app.workflow.start(crate::workflow::Intent::Analyze).unwrap();
        app.workflow
            .settle_preview(Ok(crate::preview::tests::result(2, invalid, &[])))
            .unwrap();
        app.ui.screen = Screen::Preview;
        app
    }

    #[test]
    fn rename_all_is_shown_only_without_invalid_files() {
        let text = screen_text(&preview_app(&[]));
        assert!(text.contains("[c] Rename all"));
        assert!(!text.contains("Rename only valid"));

        let non_image = crate::preview::tests::NON_IMAGE;
        let text = screen_text(&preview_app(&[("notes.txt", non_image)]));
        assert!(!text.contains("Rename all"));
        assert!(text.contains("[v] Rename only valid"));
    }

    #[test]
    fn login_masks_the_password() {
        let (mut app, _rx, _tx) = test_app();
        app.username = "ana".into();
        app.password = "secret".into();
        let text = screen_text(&app);
        assert!(text.contains("Username: ana"));
        assert!(text.contains("Password: ******"));
        assert!(!text.contains("secret"));
    }
}
