//! 画面ごとのキー入力処理。

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::Path;

use crate::{
    error::WorkflowError,
    events::{FormField, Screen, Severity},
    input::{InputBoxState, InputCallbackId},
    naming,
    selection::{self, MAX_FOLDERS, Mode, Selection, SourceFile, SourceFolder},
    shortcuts,
    workflow::{Call, Intent},
    worker::WorkerCmd,
};

use super::App;

/// キー入力を1つ処理する。終了すべきときはtrueを返す。
pub async fn handle_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    if app.input_box.is_some() {
        return handle_input_box_key(app, k).await;
    }

    match app.ui.screen {
        Screen::Login => handle_login_key(app, k).await,
        Screen::Form => handle_form_key(app, k).await,
        Screen::Preview => handle_preview_key(app, k).await,
        Screen::Settings => handle_settings_key(app, k).await,
    }
}

pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

async fn handle_login_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.login;

    if shortcuts::matches_shortcut(&k, &sc.quit) {
        return Ok(true);
    } else if shortcuts::matches_shortcut(&k, &sc.settings) {
        open_settings(app);
    } else if shortcuts::matches_shortcut(&k, &sc.username) {
        app.input_box = Some(InputBoxState::new(
            "Username:",
            app.username.clone(),
            InputCallbackId::LoginUsername,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.password) {
        app.input_box = Some(
            InputBoxState::new("Password:", app.password.clone(), InputCallbackId::LoginPassword)
                .masked(),
        );
    } else if shortcuts::matches_shortcut(&k, &sc.submit) {
        submit_login(app).await?;
    }
    Ok(false)
}

async fn submit_login(app: &mut App) -> Result<()> {
    if app.logging_in {
        return Ok(());
    }
    if app.username.trim().is_empty() || app.password.is_empty() {
        app.ui.error = Some("Enter username and password".into());
        return Ok(());
    }

    // 次回起動用にユーザー名を保存する。
    if app.cfg.session.username != app.username {
        app.cfg.session.username = app.username.clone();
        if let Err(e) = app.cfg.save(&app.cfg_path) {
            tracing::warn!("config not saved: {e}");
        }
    }

    app.ui.error = None;
    app.logging_in = true;
    app.note(Severity::Info, format!("logging in as {}", app.username.trim()));
    app.worker_tx
        .send(WorkerCmd::Login {
            username: app.username.trim().to_string(),
            password: app.password.clone(),
        })
        .await?;
    Ok(())
}

async fn handle_form_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = app.shortcuts.form.clone();

    if shortcuts::matches_shortcut(&k, &sc.quit) {
        return Ok(true);
    }
    // リクエスト中は終了以外を受け付けない。
    if app.workflow.is_busy() {
        return Ok(false);
    }

    let mode = app.workflow.selection().mode();
    let focus = app.ui.focus;

    if shortcuts::matches_shortcut(&k, &sc.settings) {
        open_settings(app);
    } else if shortcuts::matches_shortcut(&k, &sc.logout) {
        app.worker_tx.send(WorkerCmd::Logout).await?;
        app.ui.screen = Screen::Login;
    } else if shortcuts::matches_shortcut(&k, &sc.toggle_mode) {
        if with_selection(app, |sel| sel.set_mode(mode.toggled())).is_some() {
            app.ui.focus = FormField::Article;
            app.ui.country_cursor = 0;
            app.note(Severity::Info, format!("mode: {}", mode.toggled().label()));
        }
    } else if shortcuts::matches_shortcut(&k, &sc.next_field) {
        app.ui.focus = focus.next(mode);
    } else if shortcuts::matches_shortcut(&k, &sc.prev_field) {
        app.ui.focus = focus.prev(mode);
    } else if shortcuts::matches_shortcut(&k, &sc.down) {
        move_cursor(app, 1);
    } else if shortcuts::matches_shortcut(&k, &sc.up) {
        move_cursor(app, -1);
    } else if shortcuts::matches_shortcut(&k, &sc.toggle) {
        if focus == FormField::Countries {
            toggle_country_under_cursor(app);
        }
    } else if shortcuts::matches_shortcut(&k, &sc.toggle_all) {
        if focus == FormField::Countries && mode == Mode::FolderBatch {
            let visible = visible_countries(app);
            with_selection(app, |sel| sel.toggle_all_visible(&visible));
        }
    } else if shortcuts::matches_shortcut(&k, &sc.search) {
        app.input_box = Some(InputBoxState::new(
            "Filter countries:",
            app.ui.search.clone(),
            InputCallbackId::CountrySearch,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.remove) {
        match focus {
            FormField::Folder => {
                with_selection(app, |sel| sel.remove_folder(0));
            }
            FormField::Slots => {
                let slot = app.ui.slot_cursor;
                with_selection(app, |sel| sel.clear_direct_slot(slot));
            }
            _ => {}
        }
    } else if shortcuts::matches_shortcut(&k, &sc.reload_countries) {
        app.worker_tx.send(WorkerCmd::LoadCountries).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.run) {
        let intent = match mode {
            Mode::FolderBatch => Intent::Analyze,
            Mode::DirectUpload => Intent::ProcessDirect,
        };
        dispatch(app, intent).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.edit) {
        edit_focused(app);
    }
    Ok(false)
}

/// フォーム項目でEnter：入力欄を開くか国を切り替える
fn edit_focused(app: &mut App) {
    let sel = app.workflow.selection();
    let input = match app.ui.focus {
        FormField::Article => InputBoxState::new("Article:", sel.article(), InputCallbackId::Article),
        FormField::Codes => InputBoxState::new(
            "Codes (comma separated, 10 chars each):",
            sel.codes_input(),
            InputCallbackId::Codes,
        ),
        FormField::Color => InputBoxState::new("Color:", sel.color(), InputCallbackId::Color),
        FormField::Folder => InputBoxState::new("Folder path:", "", InputCallbackId::FolderPath),
        FormField::Slots => {
            let slot = app.ui.slot_cursor;
            let current = sel.slots()[slot]
                .as_ref()
                .map(|f| f.path.display().to_string())
                .unwrap_or_default();
            InputBoxState::new(
                format!("Photo for slot {}:", naming::slot_label(slot)),
                current,
                InputCallbackId::SlotPath(slot),
            )
        }
        FormField::Countries => {
            toggle_country_under_cursor(app);
            return;
        }
    };
    app.input_box = Some(input);
}

fn move_cursor(app: &mut App, delta: isize) {
    let len = match app.ui.focus {
        FormField::Countries => visible_countries(app).len(),
        FormField::Slots => naming::SLOT_COUNT,
        _ => return,
    };
    let cursor = if app.ui.focus == FormField::Countries {
        &mut app.ui.country_cursor
    } else {
        &mut app.ui.slot_cursor
    };
    *cursor = cursor.saturating_add_signed(delta).min(len.saturating_sub(1));
}

fn visible_countries(app: &App) -> Vec<String> {
    selection::filter_countries(app.workflow.catalog(), &app.ui.search)
}

fn toggle_country_under_cursor(app: &mut App) {
    let visible = visible_countries(app);
    if let Some(country) = visible.get(app.ui.country_cursor).cloned() {
        with_selection(app, |sel| sel.toggle_country(&country));
    }
}

/// 編集可能な選択内容に `f` を適用する。拒否された場合はログへ。
fn with_selection<R>(app: &mut App, f: impl FnOnce(&mut Selection) -> R) -> Option<R> {
    let r = app.workflow.selection_mut().map(f);
    match r {
        Ok(v) => Some(v),
        Err(e) => {
            app.note(Severity::Warning, e.to_string());
            None
        }
    }
}

/// ワークフローの遷移を開始し、通信をワーカーへ渡す
async fn dispatch(app: &mut App, intent: Intent) -> Result<()> {
    match app.workflow.start(intent) {
        Ok(Some(Call::Preview(req))) => {
            app.note(Severity::Info, format!("analyzing {} files...", req.entries.len()));
            app.worker_tx.send(WorkerCmd::Preview(req)).await?;
        }
        Ok(Some(Call::Process(req))) => {
            app.note(Severity::Info, format!("renaming {} files...", req.entries.len()));
            app.worker_tx.send(WorkerCmd::Process(req)).await?;
        }
        Ok(None) => app.ui.screen = Screen::Form,
        Err(WorkflowError::Busy { .. }) => {}
        Err(e) => app.note(Severity::Warning, e.to_string()),
    }
    Ok(())
}

async fn handle_preview_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = app.shortcuts.preview.clone();

    if shortcuts::matches_shortcut(&k, &sc.quit) {
        return Ok(true);
    }
    if app.workflow.is_busy() {
        return Ok(false);
    }

    if shortcuts::matches_shortcut(&k, &sc.back) {
        dispatch(app, Intent::Cancel).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.commit) {
        dispatch(app, Intent::Commit).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.commit_only_valid) {
        if app.workflow.offers_commit_only_valid() {
            dispatch(app, Intent::CommitOnlyValid).await?;
        }
    } else if shortcuts::matches_shortcut(&k, &sc.down) {
        let n = app.workflow.preview().map_or(0, |p| p.folders.len());
        if app.ui.preview_cursor + 1 < n {
            app.ui.preview_cursor += 1;
        }
    } else if shortcuts::matches_shortcut(&k, &sc.up) {
        app.ui.preview_cursor = app.ui.preview_cursor.saturating_sub(1);
    }
    Ok(false)
}

fn open_settings(app: &mut App) {
    app.draft = app.cfg.clone();
    app.ui.settings_return = app.ui.screen;
    app.ui.screen = Screen::Settings;
}

async fn handle_settings_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.settings;

    if shortcuts::matches_shortcut(&k, &sc.cancel) {
        app.draft = app.cfg.clone();
        app.ui.screen = app.ui.settings_return;
    } else if shortcuts::matches_shortcut(&k, &sc.save) {
        app.cfg = app.draft.clone();
        app.cfg.save(&app.cfg_path)?;
        app.workflow
            .set_non_image_reason(app.cfg.rename.non_image_reason.clone());
        app.worker_tx
            .send(WorkerCmd::SaveSettings(app.cfg.clone()))
            .await?;
        app.ui.screen = app.ui.settings_return;
        app.note(Severity::Success, "settings saved");
    } else if shortcuts::matches_shortcut(&k, &sc.base_url) {
        app.input_box = Some(InputBoxState::new(
            "Server URL:",
            app.draft.server.base_url.clone(),
            InputCallbackId::SettingsBaseUrl,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.username) {
        app.input_box = Some(InputBoxState::new(
            "Default username:",
            app.draft.session.username.clone(),
            InputCallbackId::SettingsUsername,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.refresh_interval) {
        app.input_box = Some(InputBoxState::new(
            "Token refresh interval (seconds):",
            app.draft.session.refresh_interval_secs.to_string(),
            InputCallbackId::SettingsRefreshInterval,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.non_image_reason) {
        app.input_box = Some(InputBoxState::new(
            "Reason the server gives for non-image files:",
            app.draft.rename.non_image_reason.clone(),
            InputCallbackId::SettingsNonImageReason,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.default_mode) {
        app.draft.rename.default_mode = app.draft.rename.default_mode.toggled();
    }
    Ok(false)
}

async fn handle_input_box_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let Some(input_state) = &mut app.input_box else {
        return Ok(false);
    };
    let sc = &app.shortcuts.input_box;

    if is_ctrl_c(&k) {
        return Ok(true);
    }

    if shortcuts::matches_shortcut(&k, &sc.confirm) {
        let value = input_state.value.clone();
        let callback_id = input_state.callback_id.clone();
        app.input_box = None;
        apply_input_callback(app, callback_id, value).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.cancel) {
        app.input_box = None;
    } else if shortcuts::matches_shortcut(&k, &sc.backspace) {
        input_state.backspace();
    } else if shortcuts::matches_shortcut(&k, &sc.delete) {
        input_state.delete();
    } else if shortcuts::matches_shortcut(&k, &sc.left) {
        input_state.move_left();
    } else if shortcuts::matches_shortcut(&k, &sc.right) {
        input_state.move_right();
    } else if shortcuts::matches_shortcut(&k, &sc.home) {
        input_state.move_home();
    } else if shortcuts::matches_shortcut(&k, &sc.end) {
        input_state.move_end();
    } else if shortcuts::matches_shortcut(&k, &sc.clear_line) {
        input_state.clear_line();
    } else if let KeyCode::Char(c) = k.code
        && !k.modifiers.contains(KeyModifiers::CONTROL)
    {
        input_state.insert_char(c);
    }
    Ok(false)
}

async fn apply_input_callback(
    app: &mut App,
    callback_id: InputCallbackId,
    value: String,
) -> Result<()> {
    match callback_id {
        InputCallbackId::LoginUsername => app.username = value,
        InputCallbackId::LoginPassword => {
            app.password = value;
            submit_login(app).await?;
        }
        InputCallbackId::Article => {
            with_selection(app, |sel| sel.set_article(value));
        }
        InputCallbackId::Codes => {
            let bad = with_selection(app, |sel| {
                sel.set_codes(value);
                sel.codes()
                    .into_iter()
                    .filter(|c| !naming::validate_code_length(c))
                    .collect::<Vec<_>>()
            });
            if let Some(bad) = bad
                && !bad.is_empty()
            {
                app.note(
                    Severity::Warning,
                    format!("codes must be exactly {} characters: {}", naming::CODE_LEN, bad.join(", ")),
                );
            }
        }
        InputCallbackId::Color => {
            with_selection(app, |sel| sel.set_color(value));
        }
        InputCallbackId::FolderPath => pick_folder(app, Path::new(value.trim())),
        InputCallbackId::SlotPath(slot) => pick_slot(app, slot, Path::new(value.trim())),
        InputCallbackId::CountrySearch => {
            app.ui.search = value;
            app.ui.country_cursor = 0;
        }
        InputCallbackId::SettingsBaseUrl => app.draft.server.base_url = value.trim().to_string(),
        InputCallbackId::SettingsUsername => app.draft.session.username = value.trim().to_string(),
        InputCallbackId::SettingsRefreshInterval => match value.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => app.draft.session.refresh_interval_secs = secs,
            _ => app.note(Severity::Warning, format!("not a number of seconds: {value}")),
        },
        InputCallbackId::SettingsNonImageReason => app.draft.rename.non_image_reason = value,
    }
    Ok(())
}

/// 選択中のフォルダを `dir` に差し替える
fn pick_folder(app: &mut App, dir: &Path) {
    if !dir.is_dir() {
        app.note(Severity::Warning, format!("not a folder: {}", dir.display()));
        return;
    }
    let folder = match SourceFolder::from_dir(dir) {
        Ok(f) => f,
        Err(e) => {
            app.note(Severity::Error, format!("cannot read {}: {e}", dir.display()));
            return;
        }
    };
    if folder.files.is_empty() {
        app.note(Severity::Warning, format!("{} has no files", folder.name));
        return;
    }

    let summary = format!("folder {}: {} files", folder.name, folder.files.len());
    let added = with_selection(app, |sel| {
        if sel.folders().len() >= MAX_FOLDERS {
            sel.remove_folder(0);
        }
        sel.add_folder(folder)
    });
    if added == Some(true) {
        app.note(Severity::Success, summary);
    }
}

fn pick_slot(app: &mut App, slot: usize, path: &Path) {
    if !path.is_file() {
        app.note(Severity::Warning, format!("not a file: {}", path.display()));
        return;
    }
    let file = SourceFile::from_path(path);
    let name = file.name.clone();
    match with_selection(app, |sel| sel.set_direct_slot(slot, file)) {
        Some(Ok(())) => app.note(
            Severity::Success,
            format!("slot {}: {name}", naming::slot_label(slot)),
        ),
        Some(Err(e)) => app.note(Severity::Warning, e.to_string()),
        None => {}
    }
}
