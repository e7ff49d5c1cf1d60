//! エントリポイントとランタイムの初期化。

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;

mod api;
mod app;
mod config;
mod error;
mod events;
mod expand;
mod input;
mod layout;
mod naming;
mod preview;
mod selection;
mod shortcuts;
mod ui;
mod worker;
mod workflow;

/// ログはファイルへ出力する（stdoutはTUIが使う）。guardは保持しておくこと。
fn init_logging() -> Result<WorkerGuard> {
    let log_file = "photo_rename_tui.log";
    let file_appender = tracing_appender::rolling::never(".", log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
    tracing::info!("logging to {}", log_file);
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = init_logging()?;
    tracing::info!("app starting");

    let mut terminal = ui::init_terminal()?;
    let res = app::run_app(&mut terminal).await;
    // エラー時も必ずターミナルを復元する。
    ui::restore_terminal()?;

    if let Err(ref e) = res {
        tracing::error!("app error: {e}");
    }
    tracing::info!("app exiting");
    res
}
