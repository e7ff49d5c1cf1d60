//! リネーム処理の「プレビュー→実行」状態機械。
//!
//! 遷移は [`Workflow::start`] で開始する。ローカル検証を行い、
//! 必要な通信を返す。通信が終わったら `settle_*` のいずれかで
//! 完了させる。通信中は他の操作をすべて拒否するため、
//! 1つのワークフローで同時に出るリクエストは
//! 最大1件となる。

use crate::{
    api::{ProcessOutcome, RenameRequest},
    error::WorkflowError,
    expand,
    preview::PreviewResult,
    selection::{Mode, Selection},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// フォーム編集中
    Idle,
    /// `/rename/preview` の応答待ち
    Analyzing,
    /// プレビュー表示中
    PreviewReady,
    /// `/rename/process` の応答待ち
    Committing,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Analyzing => "analyzing",
            Phase::PreviewReady => "preview",
            Phase::Committing => "committing",
        }
    }
}

/// ワークフローを進める操作
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    /// フォルダモード：事前解析を依頼
    Analyze,
    /// 直接モード：プレビュー無しでスロットを処理
    ProcessDirect,
    /// 選択内容を保ったままプレビューを閉じる
    Cancel,
    /// すべて実行（不正ファイルが無い場合のみ）
    Commit,
    /// 画像以外を除外して実行
    CommitOnlyValid,
}

/// 遷移に必要な通信
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Preview(RenameRequest),
    Process(RenameRequest),
}

pub struct Workflow {
    selection: Selection,
    phase: Phase,
    preview: Option<PreviewResult>,
    catalog: Vec<String>,
    non_image_reason: String,
}

impl Workflow {
    pub fn new(mode: Mode, non_image_reason: impl Into<String>) -> Self {
        Self {
            selection: Selection::new(mode),
            phase: Phase::Idle,
            preview: None,
            catalog: Vec::new(),
            non_image_reason: non_image_reason.into(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Analyzing | Phase::Committing)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// 選択内容はフォーム上でのみ編集できる
    pub fn selection_mut(&mut self) -> Result<&mut Selection, WorkflowError> {
        match self.phase {
            Phase::Idle => Ok(&mut self.selection),
            Phase::PreviewReady => Err(WorkflowError::NotAvailable(
                "go back to the form to edit the selection",
            )),
            p => Err(WorkflowError::Busy { phase: p.label() }),
        }
    }

    pub fn preview(&self) -> Option<&PreviewResult> {
        self.preview.as_ref()
    }

    pub fn catalog(&self) -> &[String] {
        &self.catalog
    }

    /// 国一覧を差し替える。フォルダモードの選択が空なら全選択にする。
    pub fn set_catalog(&mut self, countries: Vec<String>) {
        self.catalog = countries;
        if self.phase == Phase::Idle {
            self.selection.seed_countries(&self.catalog);
        }
    }

    pub fn set_non_image_reason(&mut self, reason: impl Into<String>) {
        self.non_image_reason = reason.into();
    }

    pub fn offers_commit(&self) -> bool {
        self.phase == Phase::PreviewReady && self.preview.as_ref().is_some_and(|p| p.offers_commit())
    }

    pub fn can_commit(&self) -> bool {
        self.phase == Phase::PreviewReady && self.preview.as_ref().is_some_and(|p| p.can_commit())
    }

    pub fn offers_commit_only_valid(&self) -> bool {
        self.phase == Phase::PreviewReady
            && self
                .preview
                .as_ref()
                .is_some_and(|p| p.offers_commit_only_valid(&self.non_image_reason))
    }

    pub fn can_commit_only_valid(&self) -> bool {
        self.phase == Phase::PreviewReady
            && self
                .preview
                .as_ref()
                .is_some_and(|p| p.can_commit_only_valid(&self.non_image_reason))
    }

    /// 遷移を開始する。`Ok(None)` はローカルで完了したことを表す。
    pub fn start(&mut self, intent: Intent) -> Result<Option<Call>, WorkflowError> {
        if self.is_busy() {
            tracing::warn!("{intent:?} ignored while {}", self.phase.label());
            return Err(WorkflowError::Busy {
                phase: self.phase.label(),
            });
        }

        match intent {
            Intent::Analyze => {
                self.require_form(Mode::FolderBatch, "analysis is only used in folder-batch mode")?;
                self.selection.validate()?;
                let req = self.build_request(false);
                tracing::info!("analyze: {} entries", req.entries.len());
                self.phase = Phase::Analyzing;
                Ok(Some(Call::Preview(req)))
            }
            Intent::ProcessDirect => {
                self.require_form(Mode::DirectUpload, "direct processing needs direct-upload mode")?;
                self.selection.validate()?;
                let req = self.build_request(false);
                tracing::info!("process direct: {} entries", req.entries.len());
                self.phase = Phase::Committing;
                Ok(Some(Call::Process(req)))
            }
            Intent::Cancel => {
                if self.phase == Phase::PreviewReady {
                    tracing::info!("preview dismissed");
                    self.preview = None;
                    self.phase = Phase::Idle;
                }
                Ok(None)
            }
            Intent::Commit => {
                if !self.can_commit() {
                    return Err(WorkflowError::NotAvailable(
                        "commit is blocked by invalid files or codes",
                    ));
                }
                let req = self.build_request(false);
                tracing::info!("commit: {} entries", req.entries.len());
                self.phase = Phase::Committing;
                Ok(Some(Call::Process(req)))
            }
            Intent::CommitOnlyValid => {
                if !self.can_commit_only_valid() {
                    return Err(WorkflowError::NotAvailable(
                        "processing only valid files is not possible for this preview",
                    ));
                }
                let req = self.build_request(true);
                tracing::info!("commit only valid: {} entries", req.entries.len());
                self.phase = Phase::Committing;
                Ok(Some(Call::Process(req)))
            }
        }
    }

    /// 解析の通信を完了させる
    pub fn settle_preview(
        &mut self,
        outcome: Result<PreviewResult, WorkflowError>,
    ) -> Result<(), WorkflowError> {
        if self.phase != Phase::Analyzing {
            return Err(WorkflowError::NotAvailable("no analysis in progress"));
        }
        match outcome {
            Ok(result) => {
                tracing::info!(
                    "preview ready: {} valid, {} invalid",
                    result.summary.total_valid,
                    result.summary.total_invalid
                );
                self.preview = Some(result);
                self.phase = Phase::PreviewReady;
                Ok(())
            }
            Err(e) => {
                tracing::error!("analysis failed: {e}");
                self.phase = Phase::Idle;
                Err(e)
            }
        }
    }

    /// 実行の通信を完了させる
    pub fn settle_commit(
        &mut self,
        outcome: Result<ProcessOutcome, WorkflowError>,
    ) -> Result<ProcessOutcome, WorkflowError> {
        if self.phase != Phase::Committing {
            return Err(WorkflowError::NotAvailable("no commit in progress"));
        }
        let mode = self.selection.mode();
        match outcome {
            Ok(done) => {
                tracing::info!("commit succeeded ({})", mode.label());
                match mode {
                    Mode::FolderBatch => {
                        let mut fresh = Selection::new(Mode::FolderBatch);
                        fresh.seed_countries(&self.catalog);
                        self.selection = fresh;
                    }
                    Mode::DirectUpload => self.selection.clear_direct_slots(),
                }
                self.preview = None;
                self.phase = Phase::Idle;
                Ok(done)
            }
            Err(e) => {
                tracing::error!("commit failed: {e}");
                self.phase = match mode {
                    Mode::FolderBatch if self.preview.is_some() => Phase::PreviewReady,
                    _ => Phase::Idle,
                };
                Err(e)
            }
        }
    }

    fn require_form(&self, mode: Mode, msg: &'static str) -> Result<(), WorkflowError> {
        if self.phase != Phase::Idle {
            return Err(WorkflowError::NotAvailable("go back to the form first"));
        }
        if self.selection.mode() != mode {
            return Err(WorkflowError::NotAvailable(msg));
        }
        Ok(())
    }

    /// 毎回選択内容から組み立てる（キャッシュしない）
    fn build_request(&self, only_images: bool) -> RenameRequest {
        RenameRequest {
            article: self.selection.article_normalized(),
            codes: self.selection.codes(),
            entries: expand::expand(&self.selection),
            only_images,
        }
    }
}
