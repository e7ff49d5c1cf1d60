//! リネーム処理の入力内容。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::{
    error::ValidationError,
    naming::{self, SLOT_COUNT},
};

/// 同時に選択できるフォルダは1つ
pub const MAX_FOLDERS: usize = 1;

/// フォームの入力モード
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// 1フォルダ分のファイルを選択国ごとに送る
    FolderBatch,
    /// 1つの国と色に対して最大10枚の画像
    DirectUpload,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::FolderBatch => "folder-batch",
            Mode::DirectUpload => "direct-upload",
        }
    }

    pub fn toggled(&self) -> Mode {
        match self {
            Mode::FolderBatch => Mode::DirectUpload,
            Mode::DirectUpload => Mode::FolderBatch,
        }
    }
}

/// 選択されたファイルと推定Content-Type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub content_type: String,
    pub path: PathBuf,
}

impl SourceFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = naming::content_type_for(&name).to_string();
        Self {
            name,
            content_type,
            path,
        }
    }
}

/// 選択されたディレクトリ（名前と配下の全ファイル）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFolder {
    pub name: String,
    pub files: Vec<SourceFile>,
}

impl SourceFolder {
    /// `dir` を再帰的に走査する。ドットファイルと
    /// `Thumbs.db` は除外する。
    pub fn from_dir(dir: &Path) -> std::io::Result<Self> {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());

        let mut files = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file = SourceFile::from_path(entry.path());
            if is_excluded(&file.name) {
                continue;
            }
            files.push(file);
        }
        Ok(Self { name, files })
    }
}

/// 隠しファイルやOSの生成物は含めない
pub fn is_excluded(filename: &str) -> bool {
    filename.starts_with('.') || filename == "Thumbs.db"
}

/// `term` を含む国（大文字小文字を区別しない）
pub fn filter_countries(catalog: &[String], term: &str) -> Vec<String> {
    let term = term.to_lowercase();
    catalog
        .iter()
        .filter(|c| c.to_lowercase().contains(&term))
        .cloned()
        .collect()
}

/// これまでの入力内容
#[derive(Clone, Debug)]
pub struct Selection {
    mode: Mode,
    article: String,
    codes_input: String,
    folders: Vec<SourceFolder>,
    folder_countries: Vec<String>,
    direct_country: String,
    color: String,
    slots: [Option<SourceFile>; SLOT_COUNT],
}

impl Selection {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            article: String::new(),
            codes_input: String::new(),
            folders: Vec::new(),
            folder_countries: Vec::new(),
            direct_country: String::new(),
            color: String::new(),
            slots: Default::default(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn article(&self) -> &str {
        &self.article
    }

    pub fn set_article(&mut self, article: impl Into<String>) {
        self.article = article.into();
    }

    /// サーバーへ送る品名
    pub fn article_normalized(&self) -> String {
        self.article.trim().to_uppercase()
    }

    pub fn codes_input(&self) -> &str {
        &self.codes_input
    }

    pub fn set_codes(&mut self, codes: impl Into<String>) {
        self.codes_input = codes.into();
    }

    pub fn codes(&self) -> Vec<String> {
        naming::parse_codes(&self.codes_input)
    }

    pub fn folder(&self) -> Option<&SourceFolder> {
        self.folders.first()
    }

    pub fn folders(&self) -> &[SourceFolder] {
        &self.folders
    }

    /// 同名フォルダ、空フォルダ、上限到達時は
    /// 何も変更せずfalseを返す。
    pub fn add_folder(&mut self, folder: SourceFolder) -> bool {
        if folder.files.is_empty() {
            tracing::warn!("folder rejected: {} has no files", folder.name);
            return false;
        }
        if self.folders.iter().any(|f| f.name == folder.name) {
            tracing::warn!("folder rejected: {} already selected", folder.name);
            return false;
        }
        if self.folders.len() >= MAX_FOLDERS {
            tracing::warn!("folder rejected: limit of {MAX_FOLDERS} reached");
            return false;
        }
        tracing::info!(
            "folder added: {} ({} files)",
            folder.name,
            folder.files.len()
        );
        self.folders.push(folder);
        true
    }

    pub fn remove_folder(&mut self, index: usize) {
        if index < self.folders.len() {
            self.folders.remove(index);
        }
    }

    pub fn folder_countries(&self) -> &[String] {
        &self.folder_countries
    }

    pub fn direct_country(&self) -> &str {
        &self.direct_country
    }

    pub fn is_country_selected(&self, country: &str) -> bool {
        match self.mode {
            Mode::FolderBatch => self.folder_countries.iter().any(|c| c == country),
            Mode::DirectUpload => self.direct_country == country,
        }
    }

    /// フォルダモードは複数、直接モードは最大1か国
    pub fn toggle_country(&mut self, country: &str) {
        match self.mode {
            Mode::FolderBatch => {
                if let Some(pos) = self.folder_countries.iter().position(|c| c == country) {
                    self.folder_countries.remove(pos);
                } else {
                    self.folder_countries.push(country.to_string());
                }
            }
            Mode::DirectUpload => {
                if self.direct_country == country {
                    self.direct_country.clear();
                } else {
                    self.direct_country = country.to_string();
                }
            }
        }
    }

    /// `filtered` がすべて選択済みならそれだけを外し、
    /// そうでなければ未選択分を追加する。`filtered` 外の国は変更しない。
    pub fn toggle_all_visible(&mut self, filtered: &[String]) {
        let all_selected = filtered
            .iter()
            .all(|c| self.folder_countries.contains(c));
        if all_selected {
            self.folder_countries.retain(|c| !filtered.contains(c));
        } else {
            for c in filtered {
                if !self.folder_countries.contains(c) {
                    self.folder_countries.push(c.clone());
                }
            }
        }
    }

    /// 未選択なら国一覧をすべて選択する
    pub fn seed_countries(&mut self, catalog: &[String]) {
        if self.folder_countries.is_empty() {
            self.folder_countries = catalog.to_vec();
        }
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
    }

    pub fn slots(&self) -> &[Option<SourceFile>; SLOT_COUNT] {
        &self.slots
    }

    pub fn set_direct_slot(&mut self, index: usize, file: SourceFile) -> Result<(), ValidationError> {
        if index >= SLOT_COUNT {
            return Err(ValidationError::SlotOutOfRange { index });
        }
        if !naming::is_image_type(&file.content_type) {
            return Err(ValidationError::NotAnImage { name: file.name });
        }
        self.slots[index] = Some(file);
        Ok(())
    }

    pub fn clear_direct_slot(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = None;
        }
    }

    pub fn clear_direct_slots(&mut self) {
        self.slots = Default::default();
    }

    /// 送信前チェック。最初に失敗した項目を返す。
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.article.trim().is_empty() {
            return Err(ValidationError::MissingArticle);
        }
        if self.codes_input.trim().is_empty() {
            return Err(ValidationError::MissingCodes);
        }
        let bad: Vec<String> = self
            .codes()
            .into_iter()
            .filter(|c| !naming::validate_code_length(c))
            .collect();
        if !bad.is_empty() {
            return Err(ValidationError::CodeLength(bad));
        }

        match self.mode {
            Mode::FolderBatch => {
                if self.folders.is_empty() {
                    return Err(ValidationError::MissingFolder);
                }
                if self.folder_countries.is_empty() {
                    return Err(ValidationError::MissingCountry);
                }
            }
            Mode::DirectUpload => {
                if self.direct_country.is_empty() {
                    return Err(ValidationError::MissingCountry);
                }
                if self.color.trim().is_empty() {
                    return Err(ValidationError::MissingColor);
                }
                if self.slots.iter().all(Option::is_none) {
                    return Err(ValidationError::MissingPhoto);
                }
            }
        }
        Ok(())
    }
}
