//! 選択内容をサーバーへ送る仮想フォルダ構成に展開する。

use crate::{
    naming,
    selection::{Mode, Selection, SourceFile},
};

/// 送信先フォルダ内の1ファイル
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VirtualEntry {
    /// 大文字化した送信先フォルダ名（サフィックス込み）
    pub folder: String,
    /// 送信先フォルダ内のファイル名
    pub filename: String,
    /// 読み込み元のパス
    pub file: SourceFile,
}

impl VirtualEntry {
    /// multipartのファイル名 `<FOLDER>/<NAME>`
    pub fn path(&self) -> String {
        format!("{}/{}", self.folder, self.filename)
    }
}

/// 副作用なし。同じ選択内容からは常に同じ一覧を返す。
pub fn expand(selection: &Selection) -> Vec<VirtualEntry> {
    match selection.mode() {
        Mode::FolderBatch => expand_folders(selection),
        Mode::DirectUpload => expand_direct(selection),
    }
}

/// 選択した国ごとにフォルダ内の全ファイルを並べる
fn expand_folders(selection: &Selection) -> Vec<VirtualEntry> {
    let mut entries = Vec::new();
    for folder in selection.folders() {
        for country in selection.folder_countries() {
            let target = format!("{}{}", folder.name, naming::suffix_for(country)).to_uppercase();
            entries.extend(folder.files.iter().map(|f| VirtualEntry {
                folder: target.clone(),
                filename: f.name.clone(),
                file: f.clone(),
            }));
        }
    }
    entries
}

/// 埋まっているスロットを `<COLOR><SUFFIX>` 配下の `temp.<SLOT>.<ext>` にする
fn expand_direct(selection: &Selection) -> Vec<VirtualEntry> {
    let suffix = naming::suffix_for(selection.direct_country());
    let target = format!("{}{}", selection.color(), suffix).to_uppercase();

    selection
        .slots()
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| {
            let file = slot.as_ref()?;
            Some(VirtualEntry {
                folder: target.clone(),
                filename: format!(
                    "temp.{}.{}",
                    naming::slot_label(index),
                    naming::extension_of(&file.name)
                ),
                file: file.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::tests::{file, folder};

    #[test]
    fn folder_mode_is_files_times_countries() {
        let mut s = Selection::new(Mode::FolderBatch);
        s.add_folder(folder("Rojo", &["a.MAIN.jpg", "a.PT01.jpg", "notes.txt"]));
        s.toggle_country("ESPAÑA");
        s.toggle_country("UK");

        let entries = expand(&s);
        assert_eq!(entries.len(), 3 * 2);
        let paths: Vec<String> = entries.iter().map(VirtualEntry::path).collect();
        assert_eq!(
            paths,
            vec![
                "ROJO ES/a.MAIN.jpg",
                "ROJO ES/a.PT01.jpg",
                "ROJO ES/notes.txt",
                "ROJO UK/a.MAIN.jpg",
                "ROJO UK/a.PT01.jpg",
                "ROJO UK/notes.txt",
            ]
        );
    }

    #[test]
    fn unmapped_country_gets_bare_folder_name() {
        let mut s = Selection::new(Mode::FolderBatch);
        s.add_folder(folder("verde", &["x.jpg"]));
        s.toggle_country("PORTUGAL");
        let entries = expand(&s);
        assert_eq!(entries[0].path(), "VERDE/x.jpg");
    }

    #[test]
    fn direct_mode_uses_slot_labels() {
        let mut s = Selection::new(Mode::DirectUpload);
        s.set_color("azul");
        s.toggle_country("ESPAÑA");
        s.set_direct_slot(0, file("IMG_1.jpeg")).unwrap();
        s.set_direct_slot(2, file("other.PNG")).unwrap();

        let entries = expand(&s);
        let paths: Vec<String> = entries.iter().map(VirtualEntry::path).collect();
        assert_eq!(paths, vec!["AZUL ES/temp.MAIN.jpeg", "AZUL ES/temp.PT02.PNG"]);
        assert_eq!(entries[1].file.name, "other.PNG");
    }

    #[test]
    fn expansion_is_idempotent() {
        let mut s = Selection::new(Mode::FolderBatch);
        s.add_folder(folder("Negro", &["1.MAIN.jpg", "2.PT01.jpg"]));
        s.toggle_country("FRANCIA");
        s.toggle_country("ITALIA");
        assert_eq!(expand(&s), expand(&s));
    }

    #[test]
    fn nothing_selected_expands_to_nothing() {
        assert!(expand(&Selection::new(Mode::FolderBatch)).is_empty());
        assert!(expand(&Selection::new(Mode::DirectUpload)).is_empty());
    }
}
