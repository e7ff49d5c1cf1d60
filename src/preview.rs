//! リネームAPIが返す事前解析結果。

use serde::Deserialize;

/// サーバー側のコード検査（識別文字）
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CodesValidation {
    #[serde(default)]
    pub valid: Vec<String>,
    #[serde(default)]
    pub invalid: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Summary {
    pub total_folders: u32,
    pub total_files: u32,
    pub total_valid: u32,
    pub total_invalid: u32,
    pub total_pngs_to_convert: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct FolderStats {
    pub total: u32,
    pub valid: u32,
    pub invalid: u32,
    pub pngs_to_convert: u32,
}

/// 除外されるファイルとその理由
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct InvalidFile {
    pub name: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct FolderFiles {
    #[serde(default)]
    pub valid: Vec<String>,
    #[serde(default)]
    pub invalid: Vec<InvalidFile>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct FolderAnalysis {
    pub name: String,
    #[serde(default)]
    pub detected_country: Option<String>,
    #[serde(default)]
    pub detected_color: Option<String>,
    pub stats: FolderStats,
    pub files: FolderFiles,
}

/// プレビュー画面の表示中は読み取り専用
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PreviewResult {
    pub codes_validation: CodesValidation,
    pub summary: Summary,
    #[serde(default)]
    pub folders: Vec<FolderAnalysis>,
}

impl PreviewResult {
    pub fn has_invalid_codes(&self) -> bool {
        !self.codes_validation.invalid.is_empty()
    }

    /// `reason` と完全一致する理由で除外されたファイルがあればtrue
    pub fn has_invalid_with_reason(&self, reason: &str) -> bool {
        self.folders
            .iter()
            .any(|f| f.files.invalid.iter().any(|i| i.reason == reason))
    }

    /// 通常の実行ボタンを表示するか
    pub fn offers_commit(&self) -> bool {
        self.summary.total_invalid == 0
    }

    /// 通常の実行：不正ファイルなし、処理対象あり、コードも有効
    pub fn can_commit(&self) -> bool {
        self.offers_commit() && self.summary.total_valid > 0 && !self.has_invalid_codes()
    }

    /// 「有効分のみ実行」を表示するか
    pub fn offers_commit_only_valid(&self, non_image_reason: &str) -> bool {
        self.has_invalid_with_reason(non_image_reason) && self.summary.total_valid > 0
    }

    /// 表示中かつ不正なコードが無い
    pub fn can_commit_only_valid(&self, non_image_reason: &str) -> bool {
        self.offers_commit_only_valid(non_image_reason) && !self.has_invalid_codes()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const NON_IMAGE: &str = "not an image file";

    pub(crate) fn result(valid: u32, invalid: &[(&str, &str)], bad_codes: &[&str]) -> PreviewResult {
        let invalid_files: Vec<InvalidFile> = invalid
            .iter()
            .map(|(name, reason)| InvalidFile {
                name: name.to_string(),
                reason: reason.to_string(),
            })
            .collect();
        let n_invalid = invalid_files.len() as u32;
        PreviewResult {
            codes_validation: CodesValidation {
                valid: vec!["B000000001".into()],
                invalid: bad_codes.iter().map(|c| c.to_string()).collect(),
            },
            summary: Summary {
                total_folders: 1,
                total_files: valid + n_invalid,
                total_valid: valid,
                total_invalid: n_invalid,
                total_pngs_to_convert: 0,
            },
            folders: vec![FolderAnalysis {
                name: "ROJO ES".into(),
                detected_country: Some("ESPAÑA".into()),
                detected_color: Some("ROJO".into()),
                stats: FolderStats {
                    total: valid + n_invalid,
                    valid,
                    invalid: n_invalid,
                    pngs_to_convert: 0,
                },
                files: FolderFiles {
                    valid: (0..valid).map(|i| format!("f.PT{:02}.jpg", i)).collect(),
                    invalid: invalid_files,
                },
            }],
        }
    }

    #[test]
    fn parses_server_payload() {
        let body = r#"{
            "success": true,
            "folders": [{
                "name": "ROJO ES",
                "detected_country": "ESPAÑA",
                "detected_color": null,
                "files": {
                    "valid": ["a.MAIN.jpg"],
                    "invalid": [{"name": "notes.txt", "reason": "not an image file"}]
                },
                "stats": {"total": 2, "valid": 1, "invalid": 1, "pngs_to_convert": 0}
            }],
            "codes_validation": {"valid": ["B000000001"], "invalid": []},
            "summary": {
                "total_folders": 1, "total_files": 2, "total_valid": 1,
                "total_invalid": 1, "total_pngs_to_convert": 0
            }
        }"#;
        let r: PreviewResult = serde_json::from_str(body).unwrap();
        assert_eq!(r.folders[0].detected_color, None);
        assert_eq!(r.folders[0].files.invalid[0].name, "notes.txt");
        assert!(!r.can_commit());
        assert!(r.can_commit_only_valid(NON_IMAGE));
    }

    #[test]
    fn commit_gate() {
        assert!(result(3, &[], &[]).can_commit());
        assert!(!result(3, &[("x.txt", NON_IMAGE)], &[]).can_commit());
        assert!(!result(3, &[], &["X000000001"]).can_commit());
        assert!(!result(3, &[("x.txt", NON_IMAGE)], &["X000000001"]).can_commit());
        assert!(!result(0, &[], &[]).can_commit());
        // 不正なコードがあっても表示はする（実行は不可）。
        assert!(result(3, &[], &["X000000001"]).offers_commit());
        assert!(!result(3, &[("x.txt", NON_IMAGE)], &[]).offers_commit());
    }

    #[test]
    fn only_valid_gate_needs_exact_reason_and_a_valid_file() {
        assert!(result(2, &[("x.txt", NON_IMAGE)], &[]).offers_commit_only_valid(NON_IMAGE));
        assert!(!result(0, &[("x.txt", NON_IMAGE)], &[]).offers_commit_only_valid(NON_IMAGE));
        assert!(
            !result(2, &[("a.PT1.jpg", "bad .PT format")], &[]).offers_commit_only_valid(NON_IMAGE)
        );
        assert!(!result(2, &[("x.txt", "Not an image file")], &[]).offers_commit_only_valid(NON_IMAGE));
    }

    #[test]
    fn only_valid_is_shown_but_blocked_by_bad_codes() {
        let r = result(2, &[("x.txt", NON_IMAGE)], &["X000000001"]);
        assert!(r.offers_commit_only_valid(NON_IMAGE));
        assert!(!r.can_commit_only_valid(NON_IMAGE));
    }
}
