//! マーケットプレイス向けの命名規則（国サフィックス、スロット名、コード検査）。

/// コードの必須文字数
pub const CODE_LEN: usize = 10;

/// 直接アップロードのスロット数（MAIN + PT01..PT09）
pub const SLOT_COUNT: usize = 10;

/// 国名 → フォルダのサフィックス。先頭の空白もサフィックスの一部。
const COUNTRY_SUFFIXES: [(&str, &str); 8] = [
    ("ESPAÑA", " ES"),
    ("ALEMANIA", " DE"),
    ("FRANCIA", " FR"),
    ("ITALIA", " IT"),
    ("UK", " UK"),
    ("NETHERLANDS", " NE"),
    ("POLONIA", " PL"),
    ("SUECIA", " SE"),
];

/// 国のサフィックス。未登録の国は空文字。
pub fn suffix_for(country: &str) -> &'static str {
    COUNTRY_SUFFIXES
        .iter()
        .find(|(name, _)| *name == country)
        .map(|(_, suffix)| *suffix)
        .unwrap_or("")
}

/// スロット0は `MAIN`、残りは `PT01`..`PT09`
pub fn slot_label(index: usize) -> String {
    if index == 0 {
        "MAIN".to_string()
    } else {
        format!("PT{:02}", index)
    }
}

/// ローカルでのコード長チェック。識別文字はサーバー側で検査する。
pub fn validate_code_length(code: &str) -> bool {
    code.chars().count() == CODE_LEN
}

/// カンマ区切りで分割し、trimして大文字化したコード一覧。
/// 重複や空要素は長さチェックで報告できるよう残す。
pub fn parse_codes(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|c| c.trim().to_uppercase())
        .collect()
}

/// Content-Typeが画像ならtrue
pub fn is_image_type(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

/// 最後のドット以降の文字列。ドットが無ければ名前全体。
pub fn extension_of(filename: &str) -> &str {
    filename.rsplit('.').next().unwrap_or(filename)
}

/// ファイル名から推定したContent-Type
pub fn content_type_for(filename: &str) -> &'static str {
    if !filename.contains('.') {
        return "application/octet-stream";
    }
    match extension_of(filename).to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "avif" => "image/avif",
        "cr2" => "image/x-canon-cr2",
        "nef" => "image/x-nikon-nef",
        "arw" => "image/x-sony-arw",
        "dng" => "image/x-adobe-dng",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_countries_map_to_suffixes() {
        assert_eq!(suffix_for("ESPAÑA"), " ES");
        assert_eq!(suffix_for("NETHERLANDS"), " NE");
        assert_eq!(suffix_for("SUECIA"), " SE");
    }

    #[test]
    fn unknown_countries_have_empty_suffix() {
        for c in ["PORTUGAL", "", "españa", "ESPANA", "UK "] {
            assert_eq!(suffix_for(c), "", "{c:?}");
        }
    }

    #[test]
    fn slot_labels() {
        assert_eq!(slot_label(0), "MAIN");
        assert_eq!(slot_label(1), "PT01");
        assert_eq!(slot_label(3), "PT03");
        assert_eq!(slot_label(9), "PT09");
    }

    #[test]
    fn code_length_check() {
        assert!(validate_code_length("B000000001"));
        assert!(!validate_code_length("B001"));
        assert!(!validate_code_length("B2"));
        assert!(!validate_code_length("B000000003X"));
    }

    #[test]
    fn codes_are_split_trimmed_and_upper_cased() {
        let codes = parse_codes(" b000000001 ,B000000001,x");
        assert_eq!(codes, vec!["B000000001", "B000000001", "X"]);
    }

    #[test]
    fn short_and_long_codes_fail_length() {
        let codes = parse_codes("B001,B2,B000000003X");
        let lens: Vec<usize> = codes.iter().map(|c| c.len()).collect();
        assert_eq!(lens, vec![4, 2, 11]);
        assert!(codes.iter().all(|c| !validate_code_length(c)));
    }

    #[test]
    fn image_types() {
        assert!(is_image_type("image/png"));
        assert!(!is_image_type("text/plain"));
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("notes.txt"), "text/plain");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }

    #[test]
    fn extension_is_last_dot_segment() {
        assert_eq!(extension_of("photo.final.png"), "png");
        assert_eq!(extension_of("noext"), "noext");
    }
}
