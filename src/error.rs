//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// slidemergeクレート全体で使用するエラー型
///
/// データソース（Excel）の読み込み、テンプレート（PPTX）の解析、
/// 出力ファイルの書き込み中に発生するすべてのエラーを統一的に扱います。
///
/// # エラーの種類
///
/// - `Io`: I/O操作中に発生したエラー（ファイル読み込み失敗など）
/// - `Parse`: Excelファイルの解析中に発生したエラー（calamine由来）
/// - `Config`: 設定の検証に失敗したエラー（無効な行範囲など）
/// - `Template`: テンプレートXMLの解析・書き換えに失敗したエラー
/// - `EmptySelection`: 選択条件に一致する行が存在しないエラー
///
/// # 使用例
///
/// ```rust,no_run
/// use slidemerge::SlideMergeError;
/// use std::fs::File;
///
/// fn open_data(path: &str) -> Result<(), SlideMergeError> {
///     let _file = File::open(path)?;  // Ioエラーが自動的に変換される
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum SlideMergeError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Excelファイルの解析中に発生したエラー
    ///
    /// `#[from]`属性により、`calamine::Error`から自動的に変換されます。
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// UTF-8文字列の変換エラー
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// ZIPアーカイブの解析・書き込みエラー
    ///
    /// XLSX/PPTXファイル（どちらもZIPアーカイブ）や出力アーカイブの
    /// 処理中に発生したエラーです。
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// 数値の解析エラー
    #[error("Number parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// 設定の検証に失敗したエラー
    ///
    /// `MergerBuilder::build()`時に設定を検証し、無効な設定が検出された
    /// 場合に発生します。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use slidemerge::{MergerBuilder, Selection, SlideMergeError};
    ///
    /// let result = MergerBuilder::new()
    ///     .with_selection(Selection::ByRange { start: 10, end: 2 })
    ///     .build();
    ///
    /// match result {
    ///     Err(SlideMergeError::Config(msg)) => println!("設定エラー: {}", msg),
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// テンプレートの解析・書き換えエラー
    ///
    /// スライドXMLが壊れている場合など、プレースホルダー置換が
    /// 完了できなかった場合に発生します。
    #[error("Template error in '{part}': {message}")]
    Template {
        /// エラーが発生したパッケージ内パート名
        part: String,
        /// エラーの詳細メッセージ
        message: String,
    },

    /// 選択条件に一致する行が存在しない
    ///
    /// 処理は開始されず、出力ファイルは作成されません。
    #[error("No rows to generate: nothing matched {criterion}")]
    EmptySelection {
        /// 利用者向けの選択条件の説明
        criterion: String,
    },

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb攻撃、パストラバーサル攻撃、ファイルサイズ制限などの
    /// セキュリティ制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

impl From<zip::result::ZipError> for SlideMergeError {
    fn from(err: zip::result::ZipError) -> Self {
        SlideMergeError::Zip(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error: SlideMergeError = io_err.into();

        match error {
            SlideMergeError::Io(e) => {
                assert_eq!(e.kind(), io::ErrorKind::NotFound);
                assert_eq!(e.to_string(), "File not found");
            }
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_parse_error_display() {
        let parse_err = calamine::Error::Msg("Corrupted file");
        let error: SlideMergeError = parse_err.into();

        let error_msg = error.to_string();
        assert!(error_msg.contains("Failed to parse Excel file"));
        assert!(error_msg.contains("Corrupted file"));
    }

    #[test]
    fn test_zip_error_conversion() {
        let error: SlideMergeError = zip::result::ZipError::FileNotFound.into();
        assert!(matches!(error, SlideMergeError::Zip(_)));
        assert!(error.to_string().starts_with("ZIP archive error"));
    }

    #[test]
    fn test_template_error_display() {
        let error = SlideMergeError::Template {
            part: "ppt/slides/slide1.xml".to_string(),
            message: "unexpected end of file".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("ppt/slides/slide1.xml"));
        assert!(msg.contains("unexpected end of file"));
    }

    #[test]
    fn test_empty_selection_display() {
        let error = SlideMergeError::EmptySelection {
            criterion: "rows 5-7".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "No rows to generate: nothing matched rows 5-7"
        );
    }

    // エラー変換のテスト（?演算子の動作確認）
    #[test]
    fn test_error_conversion_with_question_mark() {
        fn io_operation() -> Result<(), SlideMergeError> {
            let _file = std::fs::File::open("nonexistent_file.xlsx")?;
            Ok(())
        }

        match io_operation() {
            Err(SlideMergeError::Io(_)) => {}
            _ => panic!("Expected Io error from ? operator"),
        }
    }

    #[test]
    fn test_all_error_formats() {
        let io_err: SlideMergeError = io::Error::other("test io").into();
        assert!(io_err.to_string().starts_with("IO error"));

        let config_err = SlideMergeError::Config("test config".to_string());
        assert!(config_err.to_string().starts_with("Configuration error"));

        let security_err = SlideMergeError::SecurityViolation("too big".to_string());
        assert!(security_err.to_string().starts_with("Security violation"));
    }
}
