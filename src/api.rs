//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use std::fmt;

/// 行の選択条件
///
/// 出力ドキュメントを生成する行を決定します。
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Selection {
    /// シート上の行番号による範囲指定（両端を含む）
    ///
    /// 行番号はExcelの表示と同じ1始まりです。ヘッダー行が1行目の場合、
    /// 最初のデータ行は2行目になります。
    ///
    /// 例: `Selection::ByRange { start: 2, end: 4 }` はシートの2〜4行目
    ByRange {
        /// 開始行（1始まり）
        start: u32,
        /// 終了行（1始まり）
        end: u32,
    },

    /// 先頭列の値（識別子）による指定
    ///
    /// 比較は文字列として行われます。出力順序は指定順ではなく表の順序です。
    ///
    /// 例: `Selection::ByIdentifier(vec!["1001".to_string(), "1002".to_string()])`
    ByIdentifier(Vec<String>),
}

impl Selection {
    /// カンマ区切りの識別子リストから選択条件を生成
    ///
    /// 各識別子の前後の空白は取り除かれ、空の要素は無視されます。
    ///
    /// ```rust
    /// use slidemerge::Selection;
    ///
    /// let selection = Selection::from_identifier_list(" B2, C3 ,,");
    /// assert_eq!(
    ///     selection,
    ///     Selection::ByIdentifier(vec!["B2".to_string(), "C3".to_string()])
    /// );
    /// ```
    pub fn from_identifier_list(list: &str) -> Self {
        Selection::ByIdentifier(
            list.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl Default for Selection {
    fn default() -> Self {
        Selection::ByRange { start: 2, end: 2 }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::ByRange { start, end } => write!(f, "rows {}-{}", start, end),
            Selection::ByIdentifier(ids) => write!(f, "identifiers [{}]", ids.join(", ")),
        }
    }
}

/// 出力フォーマット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutputFormat {
    /// PowerPoint形式（`.pptx`、デフォルト）
    Pptx,

    /// PDF形式
    ///
    /// PPTXを生成した後、外部コンバーター（LibreOfficeなど）で変換します。
    /// 変換に成功した場合、中間のPPTXファイルは削除されます。
    Pdf,
}

impl OutputFormat {
    /// 出力ファイルの拡張子
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pptx => "pptx",
            OutputFormat::Pdf => "pdf",
        }
    }

    /// 1ファイルあたりの推定処理時間（秒）
    pub(crate) fn estimated_seconds_per_file(&self) -> u64 {
        match self {
            OutputFormat::Pptx => 1,
            OutputFormat::Pdf => 5,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Pptx => write!(f, "PPTX"),
            OutputFormat::Pdf => write!(f, "PDF"),
        }
    }
}

/// 日付の出力形式
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DateFormat {
    /// 日-月-年形式（DD-MM-YYYY、デフォルト）
    ///
    /// 例: `05-01-2025`
    DayMonthYear,

    /// ISO 8601形式（YYYY-MM-DD）
    ///
    /// 例: `2025-01-05`
    Iso8601,

    /// カスタム形式（chrono互換フォーマット文字列）
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use slidemerge::{DateFormat, MergerBuilder};
    ///
    /// # fn main() -> Result<(), slidemerge::SlideMergeError> {
    /// let merger = MergerBuilder::new()
    ///     .with_date_format(DateFormat::Custom("%d/%m/%Y".to_string()))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    Custom(String),
}

impl DateFormat {
    /// chrono互換のフォーマット文字列
    pub(crate) fn pattern(&self) -> &str {
        match self {
            DateFormat::DayMonthYear => "%d-%m-%Y",
            DateFormat::Iso8601 => "%Y-%m-%d",
            DateFormat::Custom(pattern) => pattern,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_list_trims_and_drops_empty() {
        assert_eq!(
            Selection::from_identifier_list("A1,  B2 , ,C3"),
            Selection::ByIdentifier(vec![
                "A1".to_string(),
                "B2".to_string(),
                "C3".to_string()
            ])
        );
        assert_eq!(
            Selection::from_identifier_list(" , "),
            Selection::ByIdentifier(vec![])
        );
    }

    #[test]
    fn test_selection_display() {
        assert_eq!(
            Selection::ByRange { start: 2, end: 9 }.to_string(),
            "rows 2-9"
        );
        assert_eq!(
            Selection::from_identifier_list("B2, C3").to_string(),
            "identifiers [B2, C3]"
        );
    }

    #[test]
    fn test_output_format_extension() {
        assert_eq!(OutputFormat::Pptx.extension(), "pptx");
        assert_eq!(OutputFormat::Pdf.extension(), "pdf");
        assert_eq!(OutputFormat::Pdf.to_string(), "PDF");
        assert_eq!(OutputFormat::Pdf.estimated_seconds_per_file(), 5);
    }

    #[test]
    fn test_date_format_pattern() {
        assert_eq!(DateFormat::DayMonthYear.pattern(), "%d-%m-%Y");
        assert_eq!(DateFormat::Iso8601.pattern(), "%Y-%m-%d");
        assert_eq!(DateFormat::Custom("%Y".to_string()).pattern(), "%Y");
    }
}
