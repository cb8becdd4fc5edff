//! Types Module
//!
//! クレート全体で使用する共通データ型（表、行、セル）を定義するモジュール。

use chrono::NaiveDateTime;

/// セルの値を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// 整数
    Integer(i64),

    /// 数値（f64）
    Decimal(f64),

    /// 文字列（論理値・エラー値もリテラル文字列として保持）
    Text(String),

    /// 日付・日時
    Date(NaiveDateTime),

    /// 空セル
    Empty,
}

impl CellValue {
    /// 値が空かどうかを判定
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// 数値として取得（Integer/Decimalの場合のみ）
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Decimal(f) => Some(*f),
            _ => None,
        }
    }
}

/// 値と表示書式の組
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// セルの値
    pub value: CellValue,

    /// 表示書式文字列（例: `#,##0.00 "€"`）。書式情報がない場合は`None`
    pub format_code: Option<String>,
}

impl Cell {
    /// 新しいセルを生成
    pub fn new(value: CellValue, format_code: Option<String>) -> Self {
        Self { value, format_code }
    }

    /// 書式なしのセルを生成
    pub fn plain(value: CellValue) -> Self {
        Self {
            value,
            format_code: None,
        }
    }
}

/// データ行
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// シート上の行番号（1始まり、Excelの表示と同じ）
    pub sheet_row: u32,

    /// 列位置順のセル（列0 = A列）
    pub cells: Vec<Cell>,
}

impl Row {
    /// 指定列のセルを取得
    pub fn cell(&self, col: usize) -> Option<&Cell> {
        self.cells.get(col)
    }
}

/// 読み込み済みのデータ表
///
/// 1回の実行につき1度だけ読み込まれ、処理中は変更されません。
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// ヘッダー行の列名（列位置順）
    pub headers: Vec<String>,

    /// データ行（シート上の順序）
    pub rows: Vec<Row>,
}

impl Table {
    /// 列名から列位置を取得
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// 列数
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

/// 列インデックスを列記号に変換（0 -> "A", 25 -> "Z", 26 -> "AA"）
pub fn column_letter(mut col: u32) -> String {
    let mut result = String::new();
    loop {
        let remainder = col % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    result
}

/// 列記号を列インデックスに変換（"A" -> 0, "AA" -> 26）
///
/// 大文字英字以外を含む場合は`None`を返します。
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    let mut index: u32 = 0;
    for b in letters.bytes() {
        index = index
            .checked_mul(26)?
            .checked_add((b - b'A') as u32 + 1)?;
    }
    Some(index - 1)
}
