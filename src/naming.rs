//! File Naming Module
//!
//! 選択された列の値を`_`で連結して、出力ファイルのベース名を生成するモジュール。

use std::collections::HashMap;

use crate::builder::MergeConfig;
use crate::formatter::CellFormatter;
use crate::types::{Row, Table};

/// ファイル名ビルダー
pub(crate) struct FileNameBuilder<'a> {
    formatter: &'a CellFormatter,
    config: &'a MergeConfig,
}

impl<'a> FileNameBuilder<'a> {
    pub fn new(formatter: &'a CellFormatter, config: &'a MergeConfig) -> Self {
        Self { formatter, config }
    }

    /// 行からベース名を生成
    ///
    /// ヘッダーに存在しない列名は無視されます。ファイル名として使用できない
    /// 文字の除去は行いません。
    pub fn build(&self, row: &Row, table: &Table, columns: &[String]) -> String {
        columns
            .iter()
            .filter_map(|name| table.column_index(name))
            .map(|col| {
                row.cell(col)
                    .map(|cell| self.formatter.format_name_part(&cell.value, self.config))
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join("_")
    }

    /// 先頭データ行のファイル名例を生成（データ行がない場合は`None`）
    pub fn preview(&self, table: &Table, columns: &[String]) -> Option<String> {
        table
            .rows
            .first()
            .map(|row| self.build(row, table, columns))
    }
}

/// バッチ内でのファイル名の重複を解決する
///
/// 同じベース名が2回目以降に現れた場合、`_2`, `_3`, … を付加します。
/// 空のベース名は`row_<シート行番号>`に置き換えます。
/// 大文字・小文字を区別しないファイルシステムでも上書きが起きないよう、
/// 大文字・小文字の違いだけの名前も重複として扱います。
#[derive(Debug, Default)]
pub(crate) struct UniqueNames {
    /// 小文字化した名前 -> 最後に付加した番号
    seen: HashMap<String, u32>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// 一意なベース名を割り当てる
    pub fn assign(&mut self, base: String, sheet_row: u32) -> String {
        let base = if base.is_empty() {
            format!("row_{}", sheet_row)
        } else {
            base
        };

        let key = base.to_lowercase();
        let mut candidate = base.clone();
        let mut counter = self.seen.get(&key).copied().unwrap_or(0);
        // 付加した結果が既存の名前と衝突する場合（例: "a_2"が元から存在）も再試行する
        while self.seen.contains_key(&candidate.to_lowercase()) {
            counter += 1;
            candidate = format!("{}_{}", base, counter + 1);
        }

        self.seen.insert(key, counter);
        self.seen.entry(candidate.to_lowercase()).or_insert(0);
        candidate
    }
}
