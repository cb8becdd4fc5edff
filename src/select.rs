//! Row Selection Module
//!
//! 選択条件（行範囲または識別子）に基づいて、処理対象の行を抽出するモジュール。

use std::collections::HashSet;

use crate::api::Selection;
use crate::builder::MergeConfig;
use crate::error::SlideMergeError;
use crate::formatter::CellFormatter;
use crate::types::{Row, Table};

/// 行セレクター
///
/// 結果は常に表の順序を保持します（識別子の指定順には依存しません）。
pub(crate) struct RowSelector<'a> {
    formatter: &'a CellFormatter,
    config: &'a MergeConfig,
}

impl<'a> RowSelector<'a> {
    pub fn new(formatter: &'a CellFormatter, config: &'a MergeConfig) -> Self {
        Self { formatter, config }
    }

    /// 選択条件に一致する行を表の順序で返す
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<&Row>)` - 1行以上が一致した場合
    /// * `Err(SlideMergeError::EmptySelection)` - 一致する行が存在しない場合
    pub fn select<'t>(
        &self,
        table: &'t Table,
        selection: &Selection,
    ) -> Result<Vec<&'t Row>, SlideMergeError> {
        let selected: Vec<&Row> = match selection {
            Selection::ByRange { start, end } => table
                .rows
                .iter()
                .filter(|row| (*start..=*end).contains(&row.sheet_row))
                .collect(),

            Selection::ByIdentifier(ids) => {
                let wanted: HashSet<&str> = ids.iter().map(|id| id.trim()).collect();
                table
                    .rows
                    .iter()
                    .filter(|row| wanted.contains(self.identifier(row).as_str()))
                    .collect()
            }
        };

        if selected.is_empty() {
            return Err(SlideMergeError::EmptySelection {
                criterion: selection.to_string(),
            });
        }

        tracing::debug!(%selection, selected = selected.len(), "rows selected");
        Ok(selected)
    }

    /// 先頭列の比較用文字列（ファイル名と同じ表記）
    ///
    /// 空白の除去は指定された識別子側のみに行い、セル値はそのまま比較します。
    fn identifier(&self, row: &Row) -> String {
        row.cell(0)
            .map(|cell| self.formatter.format_name_part(&cell.value, self.config))
            .unwrap_or_default()
    }
}
