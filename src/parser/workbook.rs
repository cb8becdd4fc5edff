//! Parser Module
//!
//! calamineを使用したExcelファイル解析の実装。
//! 先頭シートを読み込み、ヘッダー行とデータ行からなる表を構築します。

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets, Xlsx};
use chrono::{NaiveDate, NaiveDateTime};
use std::io::{Cursor, Read};

use crate::error::SlideMergeError;
use crate::formatter::DateFormatter;
use crate::parser::XlsxMetadataParser;
use crate::security::SecurityConfig;
use crate::types::{column_letter, Cell, CellValue, Row, Table};

/// ワークブックパーサー
///
/// calamineのラッパーとして、値の読み込みとXMLメタデータ（書式文字列）の統合を行います。
pub(crate) struct WorkbookParser {
    /// calamineのワークブック（XLSX形式のみサポート）
    workbook: Xlsx<Cursor<Vec<u8>>>,
    /// XMLメタデータパーサー
    metadata: XlsxMetadataParser,
}

impl WorkbookParser {
    /// ワークブックを開き、XMLメタデータも解析する
    ///
    /// # 引数
    ///
    /// * `reader` - Excelファイルを読み込むためのリーダー
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookParser)` - ワークブックとメタデータの読み込みに成功した場合
    /// * `Err(SlideMergeError)` - 入力がXLSXでない、またはセキュリティ制限に違反した場合
    pub fn open<R: Read>(reader: R) -> Result<Self, SlideMergeError> {
        // セキュリティ: ファイルサイズ制限を適用
        let buffer = SecurityConfig::default().read_input(reader)?;

        // XMLメタデータを先に解析（ZIP bomb等の検査を含む）
        let metadata = XlsxMetadataParser::new(Cursor::new(buffer.as_slice()))?;

        let sheets = open_workbook_auto_from_rs(Cursor::new(buffer))
            .map_err(SlideMergeError::Parse)?;
        let workbook = match sheets {
            Sheets::Xlsx(workbook) => workbook,
            _ => {
                return Err(SlideMergeError::Config(
                    "Only XLSX format is supported".to_string(),
                ))
            }
        };

        Ok(WorkbookParser { workbook, metadata })
    }

    /// 先頭シートを表として読み込む
    ///
    /// 使用範囲の1行目をヘッダー行とし、以降をデータ行とします。
    /// セルはシート上の列位置（列0 = A列）で格納されます。
    /// すべてのセルが空の行はスキップされます。
    pub fn load_table(&mut self) -> Result<Table, SlideMergeError> {
        // 書式情報と同じシート（workbook.xmlの先頭）を読む
        let sheet_name = match self.metadata.first_sheet() {
            Some(sheet) => sheet.name.clone(),
            None => self
                .workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| SlideMergeError::Config("Workbook contains no sheets".to_string()))?,
        };

        let range = self
            .workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| SlideMergeError::Parse(e.into()))?;

        let Some((start_row, start_col)) = range.start() else {
            tracing::warn!(sheet = %sheet_name, "first sheet is empty");
            return Ok(Table {
                headers: Vec::new(),
                rows: Vec::new(),
            });
        };

        let mut rows_iter = range.rows();

        // 1. ヘッダー行（使用範囲の先頭行）
        let mut headers: Vec<String> = (0..start_col).map(column_letter).collect();
        if let Some(header_row) = rows_iter.next() {
            for (offset, cell) in header_row.iter().enumerate() {
                let col = start_col + offset as u32;
                let name = cell.to_string().trim().to_string();
                headers.push(if name.is_empty() {
                    column_letter(col)
                } else {
                    name
                });
            }
        }

        // 2. データ行
        let is_1904 = self.metadata.is_1904();
        let mut rows = Vec::new();
        for (offset, data_row) in rows_iter.enumerate() {
            let row_idx = start_row + 1 + offset as u32;

            let mut cells: Vec<Cell> = (0..start_col).map(|_| Cell::plain(CellValue::Empty)).collect();
            for (col_offset, data) in data_row.iter().enumerate() {
                let col_idx = start_col + col_offset as u32;
                let value = convert_value(data, is_1904);
                let format_code = self
                    .metadata
                    .format_code_at(row_idx, col_idx)
                    .map(str::to_string);
                cells.push(Cell::new(value, format_code));
            }

            if cells.iter().all(|c| c.value.is_empty()) {
                tracing::debug!(sheet_row = row_idx + 1, "skipping blank row");
                continue;
            }

            rows.push(Row {
                // Excelの行番号は1始まり
                sheet_row: row_idx + 1,
                cells,
            });
        }

        tracing::debug!(
            sheet = %sheet_name,
            columns = headers.len(),
            rows = rows.len(),
            is_1904,
            "loaded data table"
        );

        Ok(Table { headers, rows })
    }
}

/// calamineのセルデータを`CellValue`に変換
fn convert_value(data: &Data, is_1904: bool) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Decimal(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => CellValue::Text(e.to_string()),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            DateFormatter::from_serial(serial, is_1904)
                .map(CellValue::Date)
                .unwrap_or(CellValue::Decimal(serial))
        }
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Empty => CellValue::Empty,
        #[allow(unreachable_patterns)]
        _ => CellValue::Empty,
    }
}

/// ISO 8601形式の日時文字列を解析（日付のみの形式も許可）
fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
