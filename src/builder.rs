//! Builder Module
//!
//! Fluent Builder APIを提供し、`Merger`インスタンスを段階的に構築する。
//! `Merger`はバッチ処理（行選択 → 置換 → 保存 → 変換 → アーカイブ）のファサードです。

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use serde::Serialize;

use crate::api::{DateFormat, OutputFormat, Selection};
use crate::archive::write_archive;
use crate::convert::{DocumentConverter, LibreOfficeConverter, DEFAULT_CONVERTER_PROGRAM};
use crate::error::SlideMergeError;
use crate::formatter::CellFormatter;
use crate::naming::{FileNameBuilder, UniqueNames};
use crate::parser::WorkbookParser;
use crate::select::RowSelector;
use crate::template::Template;
use crate::types::{column_index, column_letter, Row, Table};

/// 既定の通貨記号（検索順）
pub const DEFAULT_CURRENCY_SYMBOLS: [char; 3] = ['€', '$', '£'];

/// 出力フォルダー・アーカイブ名の接頭辞
const OUTPUT_PREFIX: &str = "Presentations_";

/// バッチ処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct MergeConfig {
    /// 行の選択条件
    pub selection: Selection,

    /// ファイル名に使用する列名（空の場合は先頭列）
    pub name_columns: Vec<String>,

    /// 出力フォーマット
    pub output_format: OutputFormat,

    /// 出力フォルダー・アーカイブを作成するディレクトリ
    pub output_root: PathBuf,

    /// 日付形式
    pub date_format: DateFormat,

    /// 通貨として扱う記号（検索順）
    pub currency_symbols: Vec<char>,

    /// 外部コンバーターのプログラム名
    pub converter_program: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            selection: Selection::default(),
            name_columns: Vec::new(),
            output_format: OutputFormat::Pptx,
            output_root: PathBuf::from("."),
            date_format: DateFormat::DayMonthYear,
            currency_symbols: DEFAULT_CURRENCY_SYMBOLS.to_vec(),
            converter_program: DEFAULT_CONVERTER_PROGRAM.to_string(),
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `Merger`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use slidemerge::{MergerBuilder, OutputFormat, Selection};
///
/// # fn main() -> Result<(), slidemerge::SlideMergeError> {
/// let merger = MergerBuilder::new()
///     .with_selection(Selection::ByRange { start: 2, end: 10 })
///     .with_name_columns(["Store ID", "City"])
///     .with_output_format(OutputFormat::Pdf)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MergerBuilder {
    /// 内部設定（構築中）
    config: MergeConfig,
}

impl Default for MergerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MergerBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 行選択: シートの2行目のみ
    /// - ファイル名: 先頭列の値
    /// - 出力フォーマット: PPTX
    /// - 出力先: カレントディレクトリ
    /// - 日付形式: DD-MM-YYYY
    /// - 通貨記号: `€`, `$`, `£`
    /// - コンバーター: `libreoffice`
    pub fn new() -> Self {
        Self {
            config: MergeConfig::default(),
        }
    }

    /// 処理対象の行を選択する
    ///
    /// ```rust,no_run
    /// use slidemerge::{MergerBuilder, Selection};
    ///
    /// // シートの2〜20行目
    /// let builder = MergerBuilder::new()
    ///     .with_selection(Selection::ByRange { start: 2, end: 20 });
    ///
    /// // 先頭列の値で指定
    /// let builder = MergerBuilder::new()
    ///     .with_selection(Selection::from_identifier_list("1001, 1002"));
    /// ```
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.config.selection = selection;
        self
    }

    /// ファイル名に使用する列名を指定する（指定順に`_`で連結）
    pub fn with_name_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.name_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// 出力フォーマットを指定する
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// 出力先ディレクトリを指定する
    ///
    /// このディレクトリの下に`Presentations_<timestamp>/`フォルダーと
    /// `Presentations_<timestamp>.zip`が作成されます。
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_root = dir.into();
        self
    }

    /// 日付形式を指定する
    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.config.date_format = format;
        self
    }

    /// 通貨として扱う記号を指定する（先に指定したものが優先）
    pub fn with_currency_symbols<I: IntoIterator<Item = char>>(mut self, symbols: I) -> Self {
        self.config.currency_symbols = symbols.into_iter().collect();
        self
    }

    /// PDF変換に使用するプログラムを指定する
    pub fn with_converter_program(mut self, program: impl Into<String>) -> Self {
        self.config.converter_program = program.into();
        self
    }

    /// 設定を検証し、`Merger`インスタンスを構築する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Merger)` - 設定が有効な場合
    /// * `Err(SlideMergeError::Config)` - 設定が無効な場合
    pub fn build(self) -> Result<Merger, SlideMergeError> {
        // 1. 行選択の検証
        match &self.config.selection {
            Selection::ByRange { start, end } => {
                if *start == 0 {
                    return Err(SlideMergeError::Config(
                        "Row numbers start at 1".to_string(),
                    ));
                }
                if start > end {
                    return Err(SlideMergeError::Config(format!(
                        "Invalid range: start row ({}) > end row ({})",
                        start, end
                    )));
                }
            }
            Selection::ByIdentifier(ids) => {
                if ids.iter().all(|id| id.trim().is_empty()) {
                    return Err(SlideMergeError::Config(
                        "Identifier list is empty".to_string(),
                    ));
                }
            }
        }

        // 2. カスタム日付形式の検証
        if let DateFormat::Custom(ref format_str) = self.config.date_format {
            if format_str.is_empty()
                || StrftimeItems::new(format_str).any(|item| matches!(item, Item::Error))
            {
                return Err(SlideMergeError::Config(format!(
                    "Invalid date format string: '{}'",
                    format_str
                )));
            }
        }

        // 3. 通貨記号とコンバーターの検証
        if self.config.currency_symbols.is_empty() {
            return Err(SlideMergeError::Config(
                "At least one currency symbol is required".to_string(),
            ));
        }
        if self.config.converter_program.trim().is_empty() {
            return Err(SlideMergeError::Config(
                "Converter program must not be empty".to_string(),
            ));
        }

        // 4. Mergerインスタンス生成
        Ok(Merger::new(self.config))
    }
}

/// 1行処理するごとに通知される進捗
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// 処理済みの行数
    pub completed: usize,
    /// 処理対象の行数
    pub total: usize,
    /// バッチ開始からの経過時間
    pub elapsed: Duration,
}

/// PDF変換に失敗したファイル
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionFailure {
    /// 残されたPPTXファイル名
    pub file: String,
    /// 失敗の理由
    pub reason: String,
}

/// バッチ処理の結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// 出力フォルダー（`Presentations_<timestamp>/`）
    pub output_dir: PathBuf,
    /// 出力アーカイブ（`Presentations_<timestamp>.zip`）
    pub archive: PathBuf,
    /// 出力フォーマット
    pub format: String,
    /// アーカイブに格納したファイル名（処理順）
    pub files: Vec<String>,
    /// PDF変換に失敗したファイル
    pub conversion_failures: Vec<ConversionFailure>,
    /// 処理時間（秒）
    pub elapsed_seconds: f64,
}

/// 生成前の確認情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    /// データ表のヘッダー
    pub headers: Vec<String>,
    /// データ行数
    pub data_rows: usize,
    /// 先頭データ行から生成されるファイル名の例
    pub example_file_name: Option<String>,
    /// テンプレート中のプレースホルダー
    pub placeholders: Vec<String>,
    /// 対応する列がないプレースホルダー（置換されずに残る）
    pub unmatched_placeholders: Vec<String>,
}

/// バッチ処理のファサード
///
/// テンプレートとデータ表から、選択された行ごとに1つのドキュメントを生成します。
///
/// # 使用例
///
/// ```rust,no_run
/// use std::fs::File;
/// use slidemerge::{MergerBuilder, Selection};
///
/// # fn main() -> Result<(), slidemerge::SlideMergeError> {
/// let merger = MergerBuilder::new()
///     .with_selection(Selection::ByRange { start: 2, end: 4 })
///     .build()?;
/// let report = merger.run(
///     File::open("template.pptx")?,
///     File::open("stores.xlsx")?,
///     |p| eprintln!("{}/{}", p.completed, p.total),
/// )?;
/// println!("{}", report.archive.display());
/// # Ok(())
/// # }
/// ```
pub struct Merger {
    config: MergeConfig,

    formatter: CellFormatter,

    converter: Box<dyn DocumentConverter>,
}

impl fmt::Debug for Merger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Merger")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Merger {
    pub(crate) fn new(config: MergeConfig) -> Self {
        let converter = LibreOfficeConverter::new(config.converter_program.clone());
        Self {
            config,
            formatter: CellFormatter::new(),
            converter: Box::new(converter),
        }
    }

    /// PDF変換に使用するコンバーターを差し替える
    pub fn with_converter<C: DocumentConverter + 'static>(mut self, converter: C) -> Self {
        self.converter = Box::new(converter);
        self
    }

    /// 出力フォーマット
    pub fn output_format(&self) -> OutputFormat {
        self.config.output_format
    }

    /// バッチ処理を実行する
    ///
    /// # 引数
    ///
    /// * `template` - PPTXテンプレート
    /// * `data` - XLSXデータソース（先頭シートを使用）
    /// * `progress` - 1行処理するごとに呼び出されるコールバック
    ///
    /// # 戻り値
    ///
    /// * `Ok(BatchReport)` - すべての行の処理とアーカイブの作成に成功した場合
    /// * `Err(SlideMergeError::EmptySelection)` - 選択条件に一致する行がない場合（出力なし）
    /// * `Err(SlideMergeError)` - 読み込み・置換・保存に失敗した場合（バッチを中断）
    pub fn run<T, D, F>(
        &self,
        template: T,
        data: D,
        mut progress: F,
    ) -> Result<BatchReport, SlideMergeError>
    where
        T: Read,
        D: Read,
        F: FnMut(&Progress),
    {
        let started = Instant::now();

        // 1. データ表の読み込みと行選択
        let table = WorkbookParser::open(data)?.load_table()?;
        let rows = RowSelector::new(&self.formatter, &self.config).select(&table, &self.config.selection)?;

        // 2. テンプレートの読み込み
        let template = Template::load(template)?;
        for token in unmatched_placeholders(&template.placeholders()?, table.column_count()) {
            tracing::warn!(%token, "placeholder has no matching column and will be left as is");
        }

        let name_columns = self.name_columns(&table);
        let total = rows.len();
        let format = self.config.output_format;
        tracing::info!(
            rows = total,
            %format,
            estimated_seconds = total as u64 * format.estimated_seconds_per_file(),
            "starting batch"
        );

        // 3. 出力フォルダー
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let (output_dir, run_name) = create_run_dir(&self.config.output_root, &timestamp)?;

        // 4. 行ごとの処理
        let names = FileNameBuilder::new(&self.formatter, &self.config);
        let mut unique = UniqueNames::new();
        let mut produced = Vec::with_capacity(total);
        let mut conversion_failures = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            let values = self.display_values(row, &table);
            let document = template.render(&values)?;

            let base = unique.assign(names.build(row, &table, &name_columns), row.sheet_row);
            let pptx_path = output_dir.join(format!("{}.{}", base, OutputFormat::Pptx.extension()));
            fs::write(&pptx_path, document)?;

            let output = match format {
                OutputFormat::Pptx => pptx_path,
                OutputFormat::Pdf => match self.converter.convert(&pptx_path, &output_dir) {
                    Ok(pdf_path) => {
                        fs::remove_file(&pptx_path)?;
                        pdf_path
                    }
                    Err(e) => {
                        tracing::warn!(file = %pptx_path.display(), error = %e, "PDF conversion failed; keeping PPTX");
                        conversion_failures.push(ConversionFailure {
                            file: file_name(&pptx_path),
                            reason: e.to_string(),
                        });
                        pptx_path
                    }
                },
            };

            tracing::debug!(sheet_row = row.sheet_row, file = %output.display(), "document written");
            produced.push(output);

            progress(&Progress {
                completed: index + 1,
                total,
                elapsed: started.elapsed(),
            });
        }

        // 5. アーカイブ
        let archive = self.config.output_root.join(format!("{}.zip", run_name));
        write_archive(&archive, &produced)?;

        let elapsed = started.elapsed();
        tracing::info!(
            files = produced.len(),
            failures = conversion_failures.len(),
            archive = %archive.display(),
            elapsed_seconds = elapsed.as_secs(),
            "batch complete"
        );

        Ok(BatchReport {
            output_dir,
            archive,
            format: format.to_string(),
            files: produced.iter().map(|p| file_name(p)).collect(),
            conversion_failures,
            elapsed_seconds: elapsed.as_secs_f64(),
        })
    }

    /// 生成を行わずに、ファイル名の例とプレースホルダーを確認する
    pub fn preview<T: Read, D: Read>(&self, template: T, data: D) -> Result<Preview, SlideMergeError> {
        let table = WorkbookParser::open(data)?.load_table()?;
        let template = Template::load(template)?;

        let placeholders = template.placeholders()?;
        let unmatched = unmatched_placeholders(&placeholders, table.column_count());
        let example_file_name = FileNameBuilder::new(&self.formatter, &self.config)
            .preview(&table, &self.name_columns(&table));

        Ok(Preview {
            data_rows: table.rows.len(),
            headers: table.headers,
            example_file_name,
            placeholders,
            unmatched_placeholders: unmatched,
        })
    }

    /// ファイル名に使用する列（未指定の場合は先頭列）
    fn name_columns(&self, table: &Table) -> Vec<String> {
        if !self.config.name_columns.is_empty() {
            for name in &self.config.name_columns {
                if table.column_index(name).is_none() {
                    tracing::warn!(column = %name, "naming column not found in header row");
                }
            }
            return self.config.name_columns.clone();
        }
        table.headers.iter().take(1).cloned().collect()
    }

    /// 行の表示文字列（列記号 -> 文字列）
    fn display_values(&self, row: &Row, table: &Table) -> HashMap<String, String> {
        let columns = table.column_count().max(row.cells.len());
        (0..columns)
            .map(|col| {
                let value = row
                    .cell(col)
                    .map(|cell| self.formatter.format_cell(cell, &self.config))
                    .unwrap_or_default();
                (column_letter(col as u32), value)
            })
            .collect()
    }
}

/// 対応する列がないプレースホルダーを抽出
fn unmatched_placeholders(placeholders: &[String], column_count: usize) -> Vec<String> {
    placeholders
        .iter()
        .filter(|token| {
            let letters = token.trim_start_matches('{').trim_end_matches('}');
            column_index(letters).map_or(true, |col| col as usize >= column_count)
        })
        .cloned()
        .collect()
}

/// 実行ごとの出力フォルダーを作成する
///
/// 同じ秒に開始した別の実行とフォルダー・アーカイブを共有しないよう、
/// 既に存在する場合は`_2`, `_3`, … を付加します。
fn create_run_dir(root: &Path, timestamp: &str) -> Result<(PathBuf, String), SlideMergeError> {
    fs::create_dir_all(root)?;

    let mut name = format!("{}{}", OUTPUT_PREFIX, timestamp);
    let mut attempt = 1;
    loop {
        if !root.join(format!("{}.zip", name)).exists() {
            let dir = root.join(&name);
            match fs::create_dir(&dir) {
                Ok(()) => return Ok((dir, name)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
        }
        attempt += 1;
        name = format!("{}{}_{}", OUTPUT_PREFIX, timestamp, attempt);
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
