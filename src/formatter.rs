//! Formatter Module
//!
//! セル値を表示用文字列に変換するモジュール。
//! 通貨・パーセント・通常数値の判定はセルの書式文字列（Number Format String）に基づき、
//! 値そのものからは判定しません。

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::api::DateFormat;
use crate::builder::MergeConfig;
use crate::types::{Cell, CellValue};

/// Excelシリアル値として扱える上限（9999-12-31）
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// 書式文字列から判定した数値の表示区分
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FormatClass {
    /// 通貨（記号を末尾に付加）
    Currency(char),
    /// パーセント（100倍して`%`を付加）
    Percentage,
    /// 通常の数値
    Plain,
}

impl FormatClass {
    /// 書式文字列から表示区分を判定
    ///
    /// `[$£-809]`のようなロケール通貨タグがあれば、その記号を優先します。
    /// `[$-409]`や`[Red]`などの他の`[...]`セクションは判定に使いません。
    /// 残りの書式文字列から通貨記号を`symbols`の順に検索し、最初に見つかった記号を採用します。
    /// 通貨記号がない場合に`%`を含めばパーセントとして扱います。
    pub fn classify(format_code: Option<&str>, symbols: &[char]) -> Self {
        let Some(code) = format_code else {
            return FormatClass::Plain;
        };

        let (tag_symbols, body) = split_bracket_sections(code);
        if let Some(symbol) = symbols.iter().find(|s| tag_symbols.contains(**s)) {
            return FormatClass::Currency(*symbol);
        }
        if let Some(symbol) = symbols.iter().find(|s| body.contains(**s)) {
            return FormatClass::Currency(*symbol);
        }

        if body.contains('%') {
            FormatClass::Percentage
        } else {
            FormatClass::Plain
        }
    }
}

/// 書式文字列を`[...]`セクションと本体に分離
///
/// 戻り値は（ロケール通貨タグの記号部分, 角括弧の外側の文字列）です。
/// `[$€-407]`からは`€`、`[$-409]`からは空文字列を取り出します。
fn split_bracket_sections(code: &str) -> (String, String) {
    let mut tag_symbols = String::new();
    let mut body = String::with_capacity(code.len());
    let mut rest = code;

    while let Some(open) = rest.find('[') {
        body.push_str(&rest[..open]);
        let section = &rest[open + 1..];
        let Some(close) = section.find(']') else {
            // 閉じていない角括弧はそのまま本体として扱う
            body.push_str(&rest[open..]);
            return (tag_symbols, body);
        };
        if let Some(tag) = section[..close].strip_prefix('$') {
            tag_symbols.push_str(tag.split('-').next().unwrap_or_default());
        }
        rest = &section[close + 1..];
    }

    body.push_str(rest);
    (tag_symbols, body)
}

/// セルフォーマッター
///
/// セル値のフォーマット処理のファサードとして機能します。
#[derive(Debug)]
pub(crate) struct CellFormatter {
    /// 日付フォーマッター
    date_formatter: DateFormatter,

    /// 数値フォーマッター
    number_formatter: NumberFormatter,
}

impl CellFormatter {
    /// 新しいCellFormatterインスタンスを生成
    pub fn new() -> Self {
        Self {
            date_formatter: DateFormatter,
            number_formatter: NumberFormatter,
        }
    }

    /// プレースホルダーに埋め込む表示文字列を生成
    ///
    /// # 規則（優先順）
    ///
    /// 1. 空セル → 空文字列
    /// 2. 数値 + 書式に通貨記号 → 小数1桁に丸め、末尾の`0`/`.`を除去し、空白と記号を付加
    /// 3. 数値 + 書式に`%` → 100倍して小数1桁に丸め、整数なら小数なしで`%`を付加
    /// 4. その他の数値 → 小数1桁に丸め、末尾の`0`/`.`を除去
    /// 5. 日付 → 設定された日付形式（デフォルト: DD-MM-YYYY）
    /// 6. それ以外 → 文字列そのもの
    pub fn format_cell(&self, cell: &Cell, config: &MergeConfig) -> String {
        match &cell.value {
            CellValue::Empty => String::new(),

            CellValue::Integer(_) | CellValue::Decimal(_) => {
                let value = cell.value.as_number().unwrap_or_default();
                let class =
                    FormatClass::classify(cell.format_code.as_deref(), &config.currency_symbols);
                self.number_formatter.format(value, &class)
            }

            CellValue::Date(date) => self.date_formatter.format(date, &config.date_format),

            CellValue::Text(s) => s.clone(),
        }
    }

    /// ファイル名の構成要素として値を文字列化
    ///
    /// 小数部のない数値は整数として表記します（例: `5.0` → `"5"`）。
    /// 丸めや通貨記号の付加は行いません。
    pub fn format_name_part(&self, value: &CellValue, config: &MergeConfig) -> String {
        match value {
            CellValue::Empty => String::new(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Decimal(f) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{}", *f as i64)
                } else {
                    f.to_string()
                }
            }
            CellValue::Date(date) => self.date_formatter.format(date, &config.date_format),
            CellValue::Text(s) => s.clone(),
        }
    }
}

impl Default for CellFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// 日付フォーマッター
///
/// Excelのシリアル日付値の変換と、日付の文字列化を担当します。
#[derive(Debug)]
pub(crate) struct DateFormatter;

impl DateFormatter {
    /// シリアル値を日時に変換
    ///
    /// # エポックシステム
    ///
    /// - 1900年システム（デフォルト）: 1899年12月30日起算
    ///   - Excelは1900年2月29日（シリアル値60）が存在するものとして扱うため、
    ///     シリアル値60未満は1日ずらして補正する
    ///   - シリアル値1 = 1900年1月1日、シリアル値61 = 1900年3月1日
    /// - 1904年システム: 1904年1月1日起算（Mac版Excel）
    ///   - シリアル値0 = 1904年1月1日
    ///
    /// 範囲外の値の場合は`None`を返します。
    pub fn from_serial(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
        if !serial.is_finite() || !(0.0..=MAX_EXCEL_SERIAL).contains(&serial) {
            return None;
        }

        let (epoch, days_offset) = if is_1904 {
            (NaiveDate::from_ymd_opt(1904, 1, 1)?, 0i64)
        } else if serial < 60.0 {
            (NaiveDate::from_ymd_opt(1899, 12, 30)?, 1i64)
        } else {
            (NaiveDate::from_ymd_opt(1899, 12, 30)?, 0i64)
        };

        let days = serial.floor();
        let seconds = ((serial - days) * 86_400.0).round() as i64;

        epoch
            .and_hms_opt(0, 0, 0)?
            .checked_add_signed(Duration::days(days as i64 + days_offset))?
            .checked_add_signed(Duration::seconds(seconds))
    }

    /// 日時を設定された形式で文字列化
    pub fn format(&self, date: &NaiveDateTime, format: &DateFormat) -> String {
        date.format(format.pattern()).to_string()
    }
}

/// 数値フォーマッター
///
/// 小数1桁への丸め（0から遠い方向への四捨五入）を行ってから文字列化します。
#[derive(Debug)]
pub(crate) struct NumberFormatter;

impl NumberFormatter {
    /// 表示区分に従って数値をフォーマット
    pub fn format(&self, value: f64, class: &FormatClass) -> String {
        match class {
            FormatClass::Currency(symbol) => format!("{} {}", self.format_plain(value), symbol),
            FormatClass::Percentage => self.format_percentage(value),
            FormatClass::Plain => self.format_plain(value),
        }
    }

    /// 小数1桁に丸め、末尾の`0`と小数点を除去
    fn format_plain(&self, value: f64) -> String {
        let text = format!("{:.1}", normalize_zero(round_one_decimal(value)));
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }

    /// 100倍して小数1桁に丸め、`%`を付加
    fn format_percentage(&self, value: f64) -> String {
        let percentage = normalize_zero(round_one_decimal(value * 100.0));
        if percentage.fract() == 0.0 {
            format!("{:.0}%", percentage)
        } else {
            format!("{:.1}%", percentage)
        }
    }
}

/// 小数1桁に丸める（0.05は0から遠い方向へ）
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `-0.0`を`0.0`に正規化
fn normalize_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYMBOLS: [char; 3] = ['€', '$', '£'];

    fn config() -> MergeConfig {
        MergeConfig::default()
    }

    fn number_cell(value: f64, format_code: &str) -> Cell {
        Cell::new(CellValue::Decimal(value), Some(format_code.to_string()))
    }

    #[test]
    fn test_classify_currency() {
        assert_eq!(
            FormatClass::classify(Some("#,##0.00\\ \"€\""), &SYMBOLS),
            FormatClass::Currency('€')
        );
        assert_eq!(
            FormatClass::classify(Some("[$£-809]#,##0.00"), &SYMBOLS),
            FormatClass::Currency('£')
        );
        assert_eq!(
            FormatClass::classify(Some("$#,##0_);($#,##0)"), &SYMBOLS),
            FormatClass::Currency('$')
        );
    }

    #[test]
    fn test_classify_locale_tags() {
        // ロケールのみのタグは通貨ではない
        assert_eq!(FormatClass::classify(Some("[$-409]#,##0"), &SYMBOLS), FormatClass::Plain);
        assert_eq!(
            FormatClass::classify(Some("[$-409]0.0%"), &SYMBOLS),
            FormatClass::Percentage
        );
        assert_eq!(
            FormatClass::classify(Some("[$€-407] #,##0.00"), &SYMBOLS),
            FormatClass::Currency('€')
        );
        assert_eq!(
            FormatClass::classify(Some("[$$-409]#,##0.00"), &SYMBOLS),
            FormatClass::Currency('$')
        );
        assert_eq!(
            FormatClass::classify(Some("[Red]$#,##0.00"), &SYMBOLS),
            FormatClass::Currency('$')
        );
        assert_eq!(
            FormatClass::classify(Some("[$-F800]dddd, mmmm dd, yyyy"), &SYMBOLS),
            FormatClass::Plain
        );
    }

    #[test]
    fn test_split_bracket_sections() {
        assert_eq!(
            split_bracket_sections("[$£-809]#,##0.00"),
            ("£".to_string(), "#,##0.00".to_string())
        );
        assert_eq!(
            split_bracket_sections("[Red][$-409]0%"),
            (String::new(), "0%".to_string())
        );
        assert_eq!(
            split_bracket_sections("0.0[$"),
            (String::new(), "0.0[$".to_string())
        );
    }

    #[test]
    fn test_format_cell_pound_locale_tag() {
        let formatter = CellFormatter::new();
        assert_eq!(
            formatter.format_cell(&number_cell(12.34, "[$£-809]#,##0.00"), &config()),
            "12.3 £"
        );
        assert_eq!(
            formatter.format_cell(&number_cell(12.34, "[$-409]#,##0.00"), &config()),
            "12.3"
        );
    }

    #[test]
    fn test_classify_currency_wins_over_percent() {
        assert_eq!(
            FormatClass::classify(Some("0.0%\"€\""), &SYMBOLS),
            FormatClass::Currency('€')
        );
    }

    #[test]
    fn test_classify_percentage_and_plain() {
        assert_eq!(
            FormatClass::classify(Some("0.00%"), &SYMBOLS),
            FormatClass::Percentage
        );
        assert_eq!(FormatClass::classify(Some("#,##0"), &SYMBOLS), FormatClass::Plain);
        assert_eq!(FormatClass::classify(Some("General"), &SYMBOLS), FormatClass::Plain);
        assert_eq!(FormatClass::classify(None, &SYMBOLS), FormatClass::Plain);
    }

    #[test]
    fn test_classify_respects_configured_symbols() {
        assert_eq!(
            FormatClass::classify(Some("#,##0 \"€\""), &['$']),
            FormatClass::Plain
        );
    }

    #[test]
    fn test_format_plain_numbers() {
        let formatter = NumberFormatter;
        assert_eq!(formatter.format(5.0, &FormatClass::Plain), "5");
        assert_eq!(formatter.format(5.25, &FormatClass::Plain), "5.3");
        assert_eq!(formatter.format(5.10, &FormatClass::Plain), "5.1");
        assert_eq!(formatter.format(-2.0, &FormatClass::Plain), "-2");
        assert_eq!(formatter.format(100.0, &FormatClass::Plain), "100");
        assert_eq!(formatter.format(0.0, &FormatClass::Plain), "0");
        assert_eq!(formatter.format(-0.04, &FormatClass::Plain), "0");
        assert_eq!(formatter.format(1234.56, &FormatClass::Plain), "1234.6");
    }

    #[test]
    fn test_format_currency() {
        let formatter = NumberFormatter;
        assert_eq!(formatter.format(9.999, &FormatClass::Currency('€')), "10 €");
        assert_eq!(formatter.format(12.34, &FormatClass::Currency('$')), "12.3 $");
        assert_eq!(formatter.format(-3.0, &FormatClass::Currency('£')), "-3 £");
    }

    #[test]
    fn test_format_percentage() {
        let formatter = NumberFormatter;
        assert_eq!(formatter.format(0.5, &FormatClass::Percentage), "50%");
        assert_eq!(formatter.format(0.505, &FormatClass::Percentage), "50.5%");
        assert_eq!(formatter.format(1.0, &FormatClass::Percentage), "100%");
        assert_eq!(formatter.format(0.12345, &FormatClass::Percentage), "12.3%");
        assert_eq!(formatter.format(-0.25, &FormatClass::Percentage), "-25%");
        assert_eq!(formatter.format(-0.0001, &FormatClass::Percentage), "0%");
    }

    #[test]
    fn test_format_cell_same_value_different_formats() {
        let formatter = CellFormatter::new();
        let config = config();
        assert_eq!(formatter.format_cell(&number_cell(0.5, "0%"), &config), "50%");
        assert_eq!(
            formatter.format_cell(&number_cell(0.5, "#,##0.00 \"€\""), &config),
            "0.5 €"
        );
        assert_eq!(formatter.format_cell(&number_cell(0.5, "0.00"), &config), "0.5");
    }

    #[test]
    fn test_format_cell_integer() {
        let formatter = CellFormatter::new();
        let cell = Cell::new(CellValue::Integer(42), Some("0%".to_string()));
        assert_eq!(formatter.format_cell(&cell, &config()), "4200%");
        assert_eq!(
            formatter.format_cell(&Cell::plain(CellValue::Integer(7)), &config()),
            "7"
        );
    }

    #[test]
    fn test_format_cell_empty_and_text() {
        let formatter = CellFormatter::new();
        assert_eq!(formatter.format_cell(&Cell::plain(CellValue::Empty), &config()), "");
        let text = Cell::new(
            CellValue::Text("Milano Centro".to_string()),
            Some("0.00%".to_string()),
        );
        assert_eq!(formatter.format_cell(&text, &config()), "Milano Centro");
    }

    #[test]
    fn test_format_cell_date() {
        let formatter = CellFormatter::new();
        let date = NaiveDate::from_ymd_opt(2025, 1, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let cell = Cell::new(CellValue::Date(date), Some("dd/mm/yyyy".to_string()));
        assert_eq!(formatter.format_cell(&cell, &config()), "05-01-2025");

        let iso = MergeConfig {
            date_format: DateFormat::Iso8601,
            ..Default::default()
        };
        assert_eq!(formatter.format_cell(&cell, &iso), "2025-01-05");
    }

    #[test]
    fn test_format_name_part() {
        let formatter = CellFormatter::new();
        let config = config();
        assert_eq!(formatter.format_name_part(&CellValue::Decimal(5.0), &config), "5");
        assert_eq!(formatter.format_name_part(&CellValue::Decimal(5.25), &config), "5.25");
        assert_eq!(formatter.format_name_part(&CellValue::Integer(-3), &config), "-3");
        assert_eq!(
            formatter.format_name_part(&CellValue::Text("East".to_string()), &config),
            "East"
        );
        assert_eq!(formatter.format_name_part(&CellValue::Empty, &config), "");
    }

    #[test]
    fn test_from_serial_1900() {
        let date = |s| DateFormatter::from_serial(s, false).unwrap().date();
        assert_eq!(date(1.0), NaiveDate::from_ymd_opt(1900, 1, 1).unwrap());
        assert_eq!(date(59.0), NaiveDate::from_ymd_opt(1900, 2, 28).unwrap());
        assert_eq!(date(61.0), NaiveDate::from_ymd_opt(1900, 3, 1).unwrap());
        assert_eq!(date(45658.0), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn test_from_serial_time_fraction() {
        let dt = DateFormatter::from_serial(45658.5, false).unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2025-01-01 12:00");
    }

    #[test]
    fn test_from_serial_1904() {
        let date = |s| DateFormatter::from_serial(s, true).unwrap().date();
        assert_eq!(date(0.0), NaiveDate::from_ymd_opt(1904, 1, 1).unwrap());
        assert_eq!(date(366.0), NaiveDate::from_ymd_opt(1905, 1, 1).unwrap());
    }

    #[test]
    fn test_from_serial_out_of_range() {
        assert!(DateFormatter::from_serial(-1.0, false).is_none());
        assert!(DateFormatter::from_serial(f64::NAN, false).is_none());
        assert!(DateFormatter::from_serial(3_000_000.0, false).is_none());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// 通常数値: 小数1桁に丸めた値と一致し、末尾に`.0`が残らないこと
            #[test]
            fn test_plain_matches_rounded_value(value in -1.0e9f64..1.0e9) {
                let text = NumberFormatter.format(value, &FormatClass::Plain);
                prop_assert!(!text.ends_with(".0"));
                prop_assert!(!text.ends_with('.'));
                let parsed: f64 = text.parse().unwrap();
                prop_assert!((parsed - round_one_decimal(value)).abs() < 1e-6);
            }

            /// 通貨: 通常数値の表記 + 空白 + 記号であること
            #[test]
            fn test_currency_is_plain_plus_symbol(value in -1.0e9f64..1.0e9) {
                let plain = NumberFormatter.format(value, &FormatClass::Plain);
                let currency = NumberFormatter.format(value, &FormatClass::Currency('€'));
                prop_assert_eq!(currency, format!("{} €", plain));
            }

            /// パーセント: 整数なら小数点なし、それ以外は小数1桁
            #[test]
            fn test_percentage_shape(value in -100.0f64..100.0) {
                let text = NumberFormatter.format(value, &FormatClass::Percentage);
                prop_assert!(text.ends_with('%'));
                let body = &text[..text.len() - 1];
                match body.split_once('.') {
                    Some((_, decimals)) => {
                        prop_assert_eq!(decimals.len(), 1);
                        prop_assert_ne!(decimals, "0");
                    }
                    None => prop_assert!(body.parse::<i64>().is_ok()),
                }
            }
        }
    }
}
