//! XML Metadata Parser Module
//!
//! XLSX内部のXMLファイルから、calamineで取得不可能な情報を抽出するモジュール。
//! 先頭シートのセルごとのNumber Format Stringと、1904年エポック判定を提供します。

use std::collections::HashMap;
use std::io::{Read, Seek};

use quick_xml::escape::unescape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::SlideMergeError;
use crate::security::SecurityConfig;
use crate::types::column_index;

/// セルスタイル情報（cellXfs要素）
#[derive(Debug, Clone)]
pub(crate) struct CellXf {
    pub num_fmt_id: u32,
}

/// ワークブック内のシート定義
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SheetEntry {
    /// シート名
    pub name: String,
    /// ワークシートパートのパス（例: `xl/worksheets/sheet1.xml`）
    pub path: Option<String>,
}

/// XLSXメタデータパーサー
///
/// XLSXファイル（ZIPアーカイブ）からXMLを直接解析し、
/// calamineで取得できない書式情報を抽出します。
#[derive(Debug, Clone)]
pub(crate) struct XlsxMetadataParser {
    /// numFmtId -> formatCode のマッピング（カスタム書式のみ）
    num_formats: HashMap<u32, String>,
    /// styleId -> CellXf のマッピング
    cell_xfs: Vec<CellXf>,
    /// ワークブック順で先頭のシート
    first_sheet: Option<SheetEntry>,
    /// 先頭シートのセル座標(0始まり) -> styleId のマッピング
    cell_styles: HashMap<(u32, u32), u32>,
    /// 1904年エポックを使用するかどうか
    is_1904: bool,
}

impl XlsxMetadataParser {
    /// XLSXファイル（ZIPアーカイブ）からメタデータを解析
    pub fn new<R: Read + Seek>(xlsx_reader: R) -> Result<Self, SlideMergeError> {
        let mut archive = ZipArchive::new(xlsx_reader)?;
        SecurityConfig::default().check_archive(&mut archive)?;

        // 1. xl/styles.xml
        let (num_formats, cell_xfs) = Self::parse_styles(&mut archive)?;

        // 2. xl/workbook.xml とリレーションシップ
        let (is_1904, declared) = Self::parse_workbook(&mut archive)?;
        let rels = match read_part(&mut archive, "xl/_rels/workbook.xml.rels")? {
            Some(xml) => parse_relationships(&xml, "xl/_rels/workbook.xml.rels")?,
            None => HashMap::new(),
        };
        let first_sheet = declared.into_iter().next().map(|(name, rel_id)| SheetEntry {
            name,
            path: rel_id
                .and_then(|id| rels.get(&id))
                .map(|target| resolve_target(target)),
        });

        // 3. 先頭ワークシートのセルスタイル
        let mut cell_styles = HashMap::new();
        if let Some(path) = first_sheet.as_ref().and_then(|s| s.path.as_deref()) {
            if let Some(xml) = read_part(&mut archive, path)? {
                cell_styles = Self::parse_worksheet_styles(&xml, path)?;
            }
        }

        Ok(Self {
            num_formats,
            cell_xfs,
            first_sheet,
            cell_styles,
            is_1904,
        })
    }

    /// styleIdからNumber Format Stringを取得
    ///
    /// # 戻り値
    ///
    /// * `Some(&str)` - フォーマット文字列が見つかった場合
    /// * `None` - スタイルIDが範囲外、またはフォーマットが見つからない場合
    pub fn get_format_string(&self, style_id: u32) -> Option<&str> {
        self.cell_xfs.get(style_id as usize).and_then(|xf| {
            // ビルトイン書式ID（0-163）の場合はハードコードマッピングを使用
            if xf.num_fmt_id < 164 {
                get_builtin_format(xf.num_fmt_id)
                    .or_else(|| self.num_formats.get(&xf.num_fmt_id).map(|s| s.as_str()))
            } else {
                self.num_formats.get(&xf.num_fmt_id).map(|s| s.as_str())
            }
        })
    }

    /// 先頭シートの指定セル（0始まり）のNumber Format Stringを取得
    pub fn format_code_at(&self, row: u32, col: u32) -> Option<&str> {
        let style_id = self.cell_styles.get(&(row, col))?;
        self.get_format_string(*style_id)
    }

    /// ワークブック順で先頭のシート
    pub fn first_sheet(&self) -> Option<&SheetEntry> {
        self.first_sheet.as_ref()
    }

    /// 1904年エポックを使用するかどうかを取得
    pub fn is_1904(&self) -> bool {
        self.is_1904
    }

    /// xl/styles.xml の解析（プライベート）
    ///
    /// `<numFmts>` と `<cellXfs>` を解析し、Number Format Stringのマッピングを構築します。
    /// `<numFmt>`と`<xf>`は自己終了タグであることが多いため、Start/Emptyの両方を処理します。
    fn parse_styles<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
    ) -> Result<(HashMap<u32, String>, Vec<CellXf>), SlideMergeError> {
        const PART: &str = "xl/styles.xml";
        let mut num_formats = HashMap::new();
        let mut cell_xfs = Vec::new();

        let Some(xml_content) = read_part(archive, PART)? else {
            return Ok((num_formats, cell_xfs));
        };

        let mut reader = Reader::from_reader(xml_content.as_slice());
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut in_num_fmts = false;
        let mut in_cell_xfs = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"numFmts" => in_num_fmts = true,
                    b"cellXfs" => in_cell_xfs = true,
                    b"numFmt" if in_num_fmts => read_num_fmt(&e, &mut num_formats, PART)?,
                    b"xf" if in_cell_xfs => cell_xfs.push(read_xf(&e, PART)?),
                    _ => {}
                },
                Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                    b"numFmt" if in_num_fmts => read_num_fmt(&e, &mut num_formats, PART)?,
                    b"xf" if in_cell_xfs => cell_xfs.push(read_xf(&e, PART)?),
                    _ => {}
                },
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"numFmts" => in_num_fmts = false,
                    b"cellXfs" => in_cell_xfs = false,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(PART, e)),
                _ => {}
            }
            buf.clear();
        }

        Ok((num_formats, cell_xfs))
    }

    /// xl/workbook.xml の解析（プライベート）
    ///
    /// `<workbookPr date1904="1"/>` と `<sheet name=".." r:id=".."/>` を取得します。
    #[allow(clippy::type_complexity)]
    fn parse_workbook<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
    ) -> Result<(bool, Vec<(String, Option<String>)>), SlideMergeError> {
        const PART: &str = "xl/workbook.xml";
        let mut is_1904 = false;
        let mut sheets = Vec::new();

        let Some(xml_content) = read_part(archive, PART)? else {
            return Ok((is_1904, sheets));
        };

        let mut reader = Reader::from_reader(xml_content.as_slice());
        reader.trim_text(true);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                    b"workbookPr" => {
                        for attr in e.attributes() {
                            let attr = attr.map_err(|e| attr_error(PART, e))?;
                            if attr.key.local_name().as_ref() == b"date1904" {
                                let value = std::str::from_utf8(&attr.value)?;
                                is_1904 = value == "1" || value == "true";
                            }
                        }
                    }
                    b"sheet" => {
                        let mut name = None;
                        let mut rel_id = None;
                        for attr in e.attributes() {
                            let attr = attr.map_err(|e| attr_error(PART, e))?;
                            match attr.key.local_name().as_ref() {
                                b"name" => name = Some(unescaped(&attr, PART)?),
                                b"id" => rel_id = Some(unescaped(&attr, PART)?),
                                _ => {}
                            }
                        }
                        if let Some(name) = name {
                            sheets.push((name, rel_id));
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(PART, e)),
                _ => {}
            }
            buf.clear();
        }

        Ok((is_1904, sheets))
    }

    /// ワークシートXMLからセル座標ごとのstyleIdを収集
    ///
    /// `r`属性を省略した行は直前の行の次の行、
    /// `r`属性を省略したセルは同じ行の直前のセルの次の列として扱います。
    fn parse_worksheet_styles(
        xml_content: &[u8],
        part: &str,
    ) -> Result<HashMap<(u32, u32), u32>, SlideMergeError> {
        let mut reader = Reader::from_reader(xml_content);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut styles = HashMap::new();
        let mut current_row: u32 = 0;
        let mut next_col: u32 = 0;
        let mut seen_row = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                    b"row" => {
                        next_col = 0;
                        let mut explicit_row = None;
                        for attr in e.attributes() {
                            let attr = attr.map_err(|e| attr_error(part, e))?;
                            if attr.key.local_name().as_ref() == b"r" {
                                // Excelの行番号は1始まりなので、0始まりに変換
                                let r: u32 = std::str::from_utf8(&attr.value)?.parse()?;
                                explicit_row = Some(r.saturating_sub(1));
                            }
                        }
                        current_row = match explicit_row {
                            Some(row) => row,
                            None if seen_row => current_row + 1,
                            None => 0,
                        };
                        seen_row = true;
                    }
                    b"c" => {
                        let mut coord = None;
                        let mut style_id = None;
                        for attr in e.attributes() {
                            let attr = attr.map_err(|e| attr_error(part, e))?;
                            match attr.key.local_name().as_ref() {
                                b"r" => coord = parse_cell_ref(std::str::from_utf8(&attr.value)?),
                                b"s" => {
                                    style_id = Some(std::str::from_utf8(&attr.value)?.parse()?)
                                }
                                _ => {}
                            }
                        }
                        let (row, col) = coord.unwrap_or((current_row, next_col));
                        next_col = col + 1;
                        if let Some(style_id) = style_id {
                            styles.insert((row, col), style_id);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_error(part, e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(styles)
    }
}

/// `<numFmt numFmtId="165" formatCode="0.000"/>`
fn read_num_fmt(
    e: &BytesStart<'_>,
    num_formats: &mut HashMap<u32, String>,
    part: &str,
) -> Result<(), SlideMergeError> {
    let mut id: Option<u32> = None;
    let mut code: Option<String> = None;
    for attr in e.attributes() {
        let attr = attr.map_err(|e| attr_error(part, e))?;
        match attr.key.local_name().as_ref() {
            b"numFmtId" => id = Some(std::str::from_utf8(&attr.value)?.parse()?),
            b"formatCode" => code = Some(unescaped(&attr, part)?),
            _ => {}
        }
    }
    if let (Some(id), Some(code)) = (id, code) {
        num_formats.insert(id, code);
    }
    Ok(())
}

/// `<xf numFmtId="165" fontId="0" fillId="0" borderId="0"/>`
fn read_xf(e: &BytesStart<'_>, part: &str) -> Result<CellXf, SlideMergeError> {
    let mut num_fmt_id = 0u32;
    for attr in e.attributes() {
        let attr = attr.map_err(|e| attr_error(part, e))?;
        if attr.key.local_name().as_ref() == b"numFmtId" {
            num_fmt_id = std::str::from_utf8(&attr.value)?.parse()?;
        }
    }
    Ok(CellXf { num_fmt_id })
}

/// パートを読み込む（存在しない場合は`None`）
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, SlideMergeError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml_content = Vec::new();
    file.read_to_end(&mut xml_content)?;
    Ok(Some(xml_content))
}

/// リレーションシップファイルを解析（Id -> Target）
fn parse_relationships(
    xml_content: &[u8],
    part: &str,
) -> Result<HashMap<String, String>, SlideMergeError> {
    let mut reader = Reader::from_reader(xml_content);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut relationships = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let mut id = None;
                    let mut target = None;
                    for attr in e.attributes() {
                        let attr = attr.map_err(|e| attr_error(part, e))?;
                        match attr.key.as_ref() {
                            b"Id" => id = Some(unescaped(&attr, part)?),
                            b"Target" => target = Some(unescaped(&attr, part)?),
                            _ => {}
                        }
                    }
                    if let (Some(id), Some(target)) = (id, target) {
                        relationships.insert(id, target);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(part, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// ワークブックからの相対ターゲットをパッケージ内パスに変換
///
/// `worksheets/sheet1.xml` -> `xl/worksheets/sheet1.xml`、
/// `/xl/worksheets/sheet1.xml` -> `xl/worksheets/sheet1.xml`
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

/// セル参照文字列を座標に変換（例: "B3" -> (2, 1)、`$B$3`も可）
fn parse_cell_ref(ref_str: &str) -> Option<(u32, u32)> {
    let cleaned: String = ref_str.chars().filter(|c| *c != '$').collect();
    let split = cleaned.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cleaned.split_at(split);
    let col = column_index(letters)?;
    let row = digits.parse::<u32>().ok()?.checked_sub(1)?;
    Some((row, col))
}

fn unescaped(attr: &Attribute<'_>, part: &str) -> Result<String, SlideMergeError> {
    let raw = std::str::from_utf8(&attr.value)?;
    unescape(raw)
        .map(|v| v.into_owned())
        .map_err(|e| xml_error(part, e.into()))
}

fn xml_error(part: &str, e: quick_xml::Error) -> SlideMergeError {
    SlideMergeError::Config(format!("XML parse error in '{}': {}", part, e))
}

fn attr_error(part: &str, e: quick_xml::events::attributes::AttrError) -> SlideMergeError {
    SlideMergeError::Config(format!("XML attribute error in '{}': {}", part, e))
}

/// ビルトイン書式ID（0-163）のマッピング
///
/// Excelの標準書式IDとフォーマット文字列の対応表です。
fn get_builtin_format(id: u32) -> Option<&'static str> {
    match id {
        0 => Some("General"),
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        5 => Some("$#,##0_);($#,##0)"),
        6 => Some("$#,##0_);[Red]($#,##0)"),
        7 => Some("$#,##0.00_);($#,##0.00)"),
        8 => Some("$#,##0.00_);[Red]($#,##0.00)"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        11 => Some("0.00E+00"),
        12 => Some("# ?/?"),
        13 => Some("# ??/??"),
        14 => Some("mm-dd-yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        37 => Some("#,##0_);(#,##0)"),
        38 => Some("#,##0_);[Red](#,##0)"),
        39 => Some("#,##0.00_);(#,##0.00)"),
        40 => Some("#,##0.00_);[Red](#,##0.00)"),
        41 => Some("_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)"),
        42 => Some("_($* #,##0_);_($* (#,##0);_($* \"-\"_);_(@_)"),
        43 => Some("_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)"),
        44 => Some("_($* #,##0.00_);_($* (#,##0.00);_($* \"-\"??_);_(@_)"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mm:ss.0"),
        48 => Some("##0.0E+0"),
        49 => Some("@"),
        _ => None,
    }
}
