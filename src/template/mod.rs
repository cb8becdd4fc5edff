//! Template Module
//!
//! PPTXテンプレートの読み込みと、行ごとのプレースホルダー置換を行うモジュール。
//! テンプレートは一度だけメモリに読み込まれ、出力ごとに新しいパッケージを生成します。

mod runs;

use std::collections::{BTreeSet, HashMap};
use std::io::{Cursor, Read, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::SlideMergeError;
use crate::security::SecurityConfig;

use runs::{rewrite_runs, TokenPattern};

/// パッケージ内のエントリ
#[derive(Debug, Clone)]
struct TemplateEntry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    is_dir: bool,
}

/// 読み込み済みのPPTXテンプレート
///
/// エントリの順序と圧縮方式は読み込み時のまま保持されます。
/// `render`はテンプレート自体を変更しないため、ある行の置換結果が
/// 別の行に漏れることはありません。
#[derive(Debug, Clone)]
pub struct Template {
    entries: Vec<TemplateEntry>,
    pattern: TokenPattern,
}

impl Template {
    /// PPTXファイルを読み込む
    ///
    /// # 戻り値
    ///
    /// * `Ok(Template)` - 読み込みに成功した場合
    /// * `Err(SlideMergeError::Zip)` - 入力がZIPアーカイブでない場合
    /// * `Err(SlideMergeError::Template)` - スライドが1枚も含まれていない場合
    /// * `Err(SlideMergeError::SecurityViolation)` - セキュリティ制限に違反した場合
    pub fn load<R: Read>(reader: R) -> Result<Self, SlideMergeError> {
        let security_config = SecurityConfig::default();
        let buffer = security_config.read_input(reader)?;

        let mut archive = ZipArchive::new(Cursor::new(buffer))?;
        security_config.check_archive(&mut archive)?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let mut data = Vec::new();
            if !file.is_dir() {
                file.read_to_end(&mut data)?;
            }
            entries.push(TemplateEntry {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                is_dir: file.is_dir(),
            });
        }

        if !entries.iter().any(|e| is_slide_part(&e.name)) {
            return Err(SlideMergeError::Template {
                part: "ppt/slides".to_string(),
                message: "template contains no slides".to_string(),
            });
        }

        Ok(Self {
            entries,
            pattern: TokenPattern::new()?,
        })
    }

    /// スライド数
    pub fn slide_count(&self) -> usize {
        self.entries.iter().filter(|e| is_slide_part(&e.name)).count()
    }

    /// テンプレート中のプレースホルダー（重複なし、ソート済み）
    ///
    /// 置換対象と同じテキストラン単位で検索するため、ラン境界をまたぐ
    /// トークンは含まれません。
    pub fn placeholders(&self) -> Result<Vec<String>, SlideMergeError> {
        let mut found = BTreeSet::new();
        for entry in self.slide_entries() {
            rewrite_runs(&entry.data, &entry.name, |text| {
                found.extend(self.pattern.tokens(text).into_iter().map(str::to_string));
                None
            })?;
        }
        Ok(found.into_iter().collect())
    }

    /// 列記号 -> 表示文字列のマッピングでプレースホルダーを置換し、
    /// 新しいPPTXパッケージのバイト列を返す
    ///
    /// # 引数
    ///
    /// * `values` - 列記号（`"A"`, `"B"`, …）をキーとする表示文字列
    pub fn render(&self, values: &HashMap<String, String>) -> Result<Vec<u8>, SlideMergeError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            let options = FileOptions::default().compression_method(match entry.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            });

            if entry.is_dir {
                zip.add_directory(entry.name.as_str(), options)?;
                continue;
            }

            zip.start_file(entry.name.as_str(), options)?;
            if is_slide_part(&entry.name) {
                let xml = rewrite_runs(&entry.data, &entry.name, |text| {
                    self.pattern.replace_in(text, values)
                })?;
                zip.write_all(&xml)?;
            } else {
                zip.write_all(&entry.data)?;
            }
        }

        Ok(zip.finish()?.into_inner())
    }

    fn slide_entries(&self) -> impl Iterator<Item = &TemplateEntry> {
        self.entries.iter().filter(|e| is_slide_part(&e.name))
    }
}

/// スライド本体のパートかどうか（`ppt/slides/slideN.xml`）
fn is_slide_part(name: &str) -> bool {
    name.strip_prefix("ppt/slides/slide")
        .and_then(|rest| rest.strip_suffix(".xml"))
        .map(|num| !num.is_empty() && num.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}
