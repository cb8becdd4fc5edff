//! Parser Module
//!
//! calamineによる値の読み込みと、quick-xmlによるXMLメタデータ（書式文字列、
//! 1904年エポック）の抽出を組み合わせて、データ表を構築します。

mod metadata;
mod workbook;

pub(crate) use metadata::XlsxMetadataParser;
pub(crate) use workbook::WorkbookParser;
