//! Archive Module
//!
//! 生成したドキュメントを1つのZIPアーカイブにまとめるモジュール。

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::SlideMergeError;

/// ファイル群をZIPアーカイブに書き出す
///
/// エントリ名はディレクトリを含まないファイル名のみです。
/// 書き込み順は`files`の順序に従います。
pub(crate) fn write_archive<P: AsRef<Path>>(
    archive_path: &Path,
    files: &[P],
) -> Result<(), SlideMergeError> {
    let output = BufWriter::new(File::create(archive_path)?);
    let mut zip = ZipWriter::new(output);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut buffer = Vec::new();
    for path in files {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                SlideMergeError::Config(format!("Invalid output file name: {}", path.display()))
            })?;

        buffer.clear();
        File::open(path)?.read_to_end(&mut buffer)?;

        zip.start_file(name, options)?;
        zip.write_all(&buffer)?;
    }

    zip.finish()?.flush()?;
    tracing::debug!(archive = %archive_path.display(), entries = files.len(), "archive written");
    Ok(())
}
