//! Document Conversion Module
//!
//! 生成したPPTXを外部コンバーター（LibreOfficeなど）でPDFに変換するモジュール。
//! 変換の失敗はバッチ全体の失敗にはならず、呼び出し側で記録されます。

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

/// 外部コンバーターの既定のプログラム名
pub const DEFAULT_CONVERTER_PROGRAM: &str = "libreoffice";

/// 変換処理のエラー
#[derive(Error, Debug)]
pub enum ConversionError {
    /// コンバーターのプロセスを起動できなかった
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// コンバーターが異常終了した
    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    /// コンバーターは正常終了したが、出力ファイルが存在しない
    #[error("converter produced no output at {}", .expected.display())]
    MissingOutput { expected: PathBuf },
}

/// PPTXから固定レイアウト形式（PDF）への変換を行うコンバーター
///
/// テストでは独自の実装に差し替えることができます（`Merger::with_converter`）。
pub trait DocumentConverter {
    /// `input`を変換し、`out_dir`に同名（拡張子違い）のファイルを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(PathBuf)` - 生成されたファイルのパス
    /// * `Err(ConversionError)` - 変換に失敗した場合
    fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConversionError>;
}

/// LibreOffice（headlessモード）によるPDF変換
///
/// `<program> --headless --convert-to pdf <input> --outdir <out_dir>` を同期的に実行します。
#[derive(Debug, Clone)]
pub struct LibreOfficeConverter {
    program: String,
}

impl LibreOfficeConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for LibreOfficeConverter {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERTER_PROGRAM)
    }
}

impl DocumentConverter for LibreOfficeConverter {
    fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConversionError> {
        tracing::debug!(program = %self.program, input = %input.display(), "converting to PDF");

        let output = Command::new(&self.program)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg(input)
            .arg("--outdir")
            .arg(out_dir)
            .output()
            .map_err(|source| ConversionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ConversionError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let expected = pdf_path_for(input, out_dir);
        if !expected.is_file() {
            return Err(ConversionError::MissingOutput { expected });
        }

        Ok(expected)
    }
}

/// 変換後のPDFのパス（`<out_dir>/<stem>.pdf`）
pub(crate) fn pdf_path_for(input: &Path, out_dir: &Path) -> PathBuf {
    let mut name = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    name.push(".pdf");
    out_dir.join(name)
}
