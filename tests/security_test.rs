//! Security Tests
//!
//! セキュリティ対策のテストケースを実装します。
//! テンプレート（PPTX）とデータ（XLSX）の両方について、
//! ZIP bomb攻撃、パストラバーサル攻撃などへの対策を検証します。

use std::io::{Cursor, Write};
use slidemerge::{MergerBuilder, SlideMergeError, Template};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// 指定したエントリを持つZIPアーカイブを作成
fn zip_with_entries(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip_data = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut zip_data));
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, body) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(body).unwrap();
        }
        zip.finish().unwrap();
    }
    zip_data
}

/// 正常なテンプレート
fn valid_template() -> Vec<u8> {
    zip_with_entries(&[
        ("[Content_Types].xml", b"<Types/>"),
        (
            "ppt/slides/slide1.xml",
            b"<p:sld xmlns:a=\"a\" xmlns:p=\"p\"><a:p><a:r><a:t>{A}</a:t></a:r></a:p></p:sld>",
        ),
    ])
}

/// 正常なデータ
fn valid_workbook() -> Vec<u8> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 0, "Store").unwrap();
    worksheet.write_string(1, 0, "East").unwrap();
    workbook.save_to_buffer().unwrap()
}

/// 10,001個のファイルを含むZIPアーカイブ（上限: 10,000）
fn too_many_files(prefix: &str) -> Vec<u8> {
    let mut zip_data = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut zip_data));
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        for i in 0..10_001 {
            zip.start_file(format!("{}/file{}.xml", prefix, i), options)
                .unwrap();
            zip.write_all(b"test").unwrap();
        }
        zip.finish().unwrap();
    }
    zip_data
}

/// ZIP bomb攻撃のテスト: 大量のファイルを含むテンプレート
#[test]
fn test_template_too_many_files() {
    let result = Template::load(Cursor::new(too_many_files("ppt/slides")));
    match result {
        Err(SlideMergeError::SecurityViolation(msg)) => assert!(msg.contains("too many files")),
        other => panic!("Expected SecurityViolation, got {:?}", other.map(|t| t.slide_count())),
    }
}

/// ZIP bomb攻撃のテスト: 大量のファイルを含むデータ
#[test]
fn test_workbook_too_many_files() {
    let dir = tempfile::tempdir().unwrap();
    let merger = MergerBuilder::new()
        .with_output_dir(dir.path())
        .build()
        .unwrap();

    let result = merger.run(
        Cursor::new(valid_template()),
        Cursor::new(too_many_files("xl")),
        |_| {},
    );
    match result {
        Err(SlideMergeError::SecurityViolation(msg)) => assert!(msg.contains("too many files")),
        other => panic!("Expected SecurityViolation, got {:?}", other),
    }
    // 出力は作成されない
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

/// ZIP bomb攻撃のテスト: 展開後のサイズが大きすぎるテンプレート
#[test]
#[ignore] // 大きなファイルを作成するため、通常のテストではスキップ
fn test_template_large_decompressed_size() {
    // 単一ファイル上限（100MB）を超えるスライド
    let large_data = vec![b' '; 104_857_601];
    let template = zip_with_entries(&[("ppt/slides/slide1.xml", &large_data)]);

    match Template::load(Cursor::new(template)) {
        Err(SlideMergeError::SecurityViolation(msg)) => assert!(msg.contains("exceeds maximum")),
        other => panic!("Expected SecurityViolation, got {:?}", other.map(|t| t.slide_count())),
    }
}

/// パストラバーサル攻撃のテスト: `..`を含むエントリ
#[test]
fn test_template_path_traversal() {
    let template = zip_with_entries(&[
        ("ppt/slides/slide1.xml", b"<p:sld/>"),
        ("ppt/../../evil.xml", b"evil"),
    ]);

    match Template::load(Cursor::new(template)) {
        Err(SlideMergeError::SecurityViolation(msg)) => {
            assert!(msg.contains("Path traversal"));
        }
        other => panic!("Expected SecurityViolation, got {:?}", other.map(|t| t.slide_count())),
    }
}

/// パストラバーサル攻撃のテスト: 絶対パス
#[test]
fn test_workbook_absolute_path() {
    let merger = MergerBuilder::new().build().unwrap();
    let data = zip_with_entries(&[("/etc/passwd", b"root")]);

    let result = merger.preview(Cursor::new(valid_template()), Cursor::new(data));
    match result {
        Err(SlideMergeError::SecurityViolation(msg)) => assert!(msg.contains("Absolute path")),
        other => panic!("Expected SecurityViolation, got {:?}", other),
    }
}

/// パストラバーサル攻撃のテスト: バックスラッシュ
#[test]
fn test_template_backslash_path() {
    let template = zip_with_entries(&[
        ("ppt/slides/slide1.xml", b"<p:sld/>"),
        ("ppt\\media\\image1.png", b"png"),
    ]);

    match Template::load(Cursor::new(template)) {
        Err(SlideMergeError::SecurityViolation(msg)) => assert!(msg.contains("Backslash")),
        other => panic!("Expected SecurityViolation, got {:?}", other.map(|t| t.slide_count())),
    }
}

/// パッケージでない入力はZIPエラー
#[test]
fn test_template_not_a_package() {
    let result = Template::load(Cursor::new(b"plain text".to_vec()));
    assert!(matches!(result, Err(SlideMergeError::Zip(_))));
}

/// 正常なパッケージはセキュリティチェックを通過すること
#[test]
fn test_valid_packages_pass() {
    let template = Template::load(Cursor::new(valid_template())).unwrap();
    assert_eq!(template.slide_count(), 1);

    let merger = MergerBuilder::new().build().unwrap();
    let preview = merger
        .preview(Cursor::new(valid_template()), Cursor::new(valid_workbook()))
        .unwrap();
    assert_eq!(preview.headers, vec!["Store"]);
    assert_eq!(preview.example_file_name.as_deref(), Some("East"));
    assert!(preview.unmatched_placeholders.is_empty());
}
