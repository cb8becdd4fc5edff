//! slidemerge - Pure-Rust slide deck mail-merge
//!
//! This crate fills `{A}`, `{B}`, … placeholders in a PowerPoint (PPTX) template
//! with the values of selected rows from an Excel (XLSX) workbook, producing one
//! document per row and packaging them into a single ZIP archive.
//!
//! Cell values are rendered according to the cell's own number format:
//! currency formats get a trailing symbol (`1234.6 €`), percentage formats are
//! multiplied by 100 (`50.5%`), and dates use a configurable format.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::fs::File;
//! use slidemerge::{MergerBuilder, Selection};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Rows 2 to 10 of the first sheet (as numbered in Excel)
//!     let merger = MergerBuilder::new()
//!         .with_selection(Selection::ByRange { start: 2, end: 10 })
//!         .build()?;
//!
//!     let report = merger.run(
//!         File::open("template.pptx")?,
//!         File::open("stores.xlsx")?,
//!         |progress| eprintln!("{}/{}", progress.completed, progress.total),
//!     )?;
//!
//!     println!("Archive: {}", report.archive.display());
//!     Ok(())
//! }
//! ```
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use std::fs::File;
//! use slidemerge::{DateFormat, MergerBuilder, OutputFormat, Selection};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let merger = MergerBuilder::new()
//!         .with_selection(Selection::from_identifier_list("1001, 1002"))  // By first column
//!         .with_name_columns(["Store ID", "City"])                          // "1001_Paris.pdf"
//!         .with_output_format(OutputFormat::Pdf)                           // Via LibreOffice
//!         .with_date_format(DateFormat::Iso8601)
//!         .with_output_dir("out")
//!         .build()?;
//!
//!     merger.run(File::open("template.pptx")?, File::open("stores.xlsx")?, |_| {})?;
//!     Ok(())
//! }
//! ```
//!
//! # Preview
//!
//! ```rust,no_run
//! use std::fs::File;
//! use slidemerge::MergerBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let merger = MergerBuilder::new().with_name_columns(["City"]).build()?;
//!     let preview = merger.preview(File::open("template.pptx")?, File::open("stores.xlsx")?)?;
//!     println!("Example file name: {:?}", preview.example_file_name);
//!     println!("Placeholders: {:?}", preview.placeholders);
//!     Ok(())
//! }
//! ```

mod api;
mod archive;
mod builder;
mod convert;
mod error;
mod formatter;
mod naming;
mod parser;
mod security;
mod select;
mod template;
mod types;

// 公開API
pub use api::{DateFormat, OutputFormat, Selection};
pub use builder::{
    BatchReport, ConversionFailure, Merger, MergerBuilder, Preview, Progress,
    DEFAULT_CURRENCY_SYMBOLS,
};
pub use convert::{ConversionError, DocumentConverter, LibreOfficeConverter, DEFAULT_CONVERTER_PROGRAM};
pub use error::SlideMergeError;
pub use template::Template;
pub use types::{column_index, column_letter, Cell, CellValue, Row, Table};
