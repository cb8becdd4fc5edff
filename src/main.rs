use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser, ValueEnum};
use slidemerge::{DateFormat, MergerBuilder, OutputFormat, Progress, Selection};

#[derive(Parser, Debug)]
#[command(name = "slidemerge")]
#[command(version)]
#[command(about = "Fill PPTX placeholders ({A}, {B}, ...) from Excel rows, one document per row")]
#[command(long_about = r#"
slidemerge - slide deck mail-merge

Placeholders {A}, {B}, ... in the template's text are replaced by the values of
columns A, B, ... of the first sheet of the data workbook. One document is
generated per selected row; all documents are packed into
Presentations_<timestamp>.zip next to the Presentations_<timestamp>/ folder.

Examples:
  slidemerge -t deck.pptx -d stores.xlsx --rows 2 10
  slidemerge -t deck.pptx -d stores.xlsx --ids "1001, 1002" --format pdf
  slidemerge -t deck.pptx -d stores.xlsx --name-columns "Store ID,City" --preview
"#)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .multiple(true)
        .args(["rows", "ids", "preview"])
))]
struct Cli {
    /// PowerPoint template (.pptx)
    #[arg(short, long)]
    template: PathBuf,

    /// Excel data source (.xlsx); the first sheet is used
    #[arg(short, long)]
    data: PathBuf,

    /// Row range as numbered in Excel, inclusive (header is usually row 1)
    #[arg(long, num_args = 2, value_names = ["START", "END"], conflicts_with = "ids")]
    rows: Option<Vec<u32>>,

    /// Comma-separated identifiers matched against the first column
    #[arg(long)]
    ids: Option<String>,

    /// Comma-separated column names joined with '_' to name each file [default: first column]
    #[arg(short, long, value_delimiter = ',')]
    name_columns: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Pptx)]
    format: FormatArg,

    /// Directory where the output folder and archive are created
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Date format as a chrono pattern (e.g. "%Y-%m-%d") [default: DD-MM-YYYY]
    #[arg(long)]
    date_format: Option<String>,

    /// Program used for PDF conversion
    #[arg(long, default_value = slidemerge::DEFAULT_CONVERTER_PROGRAM)]
    converter: String,

    /// Write a JSON report of the run to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Show the example file name and template placeholders, then exit
    #[arg(long)]
    preview: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Pptx,
    Pdf,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Pptx => OutputFormat::Pptx,
            FormatArg::Pdf => OutputFormat::Pdf,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slidemerge=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let selection = match (&cli.rows, &cli.ids) {
        (Some(rows), _) => match rows.as_slice() {
            [start, end] => Selection::ByRange {
                start: *start,
                end: *end,
            },
            _ => return Err("--rows takes exactly two values: START END".into()),
        },
        (None, Some(ids)) => Selection::from_identifier_list(ids),
        // --preview のみ（行選択は使用しない）
        (None, None) => Selection::default(),
    };

    let name_columns: Vec<String> = cli
        .name_columns
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    let mut builder = MergerBuilder::new()
        .with_selection(selection)
        .with_name_columns(name_columns)
        .with_output_format(cli.format.into())
        .with_output_dir(&cli.output_dir)
        .with_converter_program(&cli.converter);
    if let Some(pattern) = &cli.date_format {
        builder = builder.with_date_format(DateFormat::Custom(pattern.clone()));
    }
    let merger = builder.build()?;

    let template = File::open(&cli.template)?;
    let data = File::open(&cli.data)?;

    if cli.preview {
        let preview = merger.preview(template, data)?;
        println!("Columns: {}", preview.headers.join(", "));
        println!("Data rows: {}", preview.data_rows);
        match &preview.example_file_name {
            Some(name) => println!("Example file name: {}.{}", name, merger.output_format().extension()),
            None => println!("Example file name: (no data rows)"),
        }
        println!("Placeholders: {}", preview.placeholders.join(" "));
        if !preview.unmatched_placeholders.is_empty() {
            println!(
                "Without matching column: {}",
                preview.unmatched_placeholders.join(" ")
            );
        }
        return Ok(());
    }

    let format = merger.output_format();
    let report = merger.run(template, data, |p: &Progress| {
        eprintln!(
            "Generating {}/{} ({}) - Elapsed time: {}s",
            p.completed,
            p.total,
            format,
            p.elapsed.as_secs()
        );
    })?;

    for failure in &report.conversion_failures {
        eprintln!("Warning: {} was kept as PPTX: {}", failure.file, failure.reason);
    }
    println!("{}", report.archive.display());

    if let Some(path) = &cli.report {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }

    Ok(())
}
