use std::path::PathBuf;

use aideon_sheetcsv::aideon::tools::convert::{self, ConvertOptions};
use aideon_sheetcsv::model::DateMode;
use aideon_sheetcsv::{Result, ToolError};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging().and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Convert(args) => execute_convert(args),
    }
}

fn execute_convert(args: ConvertArgs) -> Result<()> {
    if !args.input.exists() {
        return Err(ToolError::MissingInput(args.input));
    }

    let options = ConvertOptions {
        date_system: args.date_system.map(DateMode::from),
        delimiter: args.delimiter as u8,
    };
    convert::excel_to_csv(&args.input, args.output.as_deref(), options)?;
    Ok(())
}

fn parse_delimiter(value: &str) -> std::result::Result<char, String> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(delimiter), None) if delimiter.is_ascii() => Ok(delimiter),
        _ => Err(format!("delimiter must be a single ASCII character, got '{value}'")),
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Convert the first sheet of a workbook into a uniformly typed CSV table."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a workbook's first sheet to CSV.
    Convert(ConvertArgs),
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Workbook to read (xls, xlsx, xlsb or ods).
    #[arg(long)]
    input: PathBuf,

    /// CSV file to write. Defaults to standard output.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Date system the workbook was saved with. Read from the workbook when
    /// omitted; only xlsx and xlsb files carry a readable flag.
    #[arg(long, value_enum)]
    date_system: Option<DateSystemKind>,

    /// Field delimiter for the CSV output.
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    delimiter: char,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum DateSystemKind {
    #[value(name = "1900")]
    Excel1900,
    #[value(name = "1904")]
    Excel1904,
}

impl From<DateSystemKind> for DateMode {
    fn from(kind: DateSystemKind) -> Self {
        match kind {
            DateSystemKind::Excel1900 => DateMode::Excel1900,
            DateSystemKind::Excel1904 => DateMode::Excel1904,
        }
    }
}
