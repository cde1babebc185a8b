use std::io::{self, Write};
use std::path::Path;

use tracing::{info, instrument};

use crate::aideon::tools::error::Result;
use crate::aideon::tools::io::csv_write::CsvSink;
use crate::aideon::tools::io::excel_read;
use crate::aideon::tools::model::DateMode;
use crate::aideon::tools::table::{CellSource, ConversionSummary, convert_sheet};

/// Knobs for a file conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Date system the workbook was saved with. `None` reads the workbook's
    /// own flag; set it for formats whose flag is not read, such as xls.
    pub date_system: Option<DateMode>,
    /// CSV field delimiter.
    pub delimiter: u8,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            date_system: None,
            delimiter: b',',
        }
    }
}

/// Converts the first sheet of a workbook into CSV.
///
/// With no `output` path the CSV goes to standard output. The file is only
/// created once every column has normalized.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %input.display(), output = ?output.map(Path::display))
)]
pub fn excel_to_csv(
    input: &Path,
    output: Option<&Path>,
    options: ConvertOptions,
) -> Result<ConversionSummary> {
    let sheet = excel_read::read_first_sheet(input, options.date_system)?;
    info!(columns = sheet.column_count(), rows = sheet.row_count(), "read sheet");

    let summary = match output {
        Some(path) => {
            let mut buffer = CsvSink::new(Vec::new(), options.delimiter);
            let summary = convert_sheet(&sheet, &mut buffer)?;
            std::fs::write(path, buffer.into_inner()?)?;
            summary
        }
        None => sheet_to_writer(&sheet, io::stdout().lock(), options.delimiter)?,
    };

    info!(
        columns = summary.columns(),
        rows = summary.rows,
        "wrote CSV"
    );
    Ok(summary)
}

/// Converts any cell source straight into a CSV writer.
pub fn sheet_to_writer<S, W>(source: &S, writer: W, delimiter: u8) -> Result<ConversionSummary>
where
    S: CellSource + ?Sized,
    W: Write,
{
    let mut sink = CsvSink::new(writer, delimiter);
    convert_sheet(source, &mut sink)
}

/// Converts any cell source into a CSV string.
pub fn sheet_to_csv_string<S>(source: &S, delimiter: u8) -> Result<String>
where
    S: CellSource + ?Sized,
{
    let mut sink = CsvSink::new(Vec::new(), delimiter);
    convert_sheet(source, &mut sink)?;
    let bytes = sink.into_inner()?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
