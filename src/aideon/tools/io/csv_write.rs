use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::aideon::tools::error::Result;
use crate::aideon::tools::model::Scalar;
use crate::aideon::tools::table::RowSink;

/// Writes output rows as CSV records.
///
/// Absent cells become empty fields; every other scalar uses its
/// [`Display`](std::fmt::Display) form. Quoting follows the csv crate's
/// defaults.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W, delimiter: u8) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .flexible(false)
            .from_writer(writer);
        Self { writer }
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|error| std::io::Error::new(error.error().kind(), error.to_string()).into())
    }
}

impl CsvSink<File> {
    /// Creates (or truncates) `path` and writes CSV into it.
    pub fn create(path: &Path, delimiter: u8) -> Result<Self> {
        Ok(Self::new(File::create(path)?, delimiter))
    }
}

impl<W: Write> RowSink for CsvSink<W> {
    fn write_row(&mut self, row: &[Scalar]) -> Result<()> {
        self.writer
            .write_record(row.iter().map(|cell| cell.to_string()))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
