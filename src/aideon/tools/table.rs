//! Sheet-level conversion: pulls columns from a [`CellSource`], normalizes
//! them one at a time, and hands the assembled rows to a [`RowSink`].

use tracing::{debug, instrument};

use crate::aideon::tools::error::{Result, ToolError};
use crate::aideon::tools::model::{
    Column, DateMode, LogicalColumnType, NormalizedColumn, OutputRow, RawCell, Scalar,
};
use crate::aideon::tools::normalize::Normalizer;
use crate::aideon::tools::resolve::resolve;

/// Anything that can hand out the columns of a single sheet.
pub trait CellSource {
    /// Epoch convention for every date cell in the sheet.
    fn date_mode(&self) -> DateMode;

    fn column_count(&self) -> usize;

    /// Returns the column at `index`, header split off. Every column of a
    /// source has the same number of data cells.
    fn column(&self, index: usize) -> Result<Column>;
}

/// Receives output rows, header row first.
pub trait RowSink {
    fn write_row(&mut self, row: &[Scalar]) -> Result<()>;

    /// Called once after the last row.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl RowSink for Vec<OutputRow> {
    fn write_row(&mut self, row: &[Scalar]) -> Result<()> {
        self.push(row.to_vec());
        Ok(())
    }
}

/// An in-memory sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    date_mode: DateMode,
    headers: Vec<String>,
    columns: Vec<Vec<RawCell>>,
}

impl Sheet {
    pub fn new(date_mode: DateMode) -> Self {
        Self {
            date_mode,
            ..Self::default()
        }
    }

    /// Builds a sheet from a header row and data rows. Short rows are padded
    /// with empty cells.
    pub fn from_rows<H>(headers: Vec<H>, rows: Vec<Vec<RawCell>>, date_mode: DateMode) -> Self
    where
        H: Into<String>,
    {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        let width = rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(headers.len()))
            .max()
            .unwrap_or(0);

        let mut columns: Vec<Vec<RawCell>> = vec![Vec::with_capacity(rows.len()); width];
        for row in rows {
            let mut cells = row.into_iter();
            for column in columns.iter_mut() {
                column.push(cells.next().unwrap_or_else(RawCell::empty));
            }
        }

        let mut headers = headers;
        headers.resize(width, String::new());

        Self {
            date_mode,
            headers,
            columns,
        }
    }

    /// Appends a column to the right of the existing ones.
    pub fn with_column(mut self, header: impl Into<String>, cells: Vec<RawCell>) -> Self {
        self.headers.push(header.into());
        self.columns.push(cells);
        self
    }

    /// Number of data rows, i.e. the length of the longest column.
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl CellSource for Sheet {
    fn date_mode(&self) -> DateMode {
        self.date_mode
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column(&self, index: usize) -> Result<Column> {
        let cells = self
            .columns
            .get(index)
            .ok_or(ToolError::ColumnOutOfRange {
                index,
                width: self.columns.len(),
            })?;

        let mut cells = cells.clone();
        cells.resize_with(self.row_count(), RawCell::empty);
        let header = self.headers.get(index).cloned().unwrap_or_default();

        Ok(Column::new(index, header, cells))
    }
}

/// Outcome of a successful conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSummary {
    /// Resolved type of every column, left to right.
    pub column_types: Vec<LogicalColumnType>,
    /// Data rows written, header excluded.
    pub rows: usize,
}

impl ConversionSummary {
    pub fn columns(&self) -> usize {
        self.column_types.len()
    }
}

/// Resolves and normalizes one column. Failures are wrapped with the
/// column's index and header.
pub fn normalize_column(column: &Column, date_mode: DateMode) -> Result<NormalizedColumn> {
    resolve(column.types())
        .and_then(|column_type| {
            Normalizer::for_type(column_type).normalize(column.values(), date_mode)
        })
        .map_err(|source| ToolError::Column {
            index: column.index,
            header: column.header.clone(),
            source,
        })
}

/// Transposes normalized columns into rows and prepends the header row.
/// No columns means no rows at all.
pub fn assemble_rows(headers: Vec<String>, columns: Vec<NormalizedColumn>) -> Vec<OutputRow> {
    if columns.is_empty() {
        return Vec::new();
    }

    let row_count = columns
        .iter()
        .map(|column| column.values.len())
        .max()
        .unwrap_or(0);

    let mut rows: Vec<OutputRow> = Vec::with_capacity(row_count + 1);
    rows.push(headers.into_iter().map(Scalar::Text).collect());

    let mut cells: Vec<_> = columns
        .into_iter()
        .map(|column| column.values.into_iter())
        .collect();
    for _ in 0..row_count {
        rows.push(
            cells
                .iter_mut()
                .map(|column| column.next().unwrap_or(Scalar::Absent))
                .collect(),
        );
    }

    rows
}

/// Converts a whole sheet. Nothing reaches `sink` unless every column
/// normalizes.
#[instrument(level = "debug", skip_all, fields(columns = source.column_count()))]
pub fn convert_sheet<S, K>(source: &S, sink: &mut K) -> Result<ConversionSummary>
where
    S: CellSource + ?Sized,
    K: RowSink + ?Sized,
{
    let date_mode = source.date_mode();
    let column_count = source.column_count();

    let mut headers = Vec::with_capacity(column_count);
    let mut normalized = Vec::with_capacity(column_count);

    for index in 0..column_count {
        let column = source.column(index)?;
        let values = normalize_column(&column, date_mode)?;
        debug!(
            index,
            header = %column.header,
            column_type = ?values.column_type,
            "column normalized"
        );
        headers.push(column.header);
        normalized.push(values);
    }

    let column_types = normalized.iter().map(|column| column.column_type).collect();
    let rows = assemble_rows(headers, normalized);
    for row in &rows {
        sink.write_row(row)?;
    }
    sink.finish()?;

    Ok(ConversionSummary {
        column_types,
        rows: rows.len().saturating_sub(1),
    })
}

/// Converts a sheet into in-memory rows, header row first.
pub fn convert_to_rows<S>(source: &S) -> Result<Vec<OutputRow>>
where
    S: CellSource + ?Sized,
{
    let mut rows: Vec<OutputRow> = Vec::new();
    convert_sheet(source, &mut rows)?;
    Ok(rows)
}
