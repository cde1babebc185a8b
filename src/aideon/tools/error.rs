use std::path::PathBuf;

use thiserror::Error;

use crate::aideon::tools::model::{CellType, TemporalKind};

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur when the
/// tool reads a workbook, normalizes its columns, or writes CSV.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from the CSV writer.
    #[error("CSV write error: {0}")]
    CsvWrite(#[from] csv::Error),

    /// Errors bubbled up from the workbook reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::Error),

    /// Errors bubbled up while opening the workbook's zip container.
    #[error("workbook archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Errors bubbled up while parsing workbook XML parts.
    #[error("workbook XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Raised when the workbook has no sheet to convert.
    #[error("workbook contains no sheets")]
    MissingSheet,

    /// Raised when the workbook holds a cell kind that has no column type.
    #[error("unsupported cell at row {row}, column {column}: {kind}")]
    UnsupportedCell {
        row: usize,
        column: usize,
        kind: String,
    },

    /// Raised when a column index past the sheet width is requested.
    #[error("column {index} is out of range for a sheet with {width} columns")]
    ColumnOutOfRange { index: usize, width: usize },

    /// A normalization failure enriched with the column it happened in.
    #[error("error in column {index}, \"{header}\": {source}")]
    Column {
        index: usize,
        header: String,
        #[source]
        source: NormalizeError,
    },

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

/// Data-shape failures raised while resolving or normalizing one column.
///
/// These never carry column context themselves; the table assembler wraps
/// them into [`ToolError::Column`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("column contains multiple data types: {}", join_types(.types))]
    MixedType { types: Vec<CellType> },

    #[error("column contains a mix of {} (this is not supported)", describe_kinds(.kinds))]
    MixedTemporal { kinds: Vec<TemporalKind> },

    #[error("date value {0} is negative")]
    DateNegative(f64),

    #[error("date value {0} is beyond the year 9999")]
    DateTooLarge(f64),

    #[error("date value {0} falls before 1900-03-01 and is ambiguous in the 1900 date system")]
    DateAmbiguous(f64),

    #[error("expected {expected} value, found {found}")]
    UnexpectedValue {
        expected: CellType,
        found: &'static str,
    },

    #[error("integral value {0} does not fit a 64-bit integer")]
    IntegerOverflow(f64),
}

fn join_types(types: &[CellType]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_kinds(kinds: &[TemporalKind]) -> String {
    let has = |kind| kinds.contains(&kind);
    match (
        has(TemporalKind::Date),
        has(TemporalKind::Time),
        has(TemporalKind::DateTime),
    ) {
        (false, true, true) => "times and datetimes".to_string(),
        (true, true, false) => "dates and times".to_string(),
        _ => kinds
            .iter()
            .map(|kind| format!("{kind}s"))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_error_prefixes_index_and_header() {
        let error = ToolError::Column {
            index: 2,
            header: "Amount".into(),
            source: NormalizeError::MixedType {
                types: vec![CellType::Text, CellType::Number],
            },
        };

        assert_eq!(
            error.to_string(),
            "error in column 2, \"Amount\": column contains multiple data types: Text, Number"
        );
    }

    #[test]
    fn mixed_temporal_messages_name_the_pair() {
        let datetime_time = NormalizeError::MixedTemporal {
            kinds: vec![TemporalKind::Time, TemporalKind::DateTime],
        };
        let date_time = NormalizeError::MixedTemporal {
            kinds: vec![TemporalKind::Date, TemporalKind::Time],
        };

        assert_eq!(
            datetime_time.to_string(),
            "column contains a mix of times and datetimes (this is not supported)"
        );
        assert_eq!(
            date_time.to_string(),
            "column contains a mix of dates and times (this is not supported)"
        );
    }
}
