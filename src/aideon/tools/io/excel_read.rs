use std::path::Path;

use calamine::{DataType, Range, Reader, open_workbook_auto};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, instrument};

use crate::aideon::tools::error::{Result, ToolError};
use crate::aideon::tools::io::date_system::detect_date_mode;
use crate::aideon::tools::model::{CellType, DateMode, RawCell, RawValue};
use crate::aideon::tools::normalize::temporal::epoch;
use crate::aideon::tools::table::Sheet;

/// calamine moves 1904-system date serials onto the 1900 epoch by adding
/// this many days.
const REBASED_1904_DAYS: f64 = 1462.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Reads the first sheet of a workbook into an in-memory [`Sheet`].
///
/// Any format calamine recognises by extension is accepted. Sheet row 0 is
/// the header row. `date_system` names the epoch the workbook was saved
/// with; when `None` it is read from the workbook itself.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn read_first_sheet(path: &Path, date_system: Option<DateMode>) -> Result<Sheet> {
    let date_mode = match date_system {
        Some(mode) => mode,
        None => detect_date_mode(path)?,
    };

    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ToolError::MissingSheet)??;

    let (height, width) = range.get_size();
    debug!(height, width, start = ?range.start(), ?date_mode, "read first sheet");
    sheet_from_range(&range, date_mode)
}

/// Splits a calamine range into a header row and typed data rows.
///
/// Rows above and columns left of the used range are kept as blanks, so
/// column indices match the sheet. `date_mode` is the workbook's own date
/// system; date serials in `range` are expected in calamine's rebased form.
pub fn sheet_from_range(range: &Range<DataType>, date_mode: DateMode) -> Result<Sheet> {
    let Some((first_row, first_col)) = range.start() else {
        return Ok(Sheet::new(date_mode));
    };
    let (first_row, first_col) = (first_row as usize, first_col as usize);

    let mut headers = vec![String::new(); first_col];
    let mut data: Vec<Vec<RawCell>> = vec![Vec::new(); first_row.saturating_sub(1)];

    for (offset, row) in range.rows().enumerate() {
        let row_idx = first_row + offset;
        if row_idx == 0 {
            headers.extend(row.iter().map(header_text));
            continue;
        }

        let mut cells = vec![RawCell::empty(); first_col];
        for (col_offset, cell) in row.iter().enumerate() {
            cells.push(to_raw_cell(cell, date_mode, row_idx, first_col + col_offset)?);
        }
        data.push(cells);
    }

    Ok(Sheet::from_rows(headers, data, date_mode))
}

/// Maps a workbook cell onto a raw value and its type tag. Date serials come
/// back in the workbook's own date system. `row` and `column` are sheet
/// positions used for error reporting.
pub fn to_raw_cell(
    cell: &DataType,
    date_mode: DateMode,
    row: usize,
    column: usize,
) -> Result<RawCell> {
    let raw = match cell {
        DataType::Empty => RawCell::empty(),
        DataType::String(value) => RawCell::text(value.clone()),
        DataType::Float(value) => RawCell::number(*value),
        DataType::Int(value) => RawCell::number(*value as f64),
        DataType::Bool(value) => RawCell::new(RawValue::Boolean(*value), CellType::Boolean),
        DataType::DateTime(serial) => RawCell::date(native_serial(*serial, date_mode)),
        DataType::Duration(serial) => RawCell::date(*serial),
        DataType::DateTimeIso(text) => iso_datetime_serial(text, date_mode)
            .map(RawCell::date)
            .ok_or_else(|| unsupported(cell, row, column))?,
        DataType::DurationIso(text) => iso_duration_serial(text)
            .map(RawCell::date)
            .ok_or_else(|| unsupported(cell, row, column))?,
        DataType::Error(_) => return Err(unsupported(cell, row, column)),
    };
    Ok(raw)
}

fn unsupported(cell: &DataType, row: usize, column: usize) -> ToolError {
    ToolError::UnsupportedCell {
        row,
        column,
        kind: cell.to_string(),
    }
}

// Durations are never rebased, only date-formatted serials are.
fn native_serial(serial: f64, date_mode: DateMode) -> f64 {
    match date_mode {
        DateMode::Excel1900 => serial,
        DateMode::Excel1904 => serial - REBASED_1904_DAYS,
    }
}

/// Serial for an ISO-8601 date or datetime such as `2024-01-01` or
/// `2024-01-01T12:30:00.5`, counted from the epoch of `date_mode`.
fn iso_datetime_serial(text: &str, date_mode: DateMode) -> Option<f64> {
    let datetime = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d").map(|date| date.and_time(NaiveTime::MIN))
        })
        .ok()?;
    let start = epoch(date_mode)?.and_time(NaiveTime::MIN);
    let millis = datetime.signed_duration_since(start).num_milliseconds();
    Some(millis as f64 / MILLIS_PER_DAY)
}

/// Fraction of a day for an ISO-8601 duration such as `PT12H30M00S` or
/// `P1DT2H`. Negative and year/month durations are not accepted.
fn iso_duration_serial(text: &str) -> Option<f64> {
    let rest = text.strip_prefix('P')?;
    let (days, time) = rest.split_once('T').unwrap_or((rest, ""));

    let mut seconds = 0.0;
    if !days.is_empty() {
        seconds += days.strip_suffix('D')?.parse::<f64>().ok()? * 86_400.0;
    }
    for part in time.split_inclusive(['H', 'M', 'S']) {
        let (value, unit) = part.split_at(part.len().checked_sub(1)?);
        let scale = match unit {
            "H" => 3_600.0,
            "M" => 60.0,
            "S" => 1.0,
            _ => return None,
        };
        seconds += value.parse::<f64>().ok()? * scale;
    }

    Some(seconds / 86_400.0)
}

/// Header cells are taken verbatim. Numbers use their natural text form on
/// purpose, so a `2024.0` header reads `2024` rather than the `2024.0` a
/// fractional data value would render as.
fn header_text(cell: &DataType) -> String {
    match cell {
        DataType::String(value) => value.clone(),
        DataType::Float(value) => value.to_string(),
        DataType::Int(value) => value.to_string(),
        DataType::Bool(value) => value.to_string(),
        DataType::Empty => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aideon::tools::error::NormalizeError;
    use crate::aideon::tools::model::{Scalar, TemporalKind};
    use crate::aideon::tools::table::{CellSource, convert_to_rows};
    use pretty_assertions::assert_eq;

    fn range(cells: &[((u32, u32), DataType)]) -> Range<DataType> {
        let start = cells
            .iter()
            .fold((u32::MAX, u32::MAX), |(r, c), ((row, col), _)| (r.min(*row), c.min(*col)));
        let end = cells
            .iter()
            .fold((0, 0), |(r, c), ((row, col), _)| (r.max(*row), c.max(*col)));
        let mut range = Range::new(start, end);
        for (position, value) in cells {
            range.set_value(*position, value.clone());
        }
        range
    }

    fn raw(cell: DataType, date_mode: DateMode) -> RawCell {
        to_raw_cell(&cell, date_mode, 1, 0).expect("cell maps")
    }

    #[test]
    fn maps_cell_kinds_to_tags() {
        assert_eq!(raw(DataType::Int(4), DateMode::Excel1900), RawCell::number(4.0));
        assert_eq!(
            raw(DataType::DateTime(45_292.5), DateMode::Excel1900),
            RawCell::date(45_292.5)
        );
        assert_eq!(raw(DataType::Bool(true), DateMode::Excel1900), RawCell::boolean(true));
        assert_eq!(raw(DataType::Empty, DateMode::Excel1900), RawCell::empty());
    }

    #[test]
    fn rebased_1904_serials_are_restored() {
        assert_eq!(
            raw(DataType::DateTime(45_292.0), DateMode::Excel1904),
            RawCell::date(43_830.0)
        );
        assert_eq!(
            raw(DataType::DateTime(1_462.5), DateMode::Excel1904),
            RawCell::date(0.5)
        );
    }

    #[test]
    fn durations_are_time_serials() {
        assert_eq!(raw(DataType::Duration(0.5), DateMode::Excel1900), RawCell::date(0.5));
        assert_eq!(raw(DataType::Duration(0.5), DateMode::Excel1904), RawCell::date(0.5));

        let sheet = sheet_from_range(
            &range(&[
                ((0, 0), DataType::String("Elapsed".into())),
                ((1, 0), DataType::Duration(0.5)),
                ((2, 0), DataType::Duration(0.25)),
            ]),
            DateMode::Excel1900,
        )
        .expect("sheet built");

        assert_eq!(
            convert_to_rows(&sheet).expect("converts"),
            vec![
                vec![Scalar::from("Elapsed")],
                vec![Scalar::from("12:00:00")],
                vec![Scalar::from("06:00:00")],
            ]
        );
    }

    #[test]
    fn iso_dates_become_serials() {
        assert_eq!(
            raw(DataType::DateTimeIso("2024-01-01".into()), DateMode::Excel1900),
            RawCell::date(45_292.0)
        );
        assert_eq!(
            raw(DataType::DateTimeIso("2024-01-01T12:00:00".into()), DateMode::Excel1900),
            RawCell::date(45_292.5)
        );
        assert_eq!(
            raw(DataType::DateTimeIso("2024-01-01".into()), DateMode::Excel1904),
            RawCell::date(43_830.0)
        );
        assert_eq!(
            raw(DataType::DurationIso("PT12H00M00S".into()), DateMode::Excel1900),
            RawCell::date(0.5)
        );
        assert_eq!(
            raw(DataType::DurationIso("PT6H".into()), DateMode::Excel1900),
            RawCell::date(0.25)
        );
    }

    #[test]
    fn iso_cells_normalize_like_serials() {
        let sheet = sheet_from_range(
            &range(&[
                ((0, 0), DataType::String("Day".into())),
                ((1, 0), DataType::DateTimeIso("2024-01-01".into())),
                ((2, 0), DataType::DateTimeIso("2024-01-02T06:30:00".into())),
            ]),
            DateMode::Excel1900,
        )
        .expect("sheet built");

        assert_eq!(
            convert_to_rows(&sheet).expect("converts"),
            vec![
                vec![Scalar::from("Day")],
                vec![Scalar::from("2024-01-01T00:00:00")],
                vec![Scalar::from("2024-01-02T06:30:00")],
            ]
        );
    }

    #[test]
    fn malformed_iso_cells_are_unsupported() {
        let cell = DataType::DurationIso("-PT1H".into());
        let error = to_raw_cell(&cell, DateMode::Excel1900, 4, 1).expect_err("negative duration");
        assert!(matches!(
            error,
            ToolError::UnsupportedCell { row: 4, column: 1, .. }
        ));

        let cell = DataType::DateTimeIso("yesterday".into());
        assert!(to_raw_cell(&cell, DateMode::Excel1900, 1, 0).is_err());
    }

    #[test]
    fn error_cells_are_unsupported() {
        let cell = DataType::Error(calamine::CellErrorType::Div0);
        let error = to_raw_cell(&cell, DateMode::Excel1900, 3, 2).expect_err("error cell");
        assert!(matches!(
            error,
            ToolError::UnsupportedCell { row: 3, column: 2, .. }
        ));
    }

    #[test]
    fn first_row_becomes_headers() {
        let range = range(&[
            ((0, 0), DataType::String("Name".into())),
            ((0, 1), DataType::Float(2024.0)),
            ((1, 0), DataType::String("Ann".into())),
            ((1, 1), DataType::Float(1.5)),
            ((2, 0), DataType::String("Bo".into())),
        ]);

        let sheet = sheet_from_range(&range, DateMode::Excel1900).expect("sheet built");

        assert_eq!(sheet.headers(), ["Name".to_string(), "2024".to_string()]);
        assert_eq!(sheet.column_count(), 2);
        assert_eq!(
            convert_to_rows(&sheet).expect("converts"),
            vec![
                vec![Scalar::from("Name"), Scalar::from("2024")],
                vec![Scalar::from("Ann"), Scalar::Float(1.5)],
                vec![Scalar::from("Bo"), Scalar::Absent],
            ]
        );
    }

    #[test]
    fn leading_blank_columns_keep_sheet_indices() {
        let range = range(&[
            ((0, 1), DataType::String("Amount".into())),
            ((1, 1), DataType::Float(1.0)),
            ((2, 1), DataType::String("x".into())),
        ]);

        let sheet = sheet_from_range(&range, DateMode::Excel1900).expect("sheet built");
        assert_eq!(sheet.headers(), [String::new(), "Amount".to_string()]);

        let error = convert_to_rows(&sheet).expect_err("mixed column fails");
        assert_eq!(
            error.to_string(),
            "error in column 1, \"Amount\": column contains multiple data types: Text, Number"
        );
    }

    #[test]
    fn leading_blank_rows_keep_sheet_rows() {
        let range = range(&[((2, 0), DataType::Float(5.0))]);

        let sheet = sheet_from_range(&range, DateMode::Excel1900).expect("sheet built");

        assert_eq!(
            convert_to_rows(&sheet).expect("converts"),
            vec![
                vec![Scalar::from("")],
                vec![Scalar::Absent],
                vec![Scalar::Integer(5)],
            ]
        );
    }

    #[test]
    fn unsupported_cells_report_sheet_positions() {
        let range = range(&[
            ((1, 2), DataType::String("Status".into())),
            ((2, 2), DataType::Error(calamine::CellErrorType::NA)),
        ]);

        let error = sheet_from_range(&range, DateMode::Excel1900).expect_err("error cell");
        assert!(matches!(
            error,
            ToolError::UnsupportedCell { row: 2, column: 2, .. }
        ));
    }

    #[test]
    fn restored_1904_times_do_not_pass_as_datetimes() {
        let range = range(&[
            ((0, 0), DataType::String("When".into())),
            ((1, 0), DataType::DateTime(45_292.0)),
            ((2, 0), DataType::DateTime(1_462.5)),
        ]);

        let sheet = sheet_from_range(&range, DateMode::Excel1904).expect("sheet built");
        let error = convert_to_rows(&sheet).expect_err("dates and times fail");

        match error {
            ToolError::Column { index, source, .. } => {
                assert_eq!(index, 0);
                assert_eq!(
                    source,
                    NormalizeError::MixedTemporal {
                        kinds: vec![TemporalKind::Date, TemporalKind::Time],
                    }
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_range_is_an_empty_sheet() {
        let sheet = sheet_from_range(&Range::empty(), DateMode::Excel1904).expect("sheet built");
        assert_eq!(sheet.column_count(), 0);
        assert_eq!(sheet.date_mode(), DateMode::Excel1904);
    }
}
