//! Date cell normalization.
//!
//! Date cells hold a floating point day count. Each non-blank value is
//! decoded into a calendar tuple under the workbook's [`DateMode`],
//! classified as a date, a time, or a datetime, and the set of classes seen
//! in the column is then reconciled through [`reconcile`] before everything
//! is serialized to ISO-8601 text.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::aideon::tools::error::NormalizeError;
use crate::aideon::tools::model::{
    CellType, DateMode, LogicalColumnType, NormalizedColumn, RawValue, Scalar, TemporalKind,
};
use crate::aideon::tools::normalize::unexpected;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// First day count that lands past 9999-12-31 in the 1900 system.
const DAYS_TOO_LARGE_1900: i64 = 2_958_466;
/// The 1904 system starts 1462 days later.
const DAYS_TOO_LARGE_1904: i64 = DAYS_TOO_LARGE_1900 - 1462;

/// Day counts below this fall on or before the fictitious 1900-02-29.
const FIRST_UNAMBIGUOUS_DAY_1900: i64 = 61;

/// Calendar components decoded from a serial. A zero date part means the
/// serial carried no day count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTuple {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl DateTuple {
    const ZERO: DateTuple = DateTuple {
        year: 0,
        month: 0,
        day: 0,
        hour: 0,
        minute: 0,
        second: 0,
    };

    fn time_only(hour: u32, minute: u32, second: u32) -> Self {
        Self {
            hour,
            minute,
            second,
            ..Self::ZERO
        }
    }

    fn date_is_zero(&self) -> bool {
        self.year == 0 && self.month == 0 && self.day == 0
    }

    fn time_is_zero(&self) -> bool {
        self.hour == 0 && self.minute == 0 && self.second == 0
    }
}

/// Day zero of the serial count. In the 1900 system this only holds from
/// serial 61 (1900-03-01) onwards.
pub fn epoch(mode: DateMode) -> Option<NaiveDate> {
    match mode {
        DateMode::Excel1900 => NaiveDate::from_ymd_opt(1899, 12, 30),
        DateMode::Excel1904 => NaiveDate::from_ymd_opt(1904, 1, 1),
    }
}

/// Decodes a spreadsheet serial into calendar components.
///
/// A serial of exactly zero decodes to the all-zero tuple. Fractions of a
/// day are rounded to the nearest second, and a fraction that rounds up to a
/// full day rolls over into the next date.
pub fn decode_serial(serial: f64, mode: DateMode) -> Result<DateTuple, NormalizeError> {
    if serial == 0.0 {
        return Ok(DateTuple::ZERO);
    }
    if serial < 0.0 {
        return Err(NormalizeError::DateNegative(serial));
    }
    if !serial.is_finite() {
        return Err(NormalizeError::DateTooLarge(serial));
    }

    let mut days = serial.trunc() as i64;
    let fraction = serial - serial.trunc();
    let seconds = (fraction * SECONDS_PER_DAY).round_ties_even() as u32;

    let (hour, minute, second) = if seconds >= 86_400 {
        days += 1;
        (0, 0, 0)
    } else {
        (seconds / 3600, (seconds / 60) % 60, seconds % 60)
    };

    let limit = match mode {
        DateMode::Excel1900 => DAYS_TOO_LARGE_1900,
        DateMode::Excel1904 => DAYS_TOO_LARGE_1904,
    };
    if days >= limit {
        return Err(NormalizeError::DateTooLarge(serial));
    }
    if days == 0 {
        return Ok(DateTuple::time_only(hour, minute, second));
    }
    if mode == DateMode::Excel1900 && days < FIRST_UNAMBIGUOUS_DAY_1900 {
        return Err(NormalizeError::DateAmbiguous(serial));
    }

    let date = epoch(mode)
        .and_then(|epoch| epoch.checked_add_signed(Duration::days(days)))
        .ok_or(NormalizeError::DateTooLarge(serial))?;

    Ok(DateTuple {
        year: date.year(),
        month: date.month(),
        day: date.day(),
        hour,
        minute,
        second,
    })
}

/// A decoded temporal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalValue {
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl TemporalValue {
    pub fn kind(&self) -> TemporalKind {
        match self {
            TemporalValue::Date(_) => TemporalKind::Date,
            TemporalValue::Time(_) => TemporalKind::Time,
            TemporalValue::DateTime(_) => TemporalKind::DateTime,
        }
    }

    /// Promotes a date to midnight of the same day; other values are returned as is.
    pub fn promote(self) -> Self {
        match self {
            TemporalValue::Date(date) => TemporalValue::DateTime(date.and_time(NaiveTime::MIN)),
            other => other,
        }
    }

    /// Canonical ISO-8601 text for the value.
    pub fn to_iso(&self) -> String {
        match self {
            TemporalValue::Date(date) => date.format("%Y-%m-%d").to_string(),
            TemporalValue::Time(time) => time.format("%H:%M:%S").to_string(),
            TemporalValue::DateTime(datetime) => {
                datetime.format("%Y-%m-%dT%H:%M:%S").to_string()
            }
        }
    }
}

/// Classifies a decoded tuple.
///
/// The all-zero tuple is a midnight time, not a date. This means a serial of
/// exactly zero never becomes a date.
pub fn classify(tuple: DateTuple, serial: f64) -> Result<TemporalValue, NormalizeError> {
    let time = NaiveTime::from_hms_opt(tuple.hour, tuple.minute, tuple.second)
        .ok_or(NormalizeError::DateTooLarge(serial))?;

    if tuple.date_is_zero() {
        return Ok(TemporalValue::Time(time));
    }

    let date = NaiveDate::from_ymd_opt(tuple.year, tuple.month, tuple.day)
        .ok_or(NormalizeError::DateTooLarge(serial))?;

    if tuple.time_is_zero() {
        Ok(TemporalValue::Date(date))
    } else {
        Ok(TemporalValue::DateTime(date.and_time(time)))
    }
}

/// What to do with a column given the distinct kinds it decoded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Zero or one kind present; values stay as decoded.
    Keep,
    /// Dates mixed with datetimes; dates become midnight datetimes.
    PromoteDates,
    /// The kinds cannot share a column.
    Reject,
}

pub fn reconcile(kinds: &BTreeSet<TemporalKind>) -> Reconciliation {
    if kinds.len() <= 1 {
        return Reconciliation::Keep;
    }

    let has = |kind| kinds.contains(&kind);
    match (
        has(TemporalKind::Date),
        has(TemporalKind::Time),
        has(TemporalKind::DateTime),
    ) {
        (true, false, true) => Reconciliation::PromoteDates,
        _ => Reconciliation::Reject,
    }
}

/// Normalizes a column of date cells into ISO-8601 strings.
///
/// The returned column type is the reconciled kind, or
/// [`LogicalColumnType::Date`] when every cell is blank.
pub fn normalize_dates<'a, I>(
    values: I,
    mode: DateMode,
) -> Result<NormalizedColumn, NormalizeError>
where
    I: IntoIterator<Item = &'a RawValue>,
{
    let decoded = values
        .into_iter()
        .map(|value| match value {
            value if value.is_blank() => Ok(None),
            RawValue::Number(serial) => {
                decode_serial(*serial, mode).and_then(|tuple| classify(tuple, *serial).map(Some))
            }
            other => Err(unexpected(CellType::Date, other)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let kinds: BTreeSet<TemporalKind> = decoded.iter().flatten().map(TemporalValue::kind).collect();

    let (column_type, decoded) = match reconcile(&kinds) {
        Reconciliation::Keep => {
            let column_type = kinds
                .first()
                .copied()
                .map_or(LogicalColumnType::Date, LogicalColumnType::from);
            (column_type, decoded)
        }
        Reconciliation::PromoteDates => {
            let promoted = decoded
                .into_iter()
                .map(|value| value.map(TemporalValue::promote))
                .collect();
            (LogicalColumnType::DateTime, promoted)
        }
        Reconciliation::Reject => {
            return Err(NormalizeError::MixedTemporal {
                kinds: kinds.into_iter().collect(),
            });
        }
    };

    let values = decoded
        .into_iter()
        .map(|value| value.map_or(Scalar::Absent, |value| Scalar::Text(value.to_iso())))
        .collect();

    Ok(NormalizedColumn::new(column_type, values))
}
