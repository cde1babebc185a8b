//! Per-type value normalizers.
//!
//! Each normalizer turns a column's raw data values into canonical
//! [`Scalar`]s, one per row, preserving row order. Which one runs is decided
//! by [`Normalizer::for_type`] from the column's resolved type.

pub mod temporal;

use crate::aideon::tools::error::NormalizeError;
use crate::aideon::tools::model::{
    CellType, DateMode, LogicalColumnType, NormalizedColumn, RawValue, Scalar,
};

/// Closed set of normalizers, one per resolvable column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    Empty,
    Text,
    Number,
    Boolean,
    Temporal,
}

impl Normalizer {
    pub fn for_type(column_type: LogicalColumnType) -> Self {
        match column_type {
            LogicalColumnType::Empty => Normalizer::Empty,
            LogicalColumnType::Text => Normalizer::Text,
            LogicalColumnType::Number => Normalizer::Number,
            LogicalColumnType::Boolean => Normalizer::Boolean,
            LogicalColumnType::Date | LogicalColumnType::Time | LogicalColumnType::DateTime => {
                Normalizer::Temporal
            }
        }
    }

    /// Runs the normalizer over one column's data values.
    pub fn normalize<'a, I>(
        self,
        values: I,
        date_mode: DateMode,
    ) -> Result<NormalizedColumn, NormalizeError>
    where
        I: IntoIterator<Item = &'a RawValue>,
    {
        match self {
            Normalizer::Empty => Ok(NormalizedColumn::new(
                LogicalColumnType::Empty,
                normalize_empty(values),
            )),
            Normalizer::Text => Ok(NormalizedColumn::new(
                LogicalColumnType::Text,
                normalize_text(values)?,
            )),
            Normalizer::Number => Ok(NormalizedColumn::new(
                LogicalColumnType::Number,
                normalize_numbers(values)?,
            )),
            Normalizer::Boolean => Ok(NormalizedColumn::new(
                LogicalColumnType::Boolean,
                normalize_booleans(values),
            )),
            Normalizer::Temporal => temporal::normalize_dates(values, date_mode),
        }
    }
}

/// Every row of an empty column is absent, whatever the raw content.
pub fn normalize_empty<'a, I>(values: I) -> Vec<Scalar>
where
    I: IntoIterator<Item = &'a RawValue>,
{
    values.into_iter().map(|_| Scalar::Absent).collect()
}

/// Blank strings become absent; everything else passes through untouched.
pub fn normalize_text<'a, I>(values: I) -> Result<Vec<Scalar>, NormalizeError>
where
    I: IntoIterator<Item = &'a RawValue>,
{
    values
        .into_iter()
        .map(|value| match value {
            value if value.is_blank() => Ok(Scalar::Absent),
            RawValue::Text(text) => Ok(Scalar::Text(text.clone())),
            other => Err(unexpected(CellType::Text, other)),
        })
        .collect()
}

/// Integrality is decided for the whole column: one fractional value turns
/// every row into a float.
pub fn normalize_numbers<'a, I>(values: I) -> Result<Vec<Scalar>, NormalizeError>
where
    I: IntoIterator<Item = &'a RawValue>,
{
    let numbers = values
        .into_iter()
        .map(|value| match value {
            value if value.is_blank() => Ok(None),
            RawValue::Number(number) => Ok(Some(*number)),
            other => Err(unexpected(CellType::Number, other)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let integral = numbers.iter().flatten().all(|number| number % 1.0 == 0.0);

    if integral {
        numbers
            .into_iter()
            .map(|number| match number {
                Some(number) => to_integer(number).map(Scalar::Integer),
                None => Ok(Scalar::Absent),
            })
            .collect()
    } else {
        Ok(numbers
            .into_iter()
            .map(|number| number.map_or(Scalar::Absent, Scalar::Float))
            .collect())
    }
}

/// Blank becomes absent; anything else becomes its truthiness.
pub fn normalize_booleans<'a, I>(values: I) -> Vec<Scalar>
where
    I: IntoIterator<Item = &'a RawValue>,
{
    values
        .into_iter()
        .map(|value| match value {
            value if value.is_blank() => Scalar::Absent,
            RawValue::Boolean(flag) => Scalar::Boolean(*flag),
            RawValue::Number(number) => Scalar::Boolean(*number != 0.0),
            RawValue::Text(_) => Scalar::Boolean(true),
            RawValue::Blank => Scalar::Absent,
        })
        .collect()
}

// i64::MIN is exactly representable; i64::MAX rounds up to 2^63.
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

fn to_integer(number: f64) -> Result<i64, NormalizeError> {
    if (I64_LOWER..I64_UPPER).contains(&number) {
        Ok(number.trunc() as i64)
    } else {
        Err(NormalizeError::IntegerOverflow(number))
    }
}

pub(crate) fn unexpected(expected: CellType, found: &RawValue) -> NormalizeError {
    NormalizeError::UnexpectedValue {
        expected,
        found: found.kind(),
    }
}
