use std::fmt;

/// Type tag attached to every raw cell by the workbook reader.
///
/// The declaration order doubles as the display order used when a column
/// reports the set of tags it mixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CellType {
    Empty,
    Text,
    Number,
    Date,
    Boolean,
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CellType::Empty => "Empty",
            CellType::Text => "Text",
            CellType::Number => "Number",
            CellType::Date => "Date",
            CellType::Boolean => "Boolean",
        };
        f.write_str(name)
    }
}

/// Raw cell payload as the workbook stores it. Date cells carry their serial
/// day count as a [`RawValue::Number`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Blank,
    Text(String),
    Number(f64),
    Boolean(bool),
}

impl RawValue {
    /// Blank cells and zero-length strings both count as "no value".
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Blank => true,
            RawValue::Text(value) => value.is_empty(),
            _ => false,
        }
    }

    /// Short name of the payload kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::Blank => "blank",
            RawValue::Text(_) => "text",
            RawValue::Number(_) => "number",
            RawValue::Boolean(_) => "boolean",
        }
    }
}

/// A single data cell: payload plus the reader's type tag.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCell {
    pub value: RawValue,
    pub cell_type: CellType,
}

impl RawCell {
    pub fn new(value: RawValue, cell_type: CellType) -> Self {
        Self { value, cell_type }
    }

    pub fn empty() -> Self {
        Self::new(RawValue::Blank, CellType::Empty)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(RawValue::Text(value.into()), CellType::Text)
    }

    pub fn number(value: f64) -> Self {
        Self::new(RawValue::Number(value), CellType::Number)
    }

    /// A date cell holding its serial day count.
    pub fn date(serial: f64) -> Self {
        Self::new(RawValue::Number(serial), CellType::Date)
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(RawValue::Boolean(value), CellType::Boolean)
    }
}

/// One sheet column with its header split off from the data cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// 0-based position of the column in the sheet.
    pub index: usize,
    /// Header cell text, verbatim.
    pub header: String,
    /// Data cells in row order; row `i` lines up across every column.
    pub cells: Vec<RawCell>,
}

impl Column {
    pub fn new(index: usize, header: impl Into<String>, cells: Vec<RawCell>) -> Self {
        Self {
            index,
            header: header.into(),
            cells,
        }
    }

    pub fn types(&self) -> impl Iterator<Item = CellType> + '_ {
        self.cells.iter().map(|cell| cell.cell_type)
    }

    pub fn values(&self) -> impl Iterator<Item = &RawValue> + '_ {
        self.cells.iter().map(|cell| &cell.value)
    }
}

/// Epoch convention used by the workbook for date serials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateMode {
    /// Serial 1 is 1900-01-01, including the fictitious 1900-02-29.
    #[default]
    Excel1900,
    /// Serial 0 is 1904-01-01.
    Excel1904,
}

impl DateMode {
    /// Maps the raw workbook flag (0 or 1) onto a mode.
    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(DateMode::Excel1900),
            1 => Some(DateMode::Excel1904),
            _ => None,
        }
    }

    pub fn flag(self) -> u8 {
        match self {
            DateMode::Excel1900 => 0,
            DateMode::Excel1904 => 1,
        }
    }
}

/// Sub-kind a decoded temporal cell falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TemporalKind {
    Date,
    Time,
    DateTime,
}

impl fmt::Display for TemporalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TemporalKind::Date => "date",
            TemporalKind::Time => "time",
            TemporalKind::DateTime => "datetime",
        };
        f.write_str(name)
    }
}

/// The single type a whole column resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalColumnType {
    Empty,
    Text,
    Number,
    Boolean,
    Date,
    Time,
    DateTime,
}

impl From<CellType> for LogicalColumnType {
    fn from(cell_type: CellType) -> Self {
        match cell_type {
            CellType::Empty => LogicalColumnType::Empty,
            CellType::Text => LogicalColumnType::Text,
            CellType::Number => LogicalColumnType::Number,
            CellType::Date => LogicalColumnType::Date,
            CellType::Boolean => LogicalColumnType::Boolean,
        }
    }
}

impl From<TemporalKind> for LogicalColumnType {
    fn from(kind: TemporalKind) -> Self {
        match kind {
            TemporalKind::Date => LogicalColumnType::Date,
            TemporalKind::Time => LogicalColumnType::Time,
            TemporalKind::DateTime => LogicalColumnType::DateTime,
        }
    }
}

/// Canonical output cell. Temporal values arrive here already serialized
/// to ISO-8601 text.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Absent,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Boolean(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Absent => Ok(()),
            Scalar::Text(value) => f.write_str(value),
            Scalar::Integer(value) => write!(f, "{value}"),
            // Floats keep a fractional digit so a fractional column never
            // renders its integral members like integers.
            Scalar::Float(value) if value.is_finite() && value.fract() == 0.0 => {
                write!(f, "{value:.1}")
            }
            Scalar::Float(value) => write!(f, "{value}"),
            Scalar::Boolean(value) => write!(f, "{value}"),
        }
    }
}

/// Normalized values for one column, plus the type they were normalized to.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedColumn {
    pub column_type: LogicalColumnType,
    pub values: Vec<Scalar>,
}

impl NormalizedColumn {
    pub fn new(column_type: LogicalColumnType, values: Vec<Scalar>) -> Self {
        Self {
            column_type,
            values,
        }
    }
}

/// One output row, one scalar per column.
pub type OutputRow = Vec<Scalar>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_covers_empty_strings() {
        assert!(RawValue::Blank.is_blank());
        assert!(RawValue::Text(String::new()).is_blank());
        assert!(!RawValue::Text(" ".into()).is_blank());
        assert!(!RawValue::Number(0.0).is_blank());
    }

    #[test]
    fn floats_render_with_fraction() {
        assert_eq!(Scalar::Float(1.0).to_string(), "1.0");
        assert_eq!(Scalar::Float(2.5).to_string(), "2.5");
        assert_eq!(Scalar::Float(-3.0).to_string(), "-3.0");
        assert_eq!(Scalar::Integer(3).to_string(), "3");
        assert_eq!(Scalar::Boolean(false).to_string(), "false");
        assert_eq!(Scalar::Absent.to_string(), "");
    }

    #[test]
    fn date_mode_flags() {
        assert_eq!(DateMode::from_flag(0), Some(DateMode::Excel1900));
        assert_eq!(DateMode::from_flag(1), Some(DateMode::Excel1904));
        assert_eq!(DateMode::from_flag(2), None);
        assert_eq!(DateMode::Excel1904.flag(), 1);
    }
}
