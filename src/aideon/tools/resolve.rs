use std::collections::BTreeSet;

use crate::aideon::tools::error::NormalizeError;
use crate::aideon::tools::model::{CellType, LogicalColumnType};

/// Determines the single type shared by a column's data cells.
///
/// Empty cells never disqualify a column. A column with no non-empty cells
/// resolves to [`LogicalColumnType::Empty`]; more than one distinct
/// non-empty tag is a [`NormalizeError::MixedType`]. Temporal columns come
/// back as [`LogicalColumnType::Date`] and are refined by the temporal
/// normalizer.
pub fn resolve<I>(types: I) -> Result<LogicalColumnType, NormalizeError>
where
    I: IntoIterator<Item = CellType>,
{
    let mut distinct: BTreeSet<CellType> = types.into_iter().collect();
    distinct.remove(&CellType::Empty);

    if distinct.len() > 1 {
        return Err(NormalizeError::MixedType {
            types: distinct.into_iter().collect(),
        });
    }

    Ok(distinct
        .into_iter()
        .next()
        .map(LogicalColumnType::from)
        .unwrap_or(LogicalColumnType::Empty))
}
