use std::collections::{BTreeMap, BTreeSet};

use super::model::{Frame, Value};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Filter predicate: which unique values are selected per column
// ---------------------------------------------------------------------------

/// Per-column selection state: maps column_name → set of selected values.
/// A column absent from the map is unconstrained.
pub type FilterState = BTreeMap<String, BTreeSet<Value>>;

/// Initialise a [`FilterState`] with every value of `columns` selected
/// (i.e., show everything).
pub fn init_filter_state(frame: &Frame, columns: &[String]) -> Result<FilterState> {
    let mut state = FilterState::new();
    for col in columns {
        state.insert(col.clone(), frame.unique_values(col)?);
    }
    Ok(state)
}

/// Return indices of rows that pass all active filters.
///
/// A row passes a column filter when:
/// * The column is not present in `filters` → passes (no constraint)
/// * The filter set for that column is empty → nothing selected → fails
/// * The row's value for that column is in the selected set → passes
///
/// Fails with a column error if `filters` names a column the frame lacks.
pub fn filtered_indices(frame: &Frame, filters: &FilterState) -> Result<Vec<usize>> {
    let mut active = Vec::with_capacity(filters.len());
    for (col, selected) in filters {
        let idx = frame.schema().require(col)?;
        active.push((idx, selected));
    }

    Ok(frame
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            active
                .iter()
                .all(|(idx, selected)| selected.contains(&row[*idx]))
        })
        .map(|(i, _)| i)
        .collect())
}
