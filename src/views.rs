//! Chart-shaped aggregates over cleaned frames.
//!
//! Nothing here draws anything: each function reduces a frame or a query
//! result to the exact structure a chart needs (set regions, a range-filtered
//! frame, a count matrix, coded flow links).

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::data::model::{FlowCount, Frame, IngredientSet, Value};
use crate::error::{DatasetError, Result};

// ---------------------------------------------------------------------------
// Ingredient overlaps (three-set venn)
// ---------------------------------------------------------------------------

/// The seven regions of a three-set venn diagram, members sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetOverlaps {
    pub labels: [String; 3],
    pub only_a: Vec<String>,
    pub only_b: Vec<String>,
    pub only_c: Vec<String>,
    pub ab: Vec<String>,
    pub ac: Vec<String>,
    pub bc: Vec<String>,
    pub abc: Vec<String>,
}

/// Split exactly three ingredient sets into venn regions. Labels follow the
/// map's key order.
pub fn ingredient_overlaps(sets: &BTreeMap<String, IngredientSet>) -> Result<SetOverlaps> {
    let [(la, a), (lb, b), (lc, c)]: [(&String, &IngredientSet); 3] = sets
        .iter()
        .collect::<Vec<_>>()
        .try_into()
        .map_err(|_| DatasetError::SetCount {
            expected: 3,
            found: sets.len(),
        })?;

    let region = |inside: &[&IngredientSet], outside: &[&IngredientSet]| -> Vec<String> {
        let members: BTreeSet<&String> = inside[0]
            .iter()
            .filter(|item| inside[1..].iter().all(|s| s.contains(*item)))
            .filter(|item| outside.iter().all(|s| !s.contains(*item)))
            .collect();
        members.into_iter().cloned().collect()
    };

    Ok(SetOverlaps {
        labels: [la.clone(), lb.clone(), lc.clone()],
        only_a: region(&[a], &[b, c]),
        only_b: region(&[b], &[a, c]),
        only_c: region(&[c], &[a, b]),
        ab: region(&[a, b], &[c]),
        ac: region(&[a, c], &[b]),
        bc: region(&[b, c], &[a]),
        abc: region(&[a, b, c], &[]),
    })
}

// ---------------------------------------------------------------------------
// Numeric range filter (scatter plot)
// ---------------------------------------------------------------------------

/// Rows whose numeric `column` value lies in `[min, max]`. Non-numeric
/// cells never match.
pub fn range_filter(frame: &Frame, column: &str, min: f64, max: f64) -> Result<Frame> {
    let indices: Vec<usize> = frame
        .column(column)?
        .enumerate()
        .filter(|(_, v)| v.as_f64().is_some_and(|x| x >= min && x <= max))
        .map(|(i, _)| i)
        .collect();
    Ok(frame.select_rows(&indices))
}

// ---------------------------------------------------------------------------
// Cross-tabulation (category heatmap)
// ---------------------------------------------------------------------------

/// Counts of rows per `(row value, column value)`. `counts[r][c]` is `None`
/// where the count fell below the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossTab {
    pub row_labels: Vec<Value>,
    pub col_labels: Vec<Value>,
    pub counts: Vec<Vec<Option<usize>>>,
}

impl CrossTab {
    pub fn get(&self, row: &Value, col: &Value) -> Option<usize> {
        let r = self.row_labels.binary_search(row).ok()?;
        let c = self.col_labels.binary_search(col).ok()?;
        self.counts[r][c]
    }
}

/// Cross-tabulate two columns. Labels are the sorted distinct non-null
/// values; with `threshold > 0`, cells counting less than it (including
/// absent combinations) are masked.
pub fn crosstab(
    frame: &Frame,
    row_col: &str,
    col_col: &str,
    threshold: usize,
) -> Result<CrossTab> {
    let rows: Vec<&Value> = frame.column(row_col)?.collect();
    let cols: Vec<&Value> = frame.column(col_col)?.collect();

    let mut pairs: BTreeMap<(&Value, &Value), usize> = BTreeMap::new();
    for (r, c) in rows.into_iter().zip(cols) {
        if r.is_null() || c.is_null() {
            continue;
        }
        *pairs.entry((r, c)).or_insert(0) += 1;
    }

    let row_labels: Vec<Value> = pairs
        .keys()
        .map(|(r, _)| *r)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .cloned()
        .collect();
    let col_labels: Vec<Value> = pairs
        .keys()
        .map(|(_, c)| *c)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .cloned()
        .collect();

    let counts = row_labels
        .iter()
        .map(|r| {
            col_labels
                .iter()
                .map(|c| {
                    let n = pairs.get(&(r, c)).copied().unwrap_or(0);
                    (threshold == 0 || n >= threshold).then_some(n)
                })
                .collect()
        })
        .collect();

    Ok(CrossTab {
        row_labels,
        col_labels,
        counts,
    })
}

// ---------------------------------------------------------------------------
// Flow coding (sankey)
// ---------------------------------------------------------------------------

/// Flow links with node labels replaced by indices into `labels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SankeyLinks {
    pub labels: Vec<String>,
    /// `(source index, target index, count)`
    pub links: Vec<(usize, usize, usize)>,
}

/// Code flow endpoints as indices into the sorted union of their labels.
/// A value appearing as both source and target shares one node.
pub fn sankey_coding(flows: &[FlowCount]) -> SankeyLinks {
    let labels: Vec<String> = flows
        .iter()
        .flat_map(|f| [f.source.to_string(), f.target.to_string()])
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let index = |v: &Value| labels.binary_search(&v.to_string()).unwrap_or_default();
    let links = flows
        .iter()
        .map(|f| (index(&f.source), index(&f.target), f.count))
        .collect();

    SankeyLinks { labels, links }
}
