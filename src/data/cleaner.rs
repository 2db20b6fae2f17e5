use std::collections::BTreeMap;

use log::{debug, info};
use serde::Serialize;

use super::model::{ColumnType, Frame, IngredientSet, Value};
use crate::config::{LoadOptions, MissingPolicy};
use crate::error::Result;

pub const NAME_COLUMN: &str = "name";
pub const INGREDIENTS_COLUMN: &str = "ingredients";

/// Raw placeholder meaning "value unknown".
pub const SENTINEL: &str = "-1";

/// Separator between ingredients in the raw text. Purely textual: a comma
/// without a following space does not split.
pub const INGREDIENT_SEPARATOR: &str = ", ";

/// Text used by [`MissingPolicy::ImputeDefault`] for text columns.
pub const UNKNOWN_TEXT: &str = "unknown";

// ---------------------------------------------------------------------------
// Field normalizers
// ---------------------------------------------------------------------------

/// Lowercase, then trim surrounding whitespace.
pub fn normalize_name(raw: &str) -> String {
    raw.to_lowercase().trim().to_string()
}

/// Lowercase the whole string and split it on `", "` into a set.
/// An empty string yields a set holding one empty string.
pub fn normalize_ingredients(raw: &str) -> IngredientSet {
    raw.to_lowercase()
        .split(INGREDIENT_SEPARATOR)
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Table cleaning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    pub policy: MissingPolicy,
    pub extra_sentinels: Vec<String>,
}

impl From<&LoadOptions> for CleanOptions {
    fn from(options: &LoadOptions) -> Self {
        CleanOptions {
            policy: options.missing_policy,
            extra_sentinels: options.extra_sentinels.clone(),
        }
    }
}

/// What the cleaning pass did to the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub rows_in: usize,
    pub rows_dropped: usize,
    pub rows_imputed: usize,
    /// Rows removed afterwards by a keep-first / keep-last duplicate-name
    /// policy. Not included in `rows_dropped`.
    pub rows_deduplicated: usize,
    /// Output row indices kept with `Null` cells under
    /// [`MissingPolicy::FlagAndKeep`].
    pub flagged_rows: Vec<usize>,
    /// Missing cells seen per column, before the policy was applied.
    pub missing_by_column: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct CleanedTable {
    pub frame: Frame,
    pub report: CleanReport,
}

/// Clean a raw table with the default drop-row policy.
pub fn clean_table(raw: Frame) -> Result<Frame> {
    clean_table_with(raw, &CleanOptions::default()).map(|cleaned| cleaned.frame)
}

/// Normalize `name` and `ingredients`, treat every sentinel in every column
/// as missing, then apply `options.policy` to rows with missing cells.
///
/// Fails only when `name` or `ingredients` is not a column of `raw`.
/// Dropping rows is not an error; the result may be empty.
pub fn clean_table_with(raw: Frame, options: &CleanOptions) -> Result<CleanedTable> {
    let name_idx = raw.schema().require(NAME_COLUMN)?;
    let ingredients_idx = raw.schema().require(INGREDIENTS_COLUMN)?;

    let (mut schema, rows) = raw.into_parts();
    schema.set_dtype(name_idx, ColumnType::Text);
    schema.set_dtype(ingredients_idx, ColumnType::Ingredients);
    let names = schema.names();

    let mut report = CleanReport {
        rows_in: rows.len(),
        ..CleanReport::default()
    };
    let mut cleaned = Vec::with_capacity(rows.len());

    for mut row in rows {
        normalize_cell(&mut row[name_idx], |s| Value::Text(normalize_name(s)));
        normalize_cell(&mut row[ingredients_idx], |s| {
            Value::Set(normalize_ingredients(s))
        });

        let mut missing = false;
        for (col_idx, cell) in row.iter_mut().enumerate() {
            if is_sentinel(cell, &options.extra_sentinels) {
                *cell = Value::Null;
                missing = true;
                *report
                    .missing_by_column
                    .entry(names[col_idx].clone())
                    .or_insert(0) += 1;
            }
        }

        if !missing {
            cleaned.push(row);
            continue;
        }

        match options.policy {
            MissingPolicy::DropRow => report.rows_dropped += 1,
            MissingPolicy::ImputeDefault => {
                for (cell, field) in row.iter_mut().zip(schema.fields()) {
                    if cell.is_null() {
                        *cell = default_for(field.dtype);
                    }
                }
                report.rows_imputed += 1;
                cleaned.push(row);
            }
            MissingPolicy::FlagAndKeep => {
                report.flagged_rows.push(cleaned.len());
                cleaned.push(row);
            }
        }
    }

    info!(
        "cleaned table: {} rows in, {} dropped, {} imputed, {} flagged",
        report.rows_in,
        report.rows_dropped,
        report.rows_imputed,
        report.flagged_rows.len()
    );
    for (column, count) in &report.missing_by_column {
        debug!("column '{column}': {count} missing values");
    }

    Ok(CleanedTable {
        frame: Frame::new(schema, cleaned),
        report,
    })
}

/// Apply a text normalizer to a cell. Non-text cells are normalized through
/// their display form; `Null` stays `Null`.
fn normalize_cell(cell: &mut Value, normalize: impl Fn(&str) -> Value) {
    *cell = match &*cell {
        Value::Null => return,
        Value::Text(s) => normalize(s),
        other => normalize(&other.to_string()),
    };
}

fn is_sentinel(value: &Value, extra: &[String]) -> bool {
    match value {
        Value::Null => true,
        Value::Text(s) => s == SENTINEL || extra.iter().any(|e| e == s),
        Value::Integer(i) => *i == -1,
        Value::Float(f) => *f == -1.0 || f.is_nan(),
        Value::Set(set) => set.len() == 1 && set.contains(SENTINEL),
        Value::Bool(_) => false,
    }
}

fn default_for(dtype: ColumnType) -> Value {
    match dtype {
        ColumnType::Text => Value::Text(UNKNOWN_TEXT.to_string()),
        ColumnType::Integer => Value::Integer(0),
        ColumnType::Float => Value::Float(0.0),
        ColumnType::Bool => Value::Bool(false),
        ColumnType::Ingredients => Value::Set(IngredientSet::new()),
    }
}
