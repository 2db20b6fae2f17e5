use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeStringArray, StringArray,
};
use arrow::datatypes::DataType;
use arrow::util::display::array_value_to_string;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::cleaner::{INGREDIENT_SEPARATOR, INGREDIENTS_COLUMN, NAME_COLUMN};
use super::model::{ColumnType, Field, Frame, Schema, Value};
use crate::config::LoadOptions;

pub const PREP_TIME_COLUMN: &str = "prep_time";
pub const COOK_TIME_COLUMN: &str = "cook_time";

/// Columns every food table must carry.
pub const REQUIRED_COLUMNS: [&str; 4] =
    [NAME_COLUMN, INGREDIENTS_COLUMN, PREP_TIME_COLUMN, COOK_TIME_COLUMN];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a raw (uncleaned) food table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.tsv` – header row, one food per line (reference format)
/// * `.json`         – `[{ "name": ..., "ingredients": ..., ... }, ...]`
/// * `.parquet`      – flat columns of strings, integers, floats, bools
///
/// Column types are inferred here; required columns and numeric duration
/// columns are checked before the table is returned.
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<Frame> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let frame = match ext.as_str() {
        "csv" => load_csv(path, options.delimiter_byte()?)?,
        "tsv" => load_csv(path, b'\t')?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };
    validate_raw(&frame)?;
    debug!(
        "loaded raw table from {}: {} rows, columns {:?}",
        path.display(),
        frame.len(),
        frame.column_names()
    );
    Ok(frame)
}

// ---------------------------------------------------------------------------
// Raw table assembly
// ---------------------------------------------------------------------------

/// Build a frame from untyped rows: infer each column's type, and render
/// every non-null cell of a textual column back to text.
fn build_frame(headers: Vec<String>, mut rows: Vec<Vec<Value>>) -> Result<Frame> {
    let mut seen = HashSet::new();
    for h in &headers {
        if !seen.insert(h.as_str()) {
            bail!("duplicate column '{h}'");
        }
    }

    let mut fields = Vec::with_capacity(headers.len());
    for (idx, name) in headers.into_iter().enumerate() {
        let dtype = ColumnType::infer(rows.iter().map(|r| &r[idx]));
        if dtype == ColumnType::Text {
            for row in &mut rows {
                let cell = &mut row[idx];
                if !matches!(cell, Value::Text(_) | Value::Null) {
                    *cell = Value::Text(cell.to_string());
                }
            }
        }
        fields.push(Field::new(name, dtype));
    }
    Ok(Frame::new(Schema::new(fields), rows))
}

fn validate_raw(frame: &Frame) -> Result<()> {
    for column in REQUIRED_COLUMNS {
        if frame.schema().index_of(column).is_none() {
            bail!("missing required column '{column}'");
        }
    }
    for column in [PREP_TIME_COLUMN, COOK_TIME_COLUMN] {
        let cells = frame.column(column)?;
        for (row, cell) in cells.enumerate() {
            if !matches!(cell, Value::Integer(_) | Value::Float(_) | Value::Null) {
                bail!("row {row}: '{column}' value '{cell}' is not a number");
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names, one food per record.
///
/// Each column is typed from all of its raw cells: it becomes integer,
/// float or boolean only when every non-empty cell parses as one. Any other
/// column keeps every cell's text exactly as written, so `007` stays `007`.
/// Empty cells are missing. Strings such as `NA` or `null` are ordinary text
/// here; list them in [`LoadOptions::extra_sentinels`] to treat them as
/// missing.
fn load_csv(path: &Path, delimiter: u8) -> Result<Frame> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    let mut n_rows = 0;
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        for (column, cell) in columns.iter_mut().zip(record.iter()) {
            column.push(cell.to_string());
        }
        n_rows += 1;
    }

    let mut typed: Vec<_> = columns
        .into_iter()
        .map(|cells| type_csv_column(&cells).into_iter())
        .collect();
    let rows: Vec<Vec<Value>> = (0..n_rows)
        .map(|_| typed.iter_mut().filter_map(Iterator::next).collect())
        .collect();

    build_frame(headers, rows)
}

fn type_csv_column(cells: &[String]) -> Vec<Value> {
    let present = move || cells.iter().filter(|s| !s.is_empty());
    let read: fn(&str) -> Option<Value> = if present().all(|s| s.parse::<i64>().is_ok()) {
        |s: &str| s.parse().ok().map(Value::Integer)
    } else if present().all(|s| s.parse::<f64>().is_ok()) {
        |s: &str| s.parse().ok().map(Value::Float)
    } else if present().all(|s| s == "true" || s == "false") {
        |s: &str| Some(Value::Bool(s == "true"))
    } else {
        |s: &str| Some(Value::Text(s.to_string()))
    };
    cells
        .iter()
        .map(|s| if s.is_empty() { Value::Null } else { read(s).unwrap_or(Value::Null) })
        .collect()
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "name": "Boondi", "ingredients": "Gram flour, ghee, sugar",
///     "diet": "vegetarian", "prep_time": 80, "cook_time": 30 },
///   ...
/// ]
/// ```
///
/// Columns follow first-seen key order; a key absent from a record is
/// missing. `ingredients` may also be an array of strings.
fn load_json(path: &Path) -> Result<Frame> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(JsonValue::as_object)
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map_or(Value::Null, json_to_value))
                .collect()
        })
        .collect();

    build_frame(headers, rows)
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        JsonValue::Array(items) if items.iter().all(JsonValue::is_string) => {
            let parts: Vec<&str> = items.iter().filter_map(JsonValue::as_str).collect();
            Value::Text(parts.join(INGREDIENT_SEPARATOR))
        }
        other => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file holding a flat food table.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Nested or exotic column types are
/// read through their display form.
fn load_parquet(path: &Path) -> Result<Frame> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows: Vec<Vec<Value>> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let columns = batch
            .columns()
            .iter()
            .zip(&headers)
            .map(|(col, name)| {
                column_values(col).with_context(|| format!("reading column '{name}'"))
            })
            .collect::<Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            rows.push(columns.iter().map(|col| col[row].clone()).collect());
        }
    }

    build_frame(headers, rows)
}

// -- Parquet / Arrow helpers --

macro_rules! downcast {
    ($col:expr, $ty:ty) => {
        $col.as_any()
            .downcast_ref::<$ty>()
            .context(concat!("expected ", stringify!($ty)))?
    };
}

/// Convert one Arrow column into cell values.
fn column_values(col: &ArrayRef) -> Result<Vec<Value>> {
    let n = col.len();
    let values: Vec<Value> = match col.data_type() {
        DataType::Utf8 => {
            let arr = downcast!(col, StringArray);
            (0..n).map(|i| non_null(arr, i, |i| Value::Text(arr.value(i).to_string()))).collect()
        }
        DataType::LargeUtf8 => {
            let arr = downcast!(col, LargeStringArray);
            (0..n).map(|i| non_null(arr, i, |i| Value::Text(arr.value(i).to_string()))).collect()
        }
        DataType::Int32 => {
            let arr = downcast!(col, Int32Array);
            (0..n).map(|i| non_null(arr, i, |i| Value::Integer(arr.value(i) as i64))).collect()
        }
        DataType::Int64 => {
            let arr = downcast!(col, Int64Array);
            (0..n).map(|i| non_null(arr, i, |i| Value::Integer(arr.value(i)))).collect()
        }
        DataType::Float32 => {
            let arr = downcast!(col, Float32Array);
            (0..n).map(|i| non_null(arr, i, |i| Value::Float(arr.value(i) as f64))).collect()
        }
        DataType::Float64 => {
            let arr = downcast!(col, Float64Array);
            (0..n).map(|i| non_null(arr, i, |i| Value::Float(arr.value(i)))).collect()
        }
        DataType::Boolean => {
            let arr = downcast!(col, BooleanArray);
            (0..n).map(|i| non_null(arr, i, |i| Value::Bool(arr.value(i)))).collect()
        }
        _ => (0..n)
            .map(|i| -> Result<Value> {
                if col.is_null(i) {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Text(array_value_to_string(col.as_ref(), i)?))
                }
            })
            .collect::<Result<Vec<_>>>()?,
    };
    Ok(values)
}

fn non_null(arr: &dyn Array, row: usize, read: impl Fn(usize) -> Value) -> Value {
    if arr.is_null(row) {
        Value::Null
    } else {
        read(row)
    }
}
