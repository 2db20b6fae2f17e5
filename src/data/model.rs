use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::Serialize;

use crate::error::{DatasetError, Result};

/// Lowercased ingredient names of one food item.
pub type IngredientSet = HashSet<String>;

// ---------------------------------------------------------------------------
// Value – a single cell of a food table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Used as a `BTreeMap` / `BTreeSet` key downstream, so `Value` must be `Ord`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Ingredient set produced by the cleaner.
    Set(IngredientSet),
    Null,
}

fn sorted_members(set: &IngredientSet) -> Vec<&String> {
    let mut members: Vec<&String> = set.iter().collect();
    members.sort();
    members
}

// -- Manual Eq/Ord/Hash so Value can key ordered maps and hash sets --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
                Set(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Set(a), Set(b)) => sorted_members(a).cmp(&sorted_members(b)),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Set(set) => sorted_members(set).hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Set(set) => {
                let members: Vec<&str> =
                    sorted_members(set).into_iter().map(String::as_str).collect();
                write!(f, "{{{}}}", members.join(", "))
            }
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Value {
    /// Try to interpret the value as an `f64` for numeric axes and ranges.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&IngredientSet> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Schema – ordered, typed column list
// ---------------------------------------------------------------------------

/// Declared type of a column, inferred once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Bool,
    Ingredients,
}

impl ColumnType {
    /// Infer a column type from its raw cells. Nulls are ignored; a column
    /// with nothing but nulls is `Text`.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> ColumnType {
        let mut seen: Option<ColumnType> = None;
        for value in values {
            let kind = match value {
                Value::Null => continue,
                Value::Integer(_) => ColumnType::Integer,
                Value::Float(_) => ColumnType::Float,
                Value::Bool(_) => ColumnType::Bool,
                Value::Text(_) => return ColumnType::Text,
                Value::Set(_) => ColumnType::Ingredients,
            };
            seen = Some(match (seen, kind) {
                (None, k) => k,
                (Some(a), b) if a == b => a,
                (Some(ColumnType::Integer), ColumnType::Float)
                | (Some(ColumnType::Float), ColumnType::Integer) => ColumnType::Float,
                _ => return ColumnType::Text,
            });
        }
        seen.unwrap_or(ColumnType::Text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub dtype: ColumnType,
}

impl Field {
    pub fn new(name: impl Into<String>, dtype: ColumnType) -> Self {
        Field {
            name: name.into(),
            dtype,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Schema { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Resolve a column name, failing with [`DatasetError::Column`].
    pub fn require(&self, name: &str) -> Result<usize> {
        self.index_of(name).ok_or_else(|| DatasetError::Column {
            column: name.to_string(),
            available: self.names(),
        })
    }

    pub fn field(&self, name: &str) -> Result<&Field> {
        let idx = self.require(name)?;
        Ok(&self.fields[idx])
    }

    pub(crate) fn set_dtype(&mut self, idx: usize, dtype: ColumnType) {
        self.fields[idx].dtype = dtype;
    }
}

// ---------------------------------------------------------------------------
// Frame – a typed, row-major table
// ---------------------------------------------------------------------------

/// A row-major table with an explicit schema. Every row has exactly
/// `schema.len()` cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    schema: Schema,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == schema.len()));
        Frame { schema, rows }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn into_parts(self) -> (Schema, Vec<Vec<Value>>) {
        (self.schema, self.rows)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the frame has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema.names()
    }

    /// Iterate over one column's cells in row order.
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Value> + '_> {
        let idx = self.schema.require(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Keep only `columns`, in the given order.
    pub fn project(&self, columns: &[&str]) -> Result<Frame> {
        let indices = columns
            .iter()
            .map(|c| self.schema.require(c))
            .collect::<Result<Vec<_>>>()?;
        let fields = indices
            .iter()
            .map(|&i| self.schema.fields[i].clone())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Frame::new(Schema::new(fields), rows))
    }

    /// Keep only the rows at `indices`, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Frame {
        let rows = indices
            .iter()
            .filter_map(|&i| self.rows.get(i).cloned())
            .collect();
        Frame::new(self.schema.clone(), rows)
    }

    /// Sorted set of distinct values in a column.
    pub fn unique_values(&self, name: &str) -> Result<BTreeSet<Value>> {
        Ok(self.column(name)?.cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// FlowCount – one aggregated (source, target) pair
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowCount {
    pub source: Value,
    pub target: Value,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn sample() -> Frame {
        let schema = Schema::new(vec![
            Field::new("name", ColumnType::Text),
            Field::new("diet", ColumnType::Text),
            Field::new("prep_time", ColumnType::Integer),
        ]);
        Frame::new(
            schema,
            vec![
                vec![text("boondi"), text("vegetarian"), Value::Integer(5)],
                vec![text("chicken tikka"), text("non vegetarian"), Value::Integer(120)],
                vec![text("jalebi"), text("vegetarian"), Value::Integer(10)],
            ],
        )
    }

    #[test]
    fn sets_compare_by_members_not_insertion_order() {
        let a: IngredientSet = ["sugar", "milk"].iter().map(|s| s.to_string()).collect();
        let b: IngredientSet = ["milk", "sugar"].iter().map(|s| s.to_string()).collect();
        assert_eq!(Value::Set(a.clone()).cmp(&Value::Set(b)), std::cmp::Ordering::Equal);
        assert_eq!(Value::Set(a).to_string(), "{milk, sugar}");
    }

    #[test]
    fn infer_widens_integers_to_floats_and_text_wins() {
        let ints = [Value::Integer(1), Value::Null, Value::Integer(3)];
        assert_eq!(ColumnType::infer(&ints), ColumnType::Integer);

        let mixed = [Value::Integer(1), Value::Float(2.5)];
        assert_eq!(ColumnType::infer(&mixed), ColumnType::Float);

        let texty = [Value::Integer(-1), text("punjab")];
        assert_eq!(ColumnType::infer(&texty), ColumnType::Text);

        assert_eq!(ColumnType::infer(&[Value::Null]), ColumnType::Text);
    }

    #[test]
    fn project_keeps_requested_order() {
        let frame = sample();
        let projected = frame.project(&["prep_time", "name"]).unwrap();
        assert_eq!(projected.column_names(), vec!["prep_time", "name"]);
        assert_eq!(projected.rows()[1], vec![Value::Integer(120), text("chicken tikka")]);
        assert_eq!(projected.len(), 3);
    }

    #[test]
    fn project_rejects_unknown_column() {
        let err = sample().project(&["name", "flavor_profile"]).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::Column { ref column, .. } if column == "flavor_profile"
        ));
    }

    #[test]
    fn unique_values_are_sorted_and_deduplicated() {
        let diets = sample().unique_values("diet").unwrap();
        let diets: Vec<String> = diets.iter().map(|v| v.to_string()).collect();
        assert_eq!(diets, vec!["non vegetarian", "vegetarian"]);
    }

    #[test]
    fn select_rows_skips_out_of_range_indices() {
        let picked = sample().select_rows(&[2, 0, 9]);
        let names: Vec<String> = picked.column("name").unwrap().map(|v| v.to_string()).collect();
        assert_eq!(names, vec!["jalebi", "boondi"]);
    }
}
