use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};

use crate::config::{DuplicateNamePolicy, LoadOptions};
use crate::data::cleaner::{
    clean_table_with, CleanOptions, CleanReport, INGREDIENTS_COLUMN, NAME_COLUMN,
};
use crate::data::filter::{filtered_indices, FilterState};
use crate::data::loader::{load_file, COOK_TIME_COLUMN, PREP_TIME_COLUMN};
use crate::data::model::{FlowCount, Frame, IngredientSet, Value};
use crate::error::{DatasetError, Result};

/// Columns that are never offered as filter / grouping keys.
pub const NON_FILTERABLE_COLUMNS: [&str; 4] =
    [NAME_COLUMN, INGREDIENTS_COLUMN, PREP_TIME_COLUMN, COOK_TIME_COLUMN];

// ---------------------------------------------------------------------------
// Dataset – immutable handle over one cleaned table
// ---------------------------------------------------------------------------

/// A cleaned food table. Built once, never mutated; share it with `Arc`.
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: Frame,
    report: CleanReport,
    name_idx: usize,
    ingredients_idx: usize,
}

impl Dataset {
    /// Read, clean and validate the table at `path`.
    pub fn load(path: &Path, options: &LoadOptions) -> Result<Self> {
        let raw = load_file(path, options).map_err(|e| DatasetError::load(path, &e))?;
        Self::from_raw(raw, options).map_err(|e| DatasetError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Clean an in-memory raw table and apply the load options to it.
    pub fn from_raw(raw: Frame, options: &LoadOptions) -> Result<Self> {
        let cleaned = clean_table_with(raw, &CleanOptions::from(options))?;
        let mut dataset = Self::from_frame(cleaned.frame)?;
        dataset.report = cleaned.report;
        dataset.apply_duplicate_policy(options.duplicate_names)?;

        if dataset.is_empty() && !options.allow_empty {
            return Err(DatasetError::Invalid(
                "no rows left after cleaning".to_string(),
            ));
        }
        Ok(dataset)
    }

    /// Wrap a table that has already been through the cleaner. No sentinel
    /// or missing-value checks are made here.
    pub(crate) fn from_frame(frame: Frame) -> Result<Self> {
        let name_idx = frame.schema().require(NAME_COLUMN)?;
        let ingredients_idx = frame.schema().require(INGREDIENTS_COLUMN)?;
        Ok(Dataset {
            frame,
            report: CleanReport::default(),
            name_idx,
            ingredients_idx,
        })
    }

    fn apply_duplicate_policy(&mut self, policy: DuplicateNamePolicy) -> Result<()> {
        let duplicates = self.duplicate_names();
        if duplicates.is_empty() {
            return Ok(());
        }
        match policy {
            DuplicateNamePolicy::KeepAll => {
                warn!(
                    "{} duplicate food names; name lookups return the last row: {:?}",
                    duplicates.len(),
                    duplicates
                );
            }
            DuplicateNamePolicy::Reject => {
                return Err(DatasetError::Invalid(format!(
                    "duplicate food names: {}",
                    duplicates.join(", ")
                )));
            }
            DuplicateNamePolicy::KeepFirst | DuplicateNamePolicy::KeepLast => {
                let rows = self.frame.rows();
                let mut seen: HashSet<&Value> = HashSet::new();
                let mut keep: Vec<usize> = if policy == DuplicateNamePolicy::KeepFirst {
                    (0..rows.len())
                        .filter(|&i| seen.insert(&rows[i][self.name_idx]))
                        .collect()
                } else {
                    (0..rows.len())
                        .rev()
                        .filter(|&i| seen.insert(&rows[i][self.name_idx]))
                        .collect()
                };
                keep.sort_unstable();
                let removed = rows.len() - keep.len();
                info!("dropped {removed} rows with duplicate names ({policy:?})");

                // Flagged indices refer to the table before deduplication.
                self.report.rows_deduplicated = removed;
                self.report.flagged_rows = self
                    .report
                    .flagged_rows
                    .iter()
                    .filter_map(|row| keep.binary_search(row).ok())
                    .collect();
                self.frame = self.frame.select_rows(&keep);
            }
        }
        Ok(())
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// What cleaning did to the raw table this dataset was built from.
    pub fn clean_report(&self) -> &CleanReport {
        &self.report
    }

    /// Number of food items.
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// The full table, or only `columns` in the given order. An empty
    /// column list also means the full table.
    pub fn get_table(&self, columns: Option<&[&str]>) -> Result<Frame> {
        match columns {
            Some(columns) if !columns.is_empty() => self.frame.project(columns),
            _ => Ok(self.frame.clone()),
        }
    }

    /// Every food name in row order, duplicates included.
    pub fn list_names(&self) -> Vec<String> {
        self.frame
            .rows()
            .iter()
            .map(|row| row[self.name_idx].to_string())
            .collect()
    }

    /// Ingredient sets of the named foods. Unknown names are left out; a
    /// name carried by several rows maps to the last of them.
    pub fn get_ingredients<I, S>(&self, names: I) -> BTreeMap<String, IngredientSet>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut result = BTreeMap::new();
        for (name, set) in self.matching_ingredients(names) {
            if result.insert(name.to_string(), set.clone()).is_some() {
                warn!("food name '{name}' matches several rows; keeping the last");
            }
        }
        result
    }

    /// Like [`Dataset::get_ingredients`] but keeps every matching row, in
    /// row order.
    pub fn get_ingredients_all<I, S>(&self, names: I) -> BTreeMap<String, Vec<IngredientSet>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut result: BTreeMap<String, Vec<IngredientSet>> = BTreeMap::new();
        for (name, set) in self.matching_ingredients(names) {
            result.entry(name.to_string()).or_default().push(set.clone());
        }
        result
    }

    fn matching_ingredients<I, S>(&self, names: I) -> Vec<(&str, &IngredientSet)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted: HashSet<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
        if wanted.is_empty() {
            return Vec::new();
        }
        self.frame
            .rows()
            .iter()
            .filter_map(|row| {
                let name = row[self.name_idx].as_text()?;
                let set = row[self.ingredients_idx].as_set()?;
                wanted.contains(name).then_some((name, set))
            })
            .collect()
    }

    /// Names carried by more than one row, sorted.
    pub fn duplicate_names(&self) -> Vec<String> {
        let mut counts: BTreeMap<&Value, usize> = BTreeMap::new();
        for row in self.frame.rows() {
            *counts.entry(&row[self.name_idx]).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Categorical columns usable as axes or grouping keys, in column order.
    pub fn list_filterable_columns(&self) -> Vec<String> {
        self.frame
            .column_names()
            .into_iter()
            .filter(|c| !NON_FILTERABLE_COLUMNS.contains(&c.as_str()))
            .collect()
    }

    /// Count rows per distinct `(source, target)` value pair.
    ///
    /// Pairs with fewer than `min_count` rows are left out, so `0` keeps
    /// everything. Results are ordered by `(source, target)`. Rows with a
    /// `Null` in either column are not counted.
    pub fn compute_flows(
        &self,
        source_col: &str,
        target_col: &str,
        min_count: usize,
    ) -> Result<Vec<FlowCount>> {
        let src = self.frame.schema().require(source_col)?;
        let tgt = self.frame.schema().require(target_col)?;

        let mut counts: BTreeMap<(&Value, &Value), usize> = BTreeMap::new();
        for row in self.frame.rows() {
            let (s, t) = (&row[src], &row[tgt]);
            if s.is_null() || t.is_null() {
                continue;
            }
            *counts.entry((s, t)).or_insert(0) += 1;
        }

        Ok(counts
            .into_iter()
            .filter(|(_, count)| *count >= min_count)
            .map(|((source, target), count)| FlowCount {
                source: source.clone(),
                target: target.clone(),
                count,
            })
            .collect())
    }

    /// Rows passing the categorical selections in `filters`.
    pub fn filter_rows(&self, filters: &FilterState) -> Result<Frame> {
        let indices = filtered_indices(&self.frame, filters)?;
        Ok(self.frame.select_rows(&indices))
    }
}

// ---------------------------------------------------------------------------
// FoodApi – the loadable entry point
// ---------------------------------------------------------------------------

/// Holds the active dataset. Queries fail with [`DatasetError::NotLoaded`]
/// until a load succeeds; a failed load keeps the previous dataset.
#[derive(Debug, Default)]
pub struct FoodApi {
    dataset: Option<Arc<Dataset>>,
    options: LoadOptions,
}

impl FoodApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: LoadOptions) -> Self {
        Self {
            dataset: None,
            options,
        }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Load and clean `path`, then replace the active dataset with it.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dataset = Dataset::load(path, &self.options)?;
        info!("loaded {} food items from {}", dataset.len(), path.display());
        self.dataset = Some(Arc::new(dataset));
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.dataset.is_some()
    }

    /// Shared handle to the active dataset, for readers on other threads.
    pub fn dataset(&self) -> Result<Arc<Dataset>> {
        self.dataset.clone().ok_or(DatasetError::NotLoaded)
    }

    fn current(&self) -> Result<&Dataset> {
        self.dataset.as_deref().ok_or(DatasetError::NotLoaded)
    }

    pub fn get_table(&self, columns: Option<&[&str]>) -> Result<Frame> {
        self.current()?.get_table(columns)
    }

    pub fn list_names(&self) -> Result<Vec<String>> {
        Ok(self.current()?.list_names())
    }

    pub fn get_ingredients<I, S>(&self, names: I) -> Result<BTreeMap<String, IngredientSet>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self.current()?.get_ingredients(names))
    }

    pub fn list_filterable_columns(&self) -> Result<Vec<String>> {
        Ok(self.current()?.list_filterable_columns())
    }

    pub fn compute_flows(
        &self,
        source_col: &str,
        target_col: &str,
        min_count: usize,
    ) -> Result<Vec<FlowCount>> {
        self.current()?.compute_flows(source_col, target_col, min_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MissingPolicy;
    use crate::data::model::{ColumnType, Field, Schema};

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn set(items: &[&str]) -> IngredientSet {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn raw(rows: &[(&str, &str, &str, &str, i64, i64)]) -> Frame {
        let schema = Schema::new(vec![
            Field::new("name", ColumnType::Text),
            Field::new("ingredients", ColumnType::Text),
            Field::new("diet", ColumnType::Text),
            Field::new("prep_time", ColumnType::Integer),
            Field::new("cook_time", ColumnType::Integer),
            Field::new("course", ColumnType::Text),
        ]);
        let rows = rows
            .iter()
            .map(|&(name, ing, diet, course, prep, cook)| {
                vec![
                    text(name),
                    text(ing),
                    text(diet),
                    Value::Integer(prep),
                    Value::Integer(cook),
                    text(course),
                ]
            })
            .collect();
        Frame::new(schema, rows)
    }

    fn dataset() -> Dataset {
        Dataset::from_raw(
            raw(&[
                ("Balu shahi", "Maida flour, yogurt, sugar", "vegetarian", "dessert", 45, 25),
                ("Boondi", "Gram flour, ghee, sugar", "vegetarian", "dessert", 80, 30),
                ("Chicken Tikka", "chicken, yogurt", "non vegetarian", "main course", 10, 30),
                ("Pakora", "gram flour, onion", "vegetarian", "snack", 10, 15),
                ("-1", "x, y", "vegetarian", "snack", 5, 5),
            ]),
            &LoadOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn table_projection_and_errors() {
        let ds = dataset();
        assert_eq!(ds.get_table(None).unwrap().len(), 4);
        let projected = ds.get_table(Some(&["course", "name"])).unwrap();
        assert_eq!(projected.column_names(), vec!["course", "name"]);
        assert!(matches!(
            ds.get_table(Some(&["region"])),
            Err(DatasetError::Column { .. })
        ));
    }

    #[test]
    fn empty_column_list_returns_full_table() {
        let ds = dataset();
        let table = ds.get_table(Some(&[])).unwrap();
        assert_eq!(table, ds.get_table(None).unwrap());
        assert_eq!(table.column_names().len(), 6);
    }

    #[test]
    fn names_follow_row_order() {
        assert_eq!(
            dataset().list_names(),
            vec!["balu shahi", "boondi", "chicken tikka", "pakora"]
        );
    }

    #[test]
    fn ingredients_for_known_names_only() {
        let ds = dataset();
        let found = ds.get_ingredients(["boondi", "jalebi"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found["boondi"], set(&["gram flour", "ghee", "sugar"]));

        assert!(ds.get_ingredients(["x"]).is_empty());
        assert!(ds.get_ingredients(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn duplicate_names_resolve_to_last_row() {
        let ds = Dataset::from_raw(
            raw(&[
                ("Halwa", "carrot, milk", "vegetarian", "dessert", 10, 40),
                ("halwa ", "semolina, ghee", "vegetarian", "dessert", 10, 20),
            ]),
            &LoadOptions::default(),
        )
        .unwrap();
        assert_eq!(ds.duplicate_names(), vec!["halwa"]);
        assert_eq!(
            ds.get_ingredients(["halwa"])["halwa"],
            set(&["semolina", "ghee"])
        );
        let all = ds.get_ingredients_all(["halwa"]);
        assert_eq!(all["halwa"].len(), 2);
        assert_eq!(all["halwa"][0], set(&["carrot", "milk"]));
    }

    #[test]
    fn duplicate_policies() {
        let rows = [
            ("Halwa", "carrot, milk", "vegetarian", "dessert", 10, 40),
            ("Kheer", "milk, rice", "vegetarian", "dessert", 10, 40),
            ("Halwa", "semolina, ghee", "vegetarian", "dessert", 10, 20),
        ];
        let with = |policy| LoadOptions {
            duplicate_names: policy,
            ..LoadOptions::default()
        };

        let err = Dataset::from_raw(raw(&rows), &with(DuplicateNamePolicy::Reject)).unwrap_err();
        assert!(matches!(err, DatasetError::Invalid(_)));

        let first = Dataset::from_raw(raw(&rows), &with(DuplicateNamePolicy::KeepFirst)).unwrap();
        assert_eq!(first.list_names(), vec!["halwa", "kheer"]);
        assert_eq!(first.get_ingredients(["halwa"])["halwa"], set(&["carrot", "milk"]));

        let last = Dataset::from_raw(raw(&rows), &with(DuplicateNamePolicy::KeepLast)).unwrap();
        assert_eq!(last.list_names(), vec!["kheer", "halwa"]);
        assert_eq!(last.get_ingredients(["halwa"])["halwa"], set(&["semolina", "ghee"]));
    }

    #[test]
    fn keep_first_remaps_flagged_rows() {
        let rows = [
            ("Halwa", "carrot, milk", "vegetarian", "dessert", 10, 40),
            ("Halwa", "semolina, ghee", "vegetarian", "dessert", 10, 20),
            ("Pinni", "ghee, sugar", "-1", "dessert", 15, 40),
        ];
        let options = LoadOptions {
            missing_policy: MissingPolicy::FlagAndKeep,
            duplicate_names: DuplicateNamePolicy::KeepFirst,
            ..LoadOptions::default()
        };
        let ds = Dataset::from_raw(raw(&rows), &options).unwrap();

        assert_eq!(ds.list_names(), vec!["halwa", "pinni"]);
        let report = ds.clean_report();
        assert_eq!(report.flagged_rows, vec![1]);
        assert_eq!(report.rows_deduplicated, 1);
        assert_eq!(report.rows_dropped, 0);
        for &row in &report.flagged_rows {
            assert_eq!(ds.frame().rows()[row][2], Value::Null);
        }
    }

    #[test]
    fn keep_last_drops_flagged_duplicates() {
        let rows = [
            ("Pinni", "ghee, sugar", "-1", "dessert", 15, 40),
            ("Kheer", "milk, rice", "vegetarian", "dessert", 10, 40),
            ("Pinni", "ghee, sugar, flour", "vegetarian", "dessert", 15, 40),
        ];
        let options = LoadOptions {
            missing_policy: MissingPolicy::FlagAndKeep,
            duplicate_names: DuplicateNamePolicy::KeepLast,
            ..LoadOptions::default()
        };
        let ds = Dataset::from_raw(raw(&rows), &options).unwrap();

        assert_eq!(ds.list_names(), vec!["kheer", "pinni"]);
        assert!(ds.clean_report().flagged_rows.is_empty());
        assert_eq!(ds.clean_report().rows_deduplicated, 1);
    }

    #[test]
    fn filterable_columns_exclude_fixed_fields() {
        let columns = dataset().list_filterable_columns();
        assert_eq!(columns, vec!["diet", "course"]);
        for excluded in NON_FILTERABLE_COLUMNS {
            assert!(!columns.iter().any(|c| c == excluded));
        }
    }

    #[test]
    fn flows_count_pairs_in_key_order() {
        let flows = dataset().compute_flows("course", "diet", 0).unwrap();
        let triples: Vec<(String, String, usize)> = flows
            .iter()
            .map(|f| (f.source.to_string(), f.target.to_string(), f.count))
            .collect();
        assert_eq!(
            triples,
            vec![
                ("dessert".into(), "vegetarian".into(), 2),
                ("main course".into(), "non vegetarian".into(), 1),
                ("snack".into(), "vegetarian".into(), 1),
            ]
        );
    }

    #[test]
    fn min_count_keeps_a_subset() {
        let ds = dataset();
        let all = ds.compute_flows("course", "diet", 0).unwrap();
        let frequent = ds.compute_flows("course", "diet", 2).unwrap();
        assert_eq!(frequent.len(), 1);
        assert!(frequent.iter().all(|f| f.count >= 2 && all.contains(f)));
        assert_eq!(
            all.iter().filter(|f| f.count >= 2).count(),
            frequent.len()
        );
    }

    #[test]
    fn flows_on_uniform_table_yield_one_entry() {
        let ds = Dataset::from_raw(
            raw(&[
                ("A", "x", "vegetarian", "snack", 1, 1),
                ("B", "y", "vegetarian", "snack", 1, 1),
                ("C", "z", "vegetarian", "snack", 1, 1),
            ]),
            &LoadOptions::default(),
        )
        .unwrap();
        let flows = ds.compute_flows("diet", "course", 0).unwrap();
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].count, 3);
    }

    #[test]
    fn flows_reject_unknown_columns() {
        let ds = dataset();
        assert!(matches!(
            ds.compute_flows("region", "diet", 0),
            Err(DatasetError::Column { .. })
        ));
        assert!(matches!(
            ds.compute_flows("diet", "state", 0),
            Err(DatasetError::Column { .. })
        ));
    }

    #[test]
    fn empty_table_is_allowed_unless_configured() {
        let rows = [("-1", "x", "vegetarian", "snack", 1, 1)];
        let ds = Dataset::from_raw(raw(&rows), &LoadOptions::default()).unwrap();
        assert!(ds.is_empty());
        assert!(ds.compute_flows("diet", "course", 0).unwrap().is_empty());

        let strict = LoadOptions {
            allow_empty: false,
            ..LoadOptions::default()
        };
        assert!(matches!(
            Dataset::from_raw(raw(&rows), &strict),
            Err(DatasetError::Invalid(_))
        ));
    }

    #[test]
    fn filter_rows_by_selection() {
        let ds = dataset();
        let mut filters = FilterState::new();
        filters.insert("course".into(), [text("dessert")].into_iter().collect());
        let desserts = ds.filter_rows(&filters).unwrap();
        assert_eq!(desserts.len(), 2);
    }

    #[test]
    fn queries_before_load_fail() {
        let api = FoodApi::new();
        assert!(!api.is_loaded());
        assert!(matches!(api.list_names(), Err(DatasetError::NotLoaded)));
        assert!(matches!(api.get_table(None), Err(DatasetError::NotLoaded)));
        assert!(matches!(
            api.get_ingredients(["boondi"]),
            Err(DatasetError::NotLoaded)
        ));
        assert!(matches!(
            api.list_filterable_columns(),
            Err(DatasetError::NotLoaded)
        ));
        assert!(matches!(
            api.compute_flows("diet", "course", 0),
            Err(DatasetError::NotLoaded)
        ));
        assert!(matches!(api.dataset(), Err(DatasetError::NotLoaded)));
    }

    #[test]
    fn load_of_missing_file_is_a_load_error() {
        let mut api = FoodApi::new();
        let err = api.load("/definitely/not/here/food.csv").unwrap_err();
        assert!(matches!(err, DatasetError::Load { .. }));
        assert!(!api.is_loaded());
    }
}
