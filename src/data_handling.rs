//! Feature tables and the normalized data handed to backend adapters.
//!
//! `normalize` turns a `FeatureTable` into `TrainingData`: a numeric
//! feature matrix, labels re-leveled against the caller's `obs_levels` and
//! the feature names in table order. `TrainingData` also carries the row
//! pruning helpers used before dispatch and by the centroid adapter.
use std::collections::{BTreeSet, HashMap, HashSet};

use ndarray::{Array2, Axis};

use crate::error::TrainError;

/// Values of a single table column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<f64>),
    Integer(Vec<i64>),
    Logical(Vec<bool>),
    Text(Vec<String>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Integer(v) => v.len(),
            ColumnValues::Logical(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn to_numeric(&self, column: &str) -> Result<Vec<f64>, TrainError> {
        match self {
            ColumnValues::Numeric(v) => Ok(v.clone()),
            ColumnValues::Integer(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            ColumnValues::Logical(v) => Ok(v.iter().map(|&x| if x { 1.0 } else { 0.0 }).collect()),
            ColumnValues::Text(v) => v
                .iter()
                .enumerate()
                .map(|(row, raw)| parse_numeric(raw).ok_or_else(|| TrainError::TypeConversion {
                    column: column.to_string(),
                    row,
                    value: raw.clone(),
                }))
                .collect(),
        }
    }

    fn to_labels(&self) -> Vec<String> {
        match self {
            ColumnValues::Numeric(v) => v.iter().map(|x| x.to_string()).collect(),
            ColumnValues::Integer(v) => v.iter().map(|x| x.to_string()).collect(),
            ColumnValues::Logical(v) => v.iter().map(|x| x.to_string()).collect(),
            ColumnValues::Text(v) => v.clone(),
        }
    }
}

fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    match trimmed {
        "" | "NA" | "NaN" => Some(f64::NAN),
        _ => trimmed.parse::<f64>().ok(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

impl Column {
    pub fn new(name: &str, values: ColumnValues) -> Self {
        Self {
            name: name.to_string(),
            values,
        }
    }

    pub fn numeric(name: &str, values: Vec<f64>) -> Self {
        Self::new(name, ColumnValues::Numeric(values))
    }

    pub fn text<S: Into<String>>(name: &str, values: Vec<S>) -> Self {
        Self::new(name, ColumnValues::Text(values.into_iter().map(Into::into).collect()))
    }
}

/// Ordered named columns, one of which holds the class labels.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    columns: Vec<Column>,
    label: String,
}

impl FeatureTable {
    pub fn new(columns: Vec<Column>, label: &str) -> Result<Self, TrainError> {
        let Some(first) = columns.first() else {
            return Err(TrainError::InvalidTable("table has no columns".to_string()));
        };
        let n_rows = first.values.len();

        let mut seen = HashSet::new();
        for column in &columns {
            if column.values.len() != n_rows {
                return Err(TrainError::InvalidTable(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name,
                    column.values.len(),
                    n_rows
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(TrainError::InvalidTable(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }

        if !seen.contains(label) {
            return Err(TrainError::InvalidTable(format!(
                "label column '{}' not found",
                label
            )));
        }

        Ok(Self {
            columns,
            label: label.to_string(),
        })
    }

    pub fn n_rows(&self) -> usize {
        self.columns[0].values.len()
    }

    pub fn label_column(&self) -> &str {
        &self.label
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Feature column names in table order, without the label column.
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.name != self.label)
            .map(|c| c.name.clone())
            .collect()
    }
}

/// Class labels as codes into an ordered level set.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    pub codes: Vec<usize>,
    pub levels: Vec<String>,
}

impl Factor {
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.codes.iter().map(|&c| self.levels[c].as_str())
    }

    /// Rows per level, in level order.
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.levels.len()];
        for &c in &self.codes {
            counts[c] += 1;
        }
        counts
    }

    /// Removes levels that no row uses and recodes the rest, keeping level order.
    pub fn drop_unused_levels(&self) -> Factor {
        let counts = self.counts();
        let mut remap = vec![usize::MAX; self.levels.len()];
        let mut levels = Vec::new();
        for (i, level) in self.levels.iter().enumerate() {
            if counts[i] > 0 {
                remap[i] = levels.len();
                levels.push(level.clone());
            }
        }
        Factor {
            codes: self.codes.iter().map(|&c| remap[c]).collect(),
            levels,
        }
    }
}

/// Normalized training data for a single fitting call.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingData {
    /// Rows are samples, columns are features.
    pub x: Array2<f64>,
    /// Index into `obs_levels`; `None` marks a label outside `obs_levels`.
    pub labels: Vec<Option<usize>>,
    pub x_names: Vec<String>,
    pub obs_levels: Vec<String>,
}

impl TrainingData {
    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// Number of distinct valid labels present in the rows.
    pub fn n_observed_levels(&self) -> usize {
        self.labels.iter().flatten().collect::<BTreeSet<_>>().len()
    }

    pub fn select_rows(&self, rows: &[usize]) -> TrainingData {
        TrainingData {
            x: self.x.select(Axis(0), rows),
            labels: rows.iter().map(|&r| self.labels[r]).collect(),
            x_names: self.x_names.clone(),
            obs_levels: self.obs_levels.clone(),
        }
    }

    /// Indices of the rows whose label is in `obs_levels`, in row order.
    pub fn labelled_rows(&self) -> Vec<usize> {
        (0..self.n_rows())
            .filter(|&r| self.labels[r].is_some())
            .collect()
    }

    /// Drops rows whose label is not in `obs_levels`.
    pub fn into_labelled(self) -> Result<TrainingData, TrainError> {
        let keep = self.labelled_rows();
        if keep.is_empty() {
            return Err(TrainError::InvalidTable(
                "no row has a label listed in obs_levels".to_string(),
            ));
        }
        if keep.len() == self.n_rows() {
            return Ok(self);
        }
        log::warn!(
            "Dropping {} of {} rows whose label is not listed in obs_levels",
            self.n_rows() - keep.len(),
            self.n_rows()
        );
        Ok(self.select_rows(&keep))
    }

    /// Removes every row of a class with fewer than `min_size` rows.
    ///
    /// `obs_levels` is left untouched; only rows are pruned.
    pub fn drop_rare_classes(self, min_size: usize) -> TrainingData {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for label in self.labels.iter().flatten() {
            *counts.entry(*label).or_default() += 1;
        }

        let mut rare: Vec<usize> = counts
            .iter()
            .filter(|&(_, &n)| n < min_size)
            .map(|(&level, _)| level)
            .collect();
        if rare.is_empty() {
            return self;
        }
        rare.sort_unstable();

        log::info!(
            "Dropping classes with fewer than {} rows before fitting: {}",
            min_size,
            rare.iter()
                .map(|&l| self.obs_levels[l].as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let keep: Vec<usize> = (0..self.n_rows())
            .filter(|&r| match self.labels[r] {
                Some(level) => !rare.contains(&level),
                None => true,
            })
            .collect();
        self.select_rows(&keep)
    }

    /// Labels as a factor over `obs_levels`. Call on labelled data only.
    pub fn factor(&self) -> Factor {
        debug_assert!(self.labels.iter().all(Option::is_some));
        Factor {
            codes: self.labels.iter().flatten().copied().collect(),
            levels: self.obs_levels.clone(),
        }
    }
}

/// Builds `TrainingData` from a table and the caller's class universe.
pub fn normalize(table: &FeatureTable, obs_levels: &[String]) -> Result<TrainingData, TrainError> {
    if obs_levels.is_empty() {
        return Err(TrainError::InvalidObsLevels("must not be empty".to_string()));
    }
    let mut level_index: HashMap<&str, usize> = HashMap::with_capacity(obs_levels.len());
    for (i, level) in obs_levels.iter().enumerate() {
        if level_index.insert(level.as_str(), i).is_some() {
            return Err(TrainError::InvalidObsLevels(format!(
                "duplicate level '{}'",
                level
            )));
        }
    }

    let n_rows = table.n_rows();
    let mut x_names = Vec::new();
    let mut columns = Vec::new();
    let mut labels = Vec::new();

    for column in table.columns() {
        if column.name == table.label_column() {
            labels = column
                .values
                .to_labels()
                .iter()
                .map(|l| level_index.get(l.as_str()).copied())
                .collect();
        } else {
            columns.push(column.values.to_numeric(&column.name)?);
            x_names.push(column.name.clone());
        }
    }

    let n_features = x_names.len();
    let x = Array2::from_shape_fn((n_rows, n_features), |(r, c)| columns[c][r]);

    log::debug!(
        "Normalized {} rows x {} features against {} class levels",
        n_rows,
        n_features,
        obs_levels.len()
    );

    Ok(TrainingData {
        x,
        labels,
        x_names,
        obs_levels: obs_levels.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn table() -> FeatureTable {
        FeatureTable::new(
            vec![
                Column::numeric("a", vec![1.0, 2.0, 3.0, 4.0]),
                Column::text("class", vec!["x", "y", "z", "x"]),
                Column::new("b", ColumnValues::Integer(vec![5, 6, 7, 8])),
                Column::new("c", ColumnValues::Logical(vec![true, false, true, false])),
            ],
            "class",
        )
        .unwrap()
    }

    #[test]
    fn test_normalize_keeps_column_order_without_label() {
        let data = normalize(&table(), &levels(&["x", "y"])).unwrap();
        assert_eq!(data.x_names, vec!["a", "b", "c"]);
        assert_eq!(data.x.shape(), &[4, 3]);
        assert_eq!(data.x[[1, 1]], 6.0);
        assert_eq!(data.x[[1, 2]], 0.0);
    }

    #[test]
    fn test_normalize_marks_unknown_labels() {
        let data = normalize(&table(), &levels(&["x", "y"])).unwrap();
        assert_eq!(data.labels, vec![Some(0), Some(1), None, Some(0)]);
    }

    #[test]
    fn test_text_features_are_parsed() {
        let table = FeatureTable::new(
            vec![
                Column::text("f", vec![" 1.5", "NA", "2"]),
                Column::text("y", vec!["a", "b", "a"]),
            ],
            "y",
        )
        .unwrap();
        let data = normalize(&table, &levels(&["a", "b"])).unwrap();
        assert_eq!(data.x[[0, 0]], 1.5);
        assert!(data.x[[1, 0]].is_nan());
        assert_eq!(data.x[[2, 0]], 2.0);
    }

    #[test]
    fn test_unparsable_text_fails() {
        let table = FeatureTable::new(
            vec![
                Column::text("f", vec!["1", "oops"]),
                Column::text("y", vec!["a", "b"]),
            ],
            "y",
        )
        .unwrap();
        match normalize(&table, &levels(&["a", "b"])) {
            Err(TrainError::TypeConversion { column, row, value }) => {
                assert_eq!(column, "f");
                assert_eq!(row, 1);
                assert_eq!(value, "oops");
            }
            other => panic!("expected TypeConversion, got {:?}", other),
        }
    }

    #[test]
    fn test_integer_labels_match_text_levels() {
        let table = FeatureTable::new(
            vec![
                Column::numeric("f", vec![0.1, 0.2]),
                Column::new("y", ColumnValues::Integer(vec![1, 0])),
            ],
            "y",
        )
        .unwrap();
        let data = normalize(&table, &levels(&["0", "1"])).unwrap();
        assert_eq!(data.labels, vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_empty_or_duplicate_obs_levels_rejected() {
        assert!(matches!(
            normalize(&table(), &[]),
            Err(TrainError::InvalidObsLevels(_))
        ));
        assert!(matches!(
            normalize(&table(), &levels(&["x", "x"])),
            Err(TrainError::InvalidObsLevels(_))
        ));
    }

    #[test]
    fn test_table_rejects_ragged_and_missing_label() {
        let ragged = FeatureTable::new(
            vec![
                Column::numeric("f", vec![1.0]),
                Column::text("y", vec!["a", "b"]),
            ],
            "y",
        );
        assert!(matches!(ragged, Err(TrainError::InvalidTable(_))));

        let missing = FeatureTable::new(vec![Column::numeric("f", vec![1.0])], "y");
        assert!(matches!(missing, Err(TrainError::InvalidTable(_))));
    }

    #[test]
    fn test_into_labelled_drops_invalid_rows() {
        let data = normalize(&table(), &levels(&["x", "y"])).unwrap();
        assert_eq!(data.labelled_rows(), vec![0, 1, 3]);
        let labelled = data.into_labelled().unwrap();
        assert_eq!(labelled.n_rows(), 3);
        assert_eq!(labelled.x.column(0).to_vec(), vec![1.0, 2.0, 4.0]);
    }

    #[test]
    fn test_drop_rare_classes_keeps_obs_levels() {
        let data = normalize(&table(), &levels(&["x", "y", "z"])).unwrap();
        let pruned = data.drop_rare_classes(2);
        assert_eq!(pruned.labels, vec![Some(0), Some(0)]);
        assert_eq!(pruned.obs_levels, levels(&["x", "y", "z"]));
    }

    #[test]
    fn test_factor_drop_unused_levels() {
        let factor = Factor {
            codes: vec![2, 0, 2],
            levels: levels(&["a", "b", "c"]),
        };
        let dropped = factor.drop_unused_levels();
        assert_eq!(dropped.levels, levels(&["a", "c"]));
        assert_eq!(dropped.codes, vec![1, 0, 1]);
        assert_eq!(dropped.labels().collect::<Vec<_>>(), vec!["c", "a", "c"]);
    }
}
