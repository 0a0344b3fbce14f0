//! Tables as ordered named columns, and the replay table environment.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::scalar::Scalar;

/// A single named column: a sequence of scalar cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub values: Vec<Scalar>,
}

impl Column {
    pub fn new(values: Vec<Scalar>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// Non-null numeric values, in row order.
    pub fn numeric_values(&self) -> Vec<f64> {
        self.values.iter().filter_map(Scalar::as_f64).collect()
    }
}

impl FromIterator<Scalar> for Column {
    fn from_iter<I: IntoIterator<Item = Scalar>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// The mutable name -> table mapping built up during one replay.
/// Insertion order is user-visible, so this is an ordered map.
pub type TableEnv = IndexMap<String, Table>;

/// A table: ordered named columns sharing one row count.
/// The row index is implicit (0..n_rows).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: IndexMap<String, Column>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, col)| col.len())
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .get(name)
            .ok_or_else(|| ModelError::ColumnNotFound(name.to_string()))
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(name, col)| (name.as_str(), col))
    }

    /// Insert or replace a column. The column must match the current row
    /// count unless it is the table's only column; replacing an existing
    /// column keeps its position.
    pub fn set_column(&mut self, name: &str, column: Column) -> Result<()> {
        let sole_column = self.columns.len() == 1 && self.columns.contains_key(name);
        if !self.columns.is_empty() && !sole_column {
            let expected = self.n_rows();
            if column.len() != expected {
                return Err(ModelError::LengthMismatch {
                    expected,
                    got: column.len(),
                });
            }
        }
        self.columns.insert(name.to_string(), column);
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        self.columns
            .shift_remove(name)
            .map(|_| ())
            .ok_or_else(|| ModelError::ColumnNotFound(name.to_string()))
    }

    /// Rename a column in place, keeping its position.
    pub fn rename_column(&mut self, old: &str, new: &str) -> Result<()> {
        if !self.columns.contains_key(old) {
            return Err(ModelError::ColumnNotFound(old.to_string()));
        }
        if old != new && self.columns.contains_key(new) {
            return Err(ModelError::DuplicateColumn(new.to_string()));
        }
        let old_columns = std::mem::take(&mut self.columns);
        self.columns = old_columns
            .into_iter()
            .map(|(name, col)| {
                if name == old {
                    (new.to_string(), col)
                } else {
                    (name, col)
                }
            })
            .collect();
        Ok(())
    }

    /// One row as an ordered name -> value mapping.
    pub fn row(&self, idx: usize) -> IndexMap<String, Scalar> {
        self.columns
            .iter()
            .map(|(name, col)| {
                let value = col.values.get(idx).cloned().unwrap_or(Scalar::Null);
                (name.clone(), value)
            })
            .collect()
    }

    /// New table keeping the given row indices, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| {
                let values = indices
                    .iter()
                    .map(|&i| col.values.get(i).cloned().unwrap_or(Scalar::Null))
                    .collect();
                (name.clone(), Column::new(values))
            })
            .collect();
        Table { columns }
    }

    /// New table keeping rows where the mask is true. The mask must cover
    /// every row; extra entries are ignored.
    pub fn filter_mask(&self, mask: &[bool]) -> Table {
        let indices: Vec<usize> = (0..self.n_rows()).filter(|&i| mask.get(i) == Some(&true)).collect();
        self.take_rows(&indices)
    }

    /// Build a table from row mappings. Columns appear in first-seen order;
    /// missing cells are null.
    pub fn from_rows(rows: &[IndexMap<String, Scalar>]) -> Table {
        let mut names: Vec<String> = Vec::new();
        for row in rows {
            for key in row.keys() {
                if !names.iter().any(|n| n == key) {
                    names.push(key.clone());
                }
            }
        }
        let columns = names
            .into_iter()
            .map(|name| {
                let values = rows
                    .iter()
                    .map(|row| row.get(&name).cloned().unwrap_or(Scalar::Null))
                    .collect();
                (name, Column::new(values))
            })
            .collect();
        Table { columns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::new();
        t.set_column("a", Column::new(vec![Scalar::Int(1), Scalar::Int(2)]))
            .unwrap();
        t.set_column(
            "b",
            Column::new(vec![Scalar::Str("x".into()), Scalar::Str("y".into())]),
        )
        .unwrap();
        t
    }

    #[test]
    fn test_set_column_rejects_length_mismatch() {
        let mut t = sample();
        let err = t.set_column("c", Column::new(vec![Scalar::Int(1)]));
        assert!(matches!(
            err,
            Err(ModelError::LengthMismatch {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn test_rename_keeps_position() {
        let mut t = sample();
        t.rename_column("a", "z").unwrap();
        let names: Vec<&str> = t.column_names().collect();
        assert_eq!(names, vec!["z", "b"]);
    }

    #[test]
    fn test_filter_mask() {
        let t = sample();
        let filtered = t.filter_mask(&[false, true]);
        assert_eq!(filtered.n_rows(), 1);
        assert_eq!(filtered.column("a").unwrap().values[0], Scalar::Int(2));
    }

    #[test]
    fn test_from_rows_unions_columns() {
        let mut r1 = IndexMap::new();
        r1.insert("a".to_string(), Scalar::Int(1));
        let mut r2 = IndexMap::new();
        r2.insert("b".to_string(), Scalar::Int(2));
        let t = Table::from_rows(&[r1, r2]);
        assert_eq!(t.n_rows(), 2);
        assert_eq!(t.n_cols(), 2);
        assert!(t.column("a").unwrap().values[1].is_null());
        assert!(t.column("b").unwrap().values[0].is_null());
    }
}
