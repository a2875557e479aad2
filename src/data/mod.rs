//! Weather/generation dataset and the dense matrices the models consume.
//!
//! The dataset is read once at startup and never mutated; every later stage
//! works on projections ([`Dataset::features`], [`Dataset::targets`]) and on
//! row subsets produced by the splitter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub mod loader;
pub mod split;

pub use loader::load_dataset;
pub use split::{train_test_split, Split};

/// Weather columns used as model inputs, in model column order.
pub const FEATURE_COLUMNS: [&str; 4] = ["windspeed", "temperature", "rad_horizontal", "rad_diffuse"];

/// Generation columns the models predict, in prediction column order.
pub const TARGET_COLUMNS: [&str; 2] = ["solar_GW", "wind_GW"];

/// Row-major `f64` table with named columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    columns: Vec<String>,
    n_rows: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Build from row-major data.
    pub fn new(columns: Vec<String>, n_rows: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != n_rows * columns.len() {
            return Err(PipelineError::ShapeMismatch(format!(
                "{} values cannot fill {} rows x {} columns",
                data.len(),
                n_rows,
                columns.len()
            )));
        }
        Ok(Self {
            columns,
            n_rows,
            data,
        })
    }

    /// Build from rows; every row must have one value per column.
    pub fn from_rows(columns: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        let mut data = Vec::with_capacity(rows.len() * columns.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(PipelineError::ShapeMismatch(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Self::new(columns, rows.len(), data)
    }

    /// Build from named columns of equal length.
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let n_rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        if let Some((name, col)) = columns.iter().find(|(_, c)| c.len() != n_rows) {
            return Err(PipelineError::ShapeMismatch(format!(
                "column '{}' has {} rows, expected {}",
                name,
                col.len(),
                n_rows
            )));
        }

        let n_cols = columns.len();
        let mut data = vec![0.0; n_rows * n_cols];
        for (j, (_, col)) in columns.iter().enumerate() {
            for (i, v) in col.iter().enumerate() {
                data[i * n_cols + j] = *v;
            }
        }
        let names = columns.into_iter().map(|(name, _)| name).collect();
        Self::new(names, n_rows, data)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Row-major values.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn row(&self, i: usize) -> &[f64] {
        let n_cols = self.n_cols();
        &self.data[i * n_cols..(i + 1) * n_cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.n_rows).map(move |i| self.row(i))
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
    }

    /// Copy of the `j`-th column.
    pub fn column_at(&self, j: usize) -> Vec<f64> {
        self.rows().map(|row| row[j]).collect()
    }

    /// Copy of the named column.
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.column_at(self.column_index(name)?))
    }

    /// Project onto the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Matrix> {
        let idx = names
            .iter()
            .map(|n| self.column_index(n))
            .collect::<Result<Vec<_>>>()?;

        let mut data = Vec::with_capacity(self.n_rows * idx.len());
        for row in self.rows() {
            data.extend(idx.iter().map(|&j| row[j]));
        }
        Matrix::new(names.iter().map(|n| n.to_string()).collect(), self.n_rows, data)
    }

    /// New matrix holding the given rows, in the given order.
    pub fn take_rows(&self, positions: &[usize]) -> Matrix {
        let mut data = Vec::with_capacity(positions.len() * self.n_cols());
        for &i in positions {
            data.extend_from_slice(self.row(i));
        }
        Matrix {
            columns: self.columns.clone(),
            n_rows: positions.len(),
            data,
        }
    }
}

/// Time-indexed weather and generation table.
#[derive(Debug, Clone)]
pub struct Dataset {
    index: Vec<DateTime<Utc>>,
    values: Matrix,
}

impl Dataset {
    pub fn new(index: Vec<DateTime<Utc>>, values: Matrix) -> Result<Self> {
        if index.len() != values.n_rows() {
            return Err(PipelineError::ShapeMismatch(format!(
                "index has {} entries, table has {} rows",
                index.len(),
                values.n_rows()
            )));
        }
        Ok(Self { index, values })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn values(&self) -> &Matrix {
        &self.values
    }

    /// Weather feature matrix (X).
    pub fn features(&self) -> Result<Matrix> {
        self.values.select(&FEATURE_COLUMNS)
    }

    /// Generation target matrix (y).
    pub fn targets(&self) -> Result<Matrix> {
        self.values.select(&TARGET_COLUMNS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_matrix_from_columns_is_row_major() {
        let m = Matrix::from_columns(vec![
            ("a".to_string(), vec![1.0, 2.0, 3.0]),
            ("b".to_string(), vec![10.0, 20.0, 30.0]),
        ])
        .unwrap();

        assert_eq!(m.n_rows(), 3);
        assert_eq!(m.n_cols(), 2);
        assert_eq!(m.row(1), &[2.0, 20.0]);
        assert_eq!(m.column("b").unwrap(), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_matrix_rejects_ragged_input() {
        let err = Matrix::from_rows(names(&["a", "b"]), &[vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(err, Err(PipelineError::ShapeMismatch(_))));

        let err = Matrix::from_columns(vec![
            ("a".to_string(), vec![1.0, 2.0]),
            ("b".to_string(), vec![1.0]),
        ]);
        assert!(matches!(err, Err(PipelineError::ShapeMismatch(_))));
    }

    #[test]
    fn test_select_reorders_and_reports_missing() {
        let m = Matrix::from_rows(names(&["a", "b", "c"]), &[vec![1.0, 2.0, 3.0]]).unwrap();

        let s = m.select(&["c", "a"]).unwrap();
        assert_eq!(s.columns(), &["c".to_string(), "a".to_string()]);
        assert_eq!(s.row(0), &[3.0, 1.0]);

        assert!(matches!(m.select(&["zzz"]), Err(PipelineError::MissingColumn(c)) if c == "zzz"));
    }

    #[test]
    fn test_take_rows() {
        let m = Matrix::from_rows(names(&["a"]), &[vec![0.0], vec![1.0], vec![2.0]]).unwrap();
        let t = m.take_rows(&[2, 0]);
        assert_eq!(t.as_slice(), &[2.0, 0.0]);
        assert_eq!(t.n_rows(), 2);
    }

    #[test]
    fn test_dataset_projections() {
        let mut cols: Vec<(String, Vec<f64>)> = FEATURE_COLUMNS
            .iter()
            .chain(TARGET_COLUMNS.iter())
            .enumerate()
            .map(|(j, n)| (n.to_string(), vec![j as f64; 2]))
            .collect();
        cols.push(("extra".to_string(), vec![99.0; 2]));
        let values = Matrix::from_columns(cols).unwrap();
        let ts = chrono::Utc::now();
        let ds = Dataset::new(vec![ts, ts], values).unwrap();

        let x = ds.features().unwrap();
        let y = ds.targets().unwrap();
        assert_eq!(x.n_cols(), 4);
        assert_eq!(x.row(0), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(y.row(1), &[4.0, 5.0]);
    }

    #[test]
    fn test_dataset_index_length_must_match() {
        let values = Matrix::from_rows(names(&["a"]), &[vec![1.0]]).unwrap();
        assert!(Dataset::new(vec![], values).is_err());
    }
}
