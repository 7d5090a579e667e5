//! Layer inputs: response matrices, significance partitions and the
//! collaborators that supply them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SelectivityError};

/// One layer's raw activations, `[presentation, unit]`, row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ResponseMatrixRecord")]
pub struct ResponseMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct ResponseMatrixRecord {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<ResponseMatrixRecord> for ResponseMatrix {
    type Error = SelectivityError;

    fn try_from(record: ResponseMatrixRecord) -> Result<Self> {
        Self::new(record.rows, record.cols, record.data)
    }
}

impl ResponseMatrix {
    /// Wrap a row-major buffer; `data.len()` must be `rows * cols`
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(SelectivityError::shape(
                format!("{rows} x {cols} = {} values", rows * cols),
                format!("{} values", data.len()),
            ));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from per-unit response columns
    pub fn from_columns(columns: &[Vec<f64>]) -> Result<Self> {
        let cols = columns.len();
        let rows = columns.first().map_or(0, Vec::len);
        if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
            return Err(SelectivityError::shape(
                format!("{rows} responses per unit"),
                format!("{} responses", bad.len()),
            ));
        }

        let mut data = vec![0.0; rows * cols];
        for (u, column) in columns.iter().enumerate() {
            for (r, v) in column.iter().enumerate() {
                data[r * cols + u] = *v;
            }
        }
        Ok(Self { rows, cols, data })
    }

    /// Stimulus presentations
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Units in the layer
    pub fn units(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, unit: usize) -> Option<f64> {
        if row < self.rows && unit < self.cols {
            Some(self.data[row * self.cols + unit])
        } else {
            None
        }
    }

    /// Response of one unit across all presentations
    pub fn column(&self, unit: usize) -> Vec<f64> {
        if unit >= self.cols {
            return Vec::new();
        }
        self.data.iter().skip(unit).step_by(self.cols).copied().collect()
    }
}

/// Significant (ANOVA) units of a layer and their complement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignificancePartition {
    unit_count: usize,
    significant: Vec<usize>,
    non_significant: Vec<usize>,
}

impl SignificancePartition {
    /// Deduplicate and sort `significant`; every index must be below `unit_count`
    pub fn new(significant: impl IntoIterator<Item = usize>, unit_count: usize) -> Result<Self> {
        let mut significant: Vec<usize> = significant.into_iter().collect();
        significant.sort_unstable();
        significant.dedup();

        if let Some(&max) = significant.last() {
            if max >= unit_count {
                return Err(SelectivityError::InvalidInput(format!(
                    "significant unit {max} out of range for {unit_count} units"
                )));
            }
        }

        let mut flags = vec![false; unit_count];
        for &i in &significant {
            flags[i] = true;
        }
        let non_significant = (0..unit_count).filter(|&i| !flags[i]).collect();

        Ok(Self {
            unit_count,
            significant,
            non_significant,
        })
    }

    pub fn unit_count(&self) -> usize {
        self.unit_count
    }

    /// Significant units, ascending
    pub fn significant(&self) -> &[usize] {
        &self.significant
    }

    /// Complement of [`Self::significant`], ascending
    pub fn non_significant(&self) -> &[usize] {
        &self.non_significant
    }

    pub fn is_significant(&self, unit: usize) -> bool {
        self.significant.binary_search(&unit).is_ok()
    }
}

/// Supplies per-layer response matrices
pub trait FeatureStore {
    fn response_matrix(&self, layer: &str) -> Result<ResponseMatrix>;
}

/// Supplies per-layer significant unit indices
pub trait SignificanceProvider {
    fn significant_units(&self, layer: &str) -> Result<Vec<usize>>;
}

impl FeatureStore for BTreeMap<String, ResponseMatrix> {
    fn response_matrix(&self, layer: &str) -> Result<ResponseMatrix> {
        self.get(layer)
            .cloned()
            .ok_or_else(|| SelectivityError::MissingDependency(format!("features for layer {layer}")))
    }
}

impl SignificanceProvider for BTreeMap<String, Vec<usize>> {
    fn significant_units(&self, layer: &str) -> Result<Vec<usize>> {
        self.get(layer)
            .cloned()
            .ok_or_else(|| SelectivityError::MissingDependency(format!("significance for layer {layer}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_column() {
        // 3 presentations x 2 units
        let m = ResponseMatrix::new(3, 2, vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0]).unwrap();
        assert_eq!(m.units(), 2);
        assert_eq!(m.rows(), 3);
        assert_eq!(m.column(0), vec![1.0, 2.0, 3.0]);
        assert_eq!(m.column(1), vec![10.0, 20.0, 30.0]);
        assert!(m.column(2).is_empty());
        assert_eq!(m.get(2, 1), Some(30.0));
        assert_eq!(m.get(3, 0), None);
    }

    #[test]
    fn test_matrix_from_columns() {
        let m = ResponseMatrix::from_columns(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.column(1), vec![3.0, 4.0]);
        assert!(ResponseMatrix::from_columns(&[vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_matrix_shape_error() {
        assert!(matches!(
            ResponseMatrix::new(2, 2, vec![0.0; 3]),
            Err(SelectivityError::Shape { .. })
        ));
    }

    #[test]
    fn test_deserialize_checks_shape() {
        let bad = serde_json::json!({ "rows": 2, "cols": 2, "data": [1.0, 2.0, 3.0] });
        assert!(serde_json::from_value::<ResponseMatrix>(bad).is_err());

        let good = serde_json::json!({ "rows": 1, "cols": 2, "data": [1.0, 2.0] });
        let m: ResponseMatrix = serde_json::from_value(good).unwrap();
        assert_eq!(m.column(1), vec![2.0]);
    }

    #[test]
    fn test_partition_complement() {
        let p = SignificancePartition::new([4, 1, 1], 6).unwrap();
        assert_eq!(p.significant(), &[1, 4]);
        assert_eq!(p.non_significant(), &[0, 2, 3, 5]);
        assert!(p.is_significant(4));
        assert!(!p.is_significant(0));
    }

    #[test]
    fn test_partition_out_of_range() {
        let err = SignificancePartition::new([6], 6).unwrap_err();
        assert!(matches!(err, SelectivityError::InvalidInput(_)));
    }

    #[test]
    fn test_map_collaborators() {
        let mut features = BTreeMap::new();
        features.insert("conv1".to_string(), ResponseMatrix::new(1, 1, vec![0.0]).unwrap());
        assert!(features.response_matrix("conv1").is_ok());
        assert!(matches!(
            features.response_matrix("fc"),
            Err(SelectivityError::MissingDependency(_))
        ));
    }
}
