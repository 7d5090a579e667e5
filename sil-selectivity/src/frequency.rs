//! # Frequency Aggregator
//!
//! For each category, the share of a layer's units that encode each
//! identity. Counts are normalized by the layer's total unit count, not by
//! the category size, so categories stay comparable as fractions of the
//! whole layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classifier::UnitEncoding;
use crate::error::{Result, SelectivityError};
use crate::sorter::SortResult;
use crate::taxonomy::IdentityPool;

/// Identities × layers, row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FrequencyMatrixRecord")]
pub struct FrequencyMatrix {
    num_classes: usize,
    num_layers: usize,
    data: Vec<f64>,
}

/// Unchecked serialized form of [`FrequencyMatrix`]
#[derive(Deserialize)]
struct FrequencyMatrixRecord {
    num_classes: usize,
    num_layers: usize,
    data: Vec<f64>,
}

impl TryFrom<FrequencyMatrixRecord> for FrequencyMatrix {
    type Error = SelectivityError;

    fn try_from(record: FrequencyMatrixRecord) -> Result<Self> {
        let expected = record.num_classes * record.num_layers;
        if record.data.len() != expected {
            return Err(SelectivityError::shape(
                format!("{} x {} = {expected} frequencies", record.num_classes, record.num_layers),
                format!("{} frequencies", record.data.len()),
            ));
        }
        Ok(Self {
            num_classes: record.num_classes,
            num_layers: record.num_layers,
            data: record.data,
        })
    }
}

impl FrequencyMatrix {
    /// Stack per-layer frequency vectors as columns, in layer order
    pub fn from_columns(num_classes: usize, columns: &[Vec<f64>]) -> Result<Self> {
        let num_layers = columns.len();
        let mut data = vec![0.0; num_classes * num_layers];
        for (layer, column) in columns.iter().enumerate() {
            if column.len() != num_classes {
                return Err(SelectivityError::shape(
                    format!("{num_classes} identities"),
                    format!("{} identities", column.len()),
                ));
            }
            for (identity, v) in column.iter().enumerate() {
                data[identity * num_layers + layer] = *v;
            }
        }
        Ok(Self {
            num_classes,
            num_layers,
            data,
        })
    }

    /// Identities (rows)
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Layers (columns)
    pub fn num_layers(&self) -> usize {
        self.num_layers
    }

    /// `None` outside the matrix
    pub fn get(&self, identity: usize, layer: usize) -> Option<f64> {
        if identity < self.num_classes && layer < self.num_layers {
            Some(self.data[identity * self.num_layers + layer])
        } else {
            None
        }
    }

    /// Frequencies of one identity across layers
    pub fn row(&self, identity: usize) -> &[f64] {
        if identity >= self.num_classes {
            return &[];
        }
        &self.data[identity * self.num_layers..(identity + 1) * self.num_layers]
    }

    /// Frequency vector of one layer
    pub fn column(&self, layer: usize) -> Vec<f64> {
        if layer >= self.num_layers {
            return Vec::new();
        }
        (0..self.num_classes).map(|i| self.data[i * self.num_layers + layer]).collect()
    }

    /// Smallest frequency (`+inf` when empty)
    pub fn min(&self) -> f64 {
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Largest frequency (`-inf` when empty)
    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Per-category frequency matrices over an ordered layer list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyMap {
    pub layers: Vec<String>,
    pub categories: BTreeMap<String, FrequencyMatrix>,
}

impl FrequencyMap {
    /// Matrix of one category
    pub fn get(&self, category: &str) -> Option<&FrequencyMatrix> {
        self.categories.get(category)
    }

    /// Shared `(min, max)` over every matrix, for a common colour scale
    pub fn value_range(&self) -> Option<(f64, f64)> {
        if self.categories.is_empty() {
            return None;
        }
        let min = self.categories.values().map(FrequencyMatrix::min).fold(f64::INFINITY, f64::min);
        let max = self.categories.values().map(FrequencyMatrix::max).fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }
}

/// Frequency vector of one category in one layer
pub fn category_frequency(
    units: &[usize],
    pool: IdentityPool,
    encodings: &[UnitEncoding],
    unit_count: usize,
    num_classes: usize,
) -> Result<Vec<f64>> {
    let mut counts = vec![0usize; num_classes];
    for &unit in units {
        let encoding = encodings.get(unit).ok_or_else(|| {
            SelectivityError::MissingDependency(format!("classification of unit {unit}"))
        })?;
        let identities: Box<dyn Iterator<Item = usize> + '_> = match pool {
            IdentityPool::Strong => Box::new(encoding.encode.iter().copied()),
            IdentityPool::Weak => Box::new(encoding.weak_encode.iter().copied()),
            IdentityPool::Both => Box::new(encoding.all_identities()),
        };
        for identity in identities {
            let slot = counts.get_mut(identity).ok_or_else(|| {
                SelectivityError::InvalidInput(format!(
                    "unit {unit} encodes identity {identity} of {num_classes}"
                ))
            })?;
            *slot += 1;
        }
    }

    if unit_count == 0 {
        return Ok(vec![0.0; num_classes]);
    }
    Ok(counts.into_iter().map(|c| c as f64 / unit_count as f64).collect())
}

/// Frequency vectors of every category in a layer's sort result
pub fn layer_frequency(
    sort: &SortResult,
    encodings: &[UnitEncoding],
    unit_count: usize,
    num_classes: usize,
) -> Result<BTreeMap<String, Vec<f64>>> {
    sort.iter()
        .map(|(name, units)| {
            let pool = IdentityPool::for_category(name);
            category_frequency(units, pool, encodings, unit_count, num_classes).map(|f| (name.clone(), f))
        })
        .collect()
}

/// Stack per-layer frequency vectors into identities × layers matrices
///
/// `per_layer` is in layer order; every layer must carry the same categories.
pub fn stack_layers(
    layers: Vec<String>,
    per_layer: &[BTreeMap<String, Vec<f64>>],
    num_classes: usize,
) -> Result<FrequencyMap> {
    if layers.len() != per_layer.len() {
        return Err(SelectivityError::InvalidInput(format!(
            "{} layer names for {} frequency layers",
            layers.len(),
            per_layer.len()
        )));
    }

    let mut categories = BTreeMap::new();
    if let Some(first) = per_layer.first() {
        for name in first.keys() {
            let columns = per_layer
                .iter()
                .zip(&layers)
                .map(|(freq, layer)| {
                    freq.get(name).cloned().ok_or_else(|| {
                        SelectivityError::MissingDependency(format!("{name} frequency for layer {layer}"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            categories.insert(name.clone(), FrequencyMatrix::from_columns(num_classes, &columns)?);
        }
    }

    Ok(FrequencyMap { layers, categories })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encodings() -> Vec<UnitEncoding> {
        vec![
            UnitEncoding::new(vec![0], vec![2]),
            UnitEncoding::new(vec![], vec![1, 2]),
            UnitEncoding::new(vec![0, 1], vec![]),
            UnitEncoding::default(),
        ]
    }

    #[test]
    fn test_pools() {
        let enc = encodings();
        let strong = category_frequency(&[0, 2], IdentityPool::Strong, &enc, 4, 3).unwrap();
        assert_eq!(strong, vec![0.5, 0.25, 0.0]);

        let weak = category_frequency(&[0, 1], IdentityPool::Weak, &enc, 4, 3).unwrap();
        assert_eq!(weak, vec![0.0, 0.25, 0.5]);

        let both = category_frequency(&[0, 1, 2, 3], IdentityPool::Both, &enc, 4, 3).unwrap();
        assert_eq!(both, vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_empty_category_is_zero() {
        let freq = category_frequency(&[], IdentityPool::Both, &encodings(), 4, 3).unwrap();
        assert_eq!(freq, vec![0.0; 3]);
        let freq = category_frequency(&[], IdentityPool::Both, &[], 0, 3).unwrap();
        assert_eq!(freq, vec![0.0; 3]);
    }

    #[test]
    fn test_identity_out_of_range() {
        let enc = vec![UnitEncoding::new(vec![5], vec![])];
        assert!(category_frequency(&[0], IdentityPool::Strong, &enc, 1, 3).is_err());
    }

    #[test]
    fn test_layer_frequency_uses_base_pools() {
        let mut sort = SortResult::new();
        sort.insert("a_hs".into(), vec![0]);
        sort.insert("hs".into(), vec![0]);
        let freq = layer_frequency(&sort, &encodings(), 4, 3).unwrap();
        assert_eq!(freq["a_hs"], vec![0.25, 0.0, 0.0]);
        assert_eq!(freq["hs"], vec![0.25, 0.0, 0.25]);
    }

    #[test]
    fn test_stack_layers() {
        let mut l0 = BTreeMap::new();
        l0.insert("encode".to_string(), vec![0.1, 0.2]);
        let mut l1 = BTreeMap::new();
        l1.insert("encode".to_string(), vec![0.3, 0.4]);

        let map = stack_layers(vec!["c1".into(), "c2".into()], &[l0, l1], 2).unwrap();
        let m = map.get("encode").unwrap();
        assert_eq!(m.num_classes(), 2);
        assert_eq!(m.num_layers(), 2);
        assert_eq!(m.row(0), &[0.1, 0.3]);
        assert_eq!(m.column(1), vec![0.3, 0.4]);
        assert_eq!(m.get(1, 0), Some(0.2));
        assert_eq!(map.value_range(), Some((0.1, 0.4)));
    }

    #[test]
    fn test_deserialize_checks_shape() {
        let bad = serde_json::json!({ "num_classes": 3, "num_layers": 1, "data": [0.0] });
        assert!(serde_json::from_value::<FrequencyMatrix>(bad).is_err());

        let m = FrequencyMatrix::from_columns(2, &[vec![0.5, 0.25]]).unwrap();
        let back: FrequencyMatrix = serde_json::from_value(serde_json::to_value(&m).unwrap()).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_stack_layers_missing_category() {
        let mut l0 = BTreeMap::new();
        l0.insert("encode".to_string(), vec![0.0]);
        let l1 = BTreeMap::new();
        assert!(stack_layers(vec!["a".into(), "b".into()], &[l0, l1], 1).is_err());
    }
}
