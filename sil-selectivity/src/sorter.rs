//! # Layer Sorter
//!
//! Classifies every unit of a layer (in parallel) and buckets the unit
//! indices into the ten base categories.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::{classify_unit, UnitEncoding};
use crate::config::{EncodeConfig, Workers};
use crate::error::{Result, SelectivityError};
use crate::response::{ResponseMatrix, SignificancePartition};
use crate::taxonomy::{BaseCategory, Significance};

/// Category name → unit indices, for one layer
pub type SortResult = BTreeMap<String, Vec<usize>>;

/// Build the per-unit worker pool
pub fn build_pool(workers: Workers) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers.threads())
        .build()
        .map_err(|e| SelectivityError::Config(format!("worker pool: {e}")))
}

/// Classify every unit of a layer
///
/// One task per unit; the collect is the join barrier for the layer.
pub fn classify_layer(
    matrix: &ResponseMatrix,
    config: &EncodeConfig,
    pool: &rayon::ThreadPool,
) -> Result<Vec<UnitEncoding>> {
    if matrix.rows() != config.presentations() {
        return Err(SelectivityError::shape(
            format!(
                "{} x {} = {} presentations",
                config.num_classes,
                config.num_samples,
                config.presentations()
            ),
            format!("{} presentations", matrix.rows()),
        ));
    }

    pool.install(|| {
        (0..matrix.units())
            .into_par_iter()
            .map(|unit| classify_unit(&matrix.column(unit), config))
            .collect()
    })
}

/// The ten base-category index sets of one layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LayerSortRecord", into = "LayerSortRecord")]
pub struct LayerSort {
    unit_count: usize,
    bases: [Vec<usize>; 10],
}

impl LayerSort {
    /// Bucket every unit by encoding class and significance
    ///
    /// `encodings[i]` is the classification of unit `i`.
    pub fn new(partition: &SignificancePartition, encodings: &[UnitEncoding]) -> Result<Self> {
        if encodings.len() != partition.unit_count() {
            return Err(SelectivityError::shape(
                format!("{} unit classifications", partition.unit_count()),
                format!("{} unit classifications", encodings.len()),
            ));
        }

        let mut bases: [Vec<usize>; 10] = Default::default();
        for (unit, encoding) in encodings.iter().enumerate() {
            let significance = if partition.is_significant(unit) {
                Significance::Anova
            } else {
                Significance::NonAnova
            };
            let base = BaseCategory::new(significance, encoding.class());
            bases[base.index()].push(unit);
        }

        Ok(Self {
            unit_count: encodings.len(),
            bases,
        })
    }

    /// Units in the layer
    pub fn unit_count(&self) -> usize {
        self.unit_count
    }

    /// Units of one base category
    pub fn base(&self, base: BaseCategory) -> &[usize] {
        &self.bases[base.index()]
    }

    /// Concatenated units of the given base categories
    ///
    /// Base sets are disjoint, so the result has no duplicates.
    pub fn union(&self, bases: &[BaseCategory]) -> Vec<usize> {
        bases.iter().flat_map(|b| self.base(*b).iter().copied()).collect()
    }

    /// Sort result for resolved categories
    pub fn select(&self, resolved: &BTreeMap<String, Vec<BaseCategory>>) -> SortResult {
        resolved
            .iter()
            .map(|(name, bases)| (name.clone(), self.union(bases)))
            .collect()
    }
}

/// Classify and sort one layer
pub fn sort_layer(
    matrix: &ResponseMatrix,
    partition: &SignificancePartition,
    config: &EncodeConfig,
    pool: &rayon::ThreadPool,
) -> Result<(Vec<UnitEncoding>, LayerSort)> {
    if matrix.units() != partition.unit_count() {
        return Err(SelectivityError::shape(
            format!("{} units", partition.unit_count()),
            format!("{} units", matrix.units()),
        ));
    }

    let encodings = classify_layer(matrix, config, pool)?;
    let sort = LayerSort::new(partition, &encodings)?;

    for base in BaseCategory::ALL {
        debug!(category = base.name(), units = sort.base(base).len(), "sorted");
    }
    Ok((encodings, sort))
}

/// Named, serializable form of [`LayerSort`]
#[derive(Serialize, Deserialize)]
struct LayerSortRecord {
    unit_count: usize,
    bases: BTreeMap<String, Vec<usize>>,
}

impl From<LayerSort> for LayerSortRecord {
    fn from(sort: LayerSort) -> Self {
        let bases = BaseCategory::ALL
            .into_iter()
            .zip(sort.bases)
            .map(|(b, units)| (b.name().to_string(), units))
            .collect();
        Self {
            unit_count: sort.unit_count,
            bases,
        }
    }
}

impl TryFrom<LayerSortRecord> for LayerSort {
    type Error = SelectivityError;

    fn try_from(mut record: LayerSortRecord) -> Result<Self> {
        let mut bases: [Vec<usize>; 10] = Default::default();
        for base in BaseCategory::ALL {
            bases[base.index()] = record.bases.remove(base.name()).ok_or_else(|| {
                SelectivityError::Serialization(format!("sort record missing {}", base.name()))
            })?;
        }
        if let Some(extra) = record.bases.keys().next() {
            return Err(SelectivityError::UnknownCategory(vec![extra.clone()]));
        }

        // the ten sets must partition 0..unit_count
        let mut seen = vec![false; record.unit_count];
        for (base, units) in BaseCategory::ALL.iter().zip(&bases) {
            for &unit in units {
                match seen.get_mut(unit) {
                    Some(slot) if !*slot => *slot = true,
                    Some(_) => {
                        return Err(SelectivityError::InvalidInput(format!(
                            "unit {unit} appears twice in sort record ({base})"
                        )));
                    }
                    None => {
                        return Err(SelectivityError::InvalidInput(format!(
                            "unit {unit} in {base} out of range for {} units",
                            record.unit_count
                        )));
                    }
                }
            }
        }
        if let Some(unit) = seen.iter().position(|s| !s) {
            return Err(SelectivityError::InvalidInput(format!("unit {unit} missing from sort record")));
        }

        Ok(Self {
            unit_count: record.unit_count,
            bases,
        })
    }
}
