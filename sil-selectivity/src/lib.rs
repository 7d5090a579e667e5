//! # sil-selectivity - Identity Selectivity of Network Layer Units
//!
//! Classifies the response units of trained network layers by their
//! statistical selectivity to a set of stimulus identities, and aggregates
//! the classifications into per-layer frequency distributions.
//!
//! ## Modules
//!
//! - **classifier**: per-unit strong/weak encoding from raw responses
//! - **taxonomy**: base categories and the closed registry of composites
//! - **sorter**: per-layer partition of units into the ten base categories
//! - **frequency**: category × identity frequency maps stacked over layers
//! - **analysis**: batch driver with explicit cached state
//! - **store**: persisted artifacts (JSON directory or in-memory)
//! - **config**: `num_classes`, `num_samples`, `n`, `num_workers`
//!
//! ## Example
//!
//! ```
//! use sil_selectivity::prelude::*;
//!
//! let config = EncodeConfig::new(2, 2);
//! let encoding = classify_unit(&[1.0, 1.0, 10.0, 10.0], &config).unwrap();
//! assert_eq!(encoding.class(), EncodingClass::Ne);
//! ```

pub mod error;
pub use error::{Result, SelectivityError};

pub mod config;
pub mod stats;
pub mod classifier;
pub mod response;
pub mod taxonomy;
pub mod sorter;
pub mod frequency;
pub mod store;
pub mod analysis;
pub mod curve;

pub use config::{EncodeConfig, Workers};
pub use classifier::{classify_unit, unit_responses, EncodingClass, UnitEncoding, UnitResponses};
pub use response::{FeatureStore, ResponseMatrix, SignificancePartition, SignificanceProvider};
pub use taxonomy::{BaseCategory, IdentityPool, Significance};
pub use sorter::{classify_layer, sort_layer, LayerSort, SortResult};
pub use frequency::{FrequencyMap, FrequencyMatrix};
pub use store::{Artifact, ArtifactStore, JsonDirStore, MemoryStore};
pub use analysis::{EncodeAnalysis, EncodeDict, LayerSpec, SortDict};
pub use curve::intersection_point;

/// Prelude module with common re-exports
pub mod prelude {
    pub use crate::error::{Result, SelectivityError};
    pub use crate::config::{EncodeConfig, Workers};
    pub use crate::classifier::{classify_unit, unit_responses, EncodingClass, UnitEncoding};
    pub use crate::response::{FeatureStore, ResponseMatrix, SignificancePartition, SignificanceProvider};
    pub use crate::taxonomy::{self, BaseCategory, Significance};
    pub use crate::sorter::{LayerSort, SortResult};
    pub use crate::frequency::{FrequencyMap, FrequencyMatrix};
    pub use crate::store::{Artifact, ArtifactStore, JsonDirStore, MemoryStore};
    pub use crate::analysis::{EncodeAnalysis, LayerSpec};
}
