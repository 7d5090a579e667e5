//! # Encode Analysis
//!
//! Batch driver over an ordered list of layers. Holds the classification
//! context explicitly: cached unit classifications, base-category sorts and
//! frequency maps, each with load/compute/store steps against an
//! [`ArtifactStore`].
//!
//! Layers are processed one after another; units within a layer are
//! classified in parallel.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use crate::classifier::UnitEncoding;
use crate::config::EncodeConfig;
use crate::error::{Result, SelectivityError};
use crate::frequency::{self, FrequencyMap};
use crate::response::{FeatureStore, SignificancePartition, SignificanceProvider};
use crate::sorter::{self, LayerSort, SortResult};
use crate::store::{Artifact, ArtifactStore};
use crate::taxonomy;

/// Layer name → unit classifications, indexed by unit
pub type EncodeDict = BTreeMap<String, Vec<UnitEncoding>>;

/// Layer name → base-category partition
pub type SortDict = BTreeMap<String, LayerSort>;

/// A layer and its unit count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub name: String,
    pub units: usize,
}

impl LayerSpec {
    pub fn new(name: impl Into<String>, units: usize) -> Self {
        Self {
            name: name.into(),
            units,
        }
    }
}

/// Classification context for one analysis run
#[derive(Debug)]
pub struct EncodeAnalysis<S: ArtifactStore> {
    config: EncodeConfig,
    layers: Vec<LayerSpec>,
    store: S,
    encode: Option<EncodeDict>,
    sort: Option<SortDict>,
    freq: Option<FrequencyMap>,
}

impl<S: ArtifactStore> EncodeAnalysis<S> {
    /// Validate the config; at least one layer is required
    pub fn new(config: EncodeConfig, layers: Vec<LayerSpec>, store: S) -> Result<Self> {
        config.validate()?;
        if layers.is_empty() {
            return Err(SelectivityError::InvalidInput("no layers given".into()));
        }
        Ok(Self {
            config,
            layers,
            store,
            encode: None,
            sort: None,
            freq: None,
        })
    }

    pub fn config(&self) -> &EncodeConfig {
        &self.config
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    pub fn layer_names(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.name.clone()).collect()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Classify and sort every layer, unless both artifacts already exist
    ///
    /// On a cache hit the stored results are loaded instead.
    pub fn run_encode<F, P>(&mut self, features: &F, significance: &P) -> Result<()>
    where
        F: FeatureStore + ?Sized,
        P: SignificanceProvider + ?Sized,
    {
        if self.store.contains(Artifact::Sort) && self.store.contains(Artifact::Encode) {
            info!("sort and encode artifacts present, skipping classification");
            self.load_sort()?;
            self.load_encode()?;
            return Ok(());
        }

        info!(layers = self.layers.len(), "executing unit classification");
        let pool = sorter::build_pool(self.config.num_workers)?;

        let mut encode_dict = EncodeDict::new();
        let mut sort_dict = SortDict::new();

        for layer in &self.layers {
            let _span = info_span!("layer", name = %layer.name).entered();

            let matrix = features.response_matrix(&layer.name)?;
            if matrix.units() != layer.units {
                return Err(SelectivityError::shape(
                    format!("{} units in layer {}", layer.units, layer.name),
                    format!("{} units", matrix.units()),
                ));
            }
            let partition = SignificancePartition::new(significance.significant_units(&layer.name)?, layer.units)?;

            let (encodings, sort) = sorter::sort_layer(&matrix, &partition, &self.config, &pool)?;
            debug!(
                units = layer.units,
                significant = partition.significant().len(),
                "layer classified"
            );

            encode_dict.insert(layer.name.clone(), encodings);
            sort_dict.insert(layer.name.clone(), sort);
        }

        self.store.save(Artifact::Sort, &sort_dict)?;
        self.store.save(Artifact::Encode, &encode_dict)?;
        info!("sort and encode artifacts saved");

        self.sort = Some(sort_dict);
        self.encode = Some(encode_dict);
        Ok(())
    }

    /// Load base-category sorts from the store
    pub fn load_sort(&mut self) -> Result<&SortDict> {
        let sort: SortDict = self
            .store
            .load(Artifact::Sort)?
            .ok_or_else(|| SelectivityError::MissingDependency("sort dict not computed or stored".into()))?;
        self.check_layers(sort.iter().map(|(name, s)| (name, s.unit_count())), "sort dict")?;
        Ok(self.sort.insert(sort))
    }

    /// Load unit classifications from the store
    pub fn load_encode(&mut self) -> Result<&EncodeDict> {
        let encode: EncodeDict = self
            .store
            .load(Artifact::Encode)?
            .ok_or_else(|| SelectivityError::MissingDependency("encode dict not computed or stored".into()))?;
        self.check_layers(encode.iter().map(|(name, e)| (name, e.len())), "encode dict")?;
        Ok(self.encode.insert(encode))
    }

    /// Every configured layer must be stored with its configured unit count
    fn check_layers<'a>(&self, stored: impl Iterator<Item = (&'a String, usize)>, what: &str) -> Result<()> {
        let stored: BTreeMap<&str, usize> = stored.map(|(name, units)| (name.as_str(), units)).collect();

        let missing: Vec<&str> = self
            .layers
            .iter()
            .map(|l| l.name.as_str())
            .filter(|name| !stored.contains_key(name))
            .collect();
        if !missing.is_empty() {
            return Err(SelectivityError::MissingDependency(format!(
                "{what} has no entry for layers [{}]",
                missing.join(", ")
            )));
        }

        for layer in &self.layers {
            let Some(&units) = stored.get(layer.name.as_str()) else {
                continue;
            };
            if units != layer.units {
                return Err(SelectivityError::StaleArtifact(format!(
                    "{what} holds {units} units for layer {} but {} are configured, remove it to recompute",
                    layer.name, layer.units
                )));
            }
        }
        Ok(())
    }

    fn ensure_sort(&mut self) -> Result<&SortDict> {
        if self.sort.is_none() {
            self.load_sort()?;
        }
        self.sort
            .as_ref()
            .ok_or_else(|| SelectivityError::MissingDependency("sort dict".into()))
    }

    fn ensure_encode(&mut self) -> Result<&EncodeDict> {
        if self.encode.is_none() {
            self.load_encode()?;
        }
        self.encode
            .as_ref()
            .ok_or_else(|| SelectivityError::MissingDependency("encode dict".into()))
    }

    /// Unit classifications per layer
    pub fn encode_dict(&mut self) -> Result<&EncodeDict> {
        self.ensure_encode()
    }

    /// Base-category partition of one layer
    pub fn layer_sort(&mut self, layer: &str) -> Result<&LayerSort> {
        self.ensure_sort()?
            .get(layer)
            .ok_or_else(|| SelectivityError::MissingDependency(format!("sort for layer {layer}")))
    }

    /// Unit indices of the requested categories, per layer
    pub fn sort_dict<I, N>(&mut self, names: I) -> Result<BTreeMap<String, SortResult>>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let resolved = taxonomy::resolve(names)?;
        let sort = self.ensure_sort()?;
        Ok(sort
            .iter()
            .map(|(layer, layer_sort)| (layer.clone(), layer_sort.select(&resolved)))
            .collect())
    }

    /// Percentage of each layer's units in the requested categories
    ///
    /// Category → one value per layer, in layer order.
    pub fn units_pct<I, N>(&mut self, names: I) -> Result<BTreeMap<String, Vec<f64>>>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let resolved = taxonomy::resolve(names)?;
        let layers = self.layers.clone();
        let sort = self.ensure_sort()?;

        let mut pct: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for layer in &layers {
            let layer_sort = sort
                .get(&layer.name)
                .ok_or_else(|| SelectivityError::MissingDependency(format!("sort for layer {}", layer.name)))?;
            for (name, units) in layer_sort.select(&resolved) {
                let value = if layer.units == 0 {
                    0.0
                } else {
                    units.len() as f64 / layer.units as f64 * 100.0
                };
                pct.entry(name).or_default().push(value);
            }
        }
        Ok(pct)
    }

    /// Frequency maps for the requested categories plus the ten bases
    ///
    /// A stored frequency artifact for the same layers is returned as is.
    pub fn freq_map<I, N>(&mut self, names: I) -> Result<&FrequencyMap>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let resolved = taxonomy::resolve_with_bases(names)?;
        self.freq_map_resolved(&resolved)
    }

    /// Frequency maps for every registered category
    pub fn freq_map_all(&mut self) -> Result<&FrequencyMap> {
        let resolved = taxonomy::resolve(taxonomy::category_names())?;
        self.freq_map_resolved(&resolved)
    }

    fn freq_map_resolved(&mut self, resolved: &BTreeMap<String, Vec<taxonomy::BaseCategory>>) -> Result<&FrequencyMap> {
        if self.freq.is_none() {
            if let Some(cached) = self.store.load::<FrequencyMap>(Artifact::Frequency)? {
                self.check_freq(&cached)?;
                info!("frequency artifact present, skipping aggregation");
                self.freq = Some(cached);
            }
        }

        if self.freq.is_none() {
            let map = self.compute_freq(resolved)?;
            self.store.save(Artifact::Frequency, &map)?;
            info!(categories = map.categories.len(), "frequency artifact saved");
            self.freq = Some(map);
        }

        self.freq
            .as_ref()
            .ok_or_else(|| SelectivityError::MissingDependency("frequency map".into()))
    }

    fn check_freq(&self, cached: &FrequencyMap) -> Result<()> {
        if cached.layers != self.layer_names() {
            return Err(SelectivityError::StaleArtifact(format!(
                "frequency map built for layers [{}], remove it to recompute",
                cached.layers.join(", ")
            )));
        }
        let num_classes = self.config.num_classes;
        if let Some((name, matrix)) = cached
            .categories
            .iter()
            .find(|(_, m)| m.num_classes() != num_classes || m.num_layers() != cached.layers.len())
        {
            return Err(SelectivityError::StaleArtifact(format!(
                "frequency map for {name} is {} x {}, expected {num_classes} x {}",
                matrix.num_classes(),
                matrix.num_layers(),
                cached.layers.len()
            )));
        }
        Ok(())
    }

    fn compute_freq(&mut self, resolved: &BTreeMap<String, Vec<taxonomy::BaseCategory>>) -> Result<FrequencyMap> {
        info!(layers = self.layers.len(), "calculating frequency map");
        let num_classes = self.config.num_classes;
        let layers = self.layers.clone();
        self.ensure_sort()?;
        self.ensure_encode()?;

        let (Some(sort), Some(encode)) = (self.sort.as_ref(), self.encode.as_ref()) else {
            return Err(SelectivityError::MissingDependency("sort and encode dicts".into()));
        };

        let mut per_layer = Vec::with_capacity(layers.len());
        for layer in &layers {
            let layer_sort = sort
                .get(&layer.name)
                .ok_or_else(|| SelectivityError::MissingDependency(format!("sort for layer {}", layer.name)))?;
            let encodings = encode
                .get(&layer.name)
                .ok_or_else(|| SelectivityError::MissingDependency(format!("encode for layer {}", layer.name)))?;

            let selected = layer_sort.select(resolved);
            per_layer.push(frequency::layer_frequency(&selected, encodings, layer.units, num_classes)?);
            debug!(layer = %layer.name, "frequency computed");
        }

        frequency::stack_layers(self.layer_names(), &per_layer, num_classes)
    }
}
