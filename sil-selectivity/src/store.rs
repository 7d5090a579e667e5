//! # Artifact Store
//!
//! Persists computed results so a later run can skip recomputation.
//! Removing an artifact is the only way to force it to be recomputed.

use std::collections::HashMap;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Result, SelectivityError};

/// Cached analysis results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// Per-layer base-category partitions
    Sort,
    /// Per-layer unit classifications
    Encode,
    /// Per-category frequency matrices
    Frequency,
}

impl Artifact {
    pub fn file_name(self) -> &'static str {
        match self {
            Artifact::Sort => "sort_dict.json",
            Artifact::Encode => "encode_dict.json",
            Artifact::Frequency => "freq.json",
        }
    }
}

/// Read-check-then-write-once storage for [`Artifact`]s
pub trait ArtifactStore {
    fn contains(&self, artifact: Artifact) -> bool;

    /// `Ok(None)` when the artifact was never stored
    fn load<T: DeserializeOwned>(&self, artifact: Artifact) -> Result<Option<T>>;

    fn save<T: Serialize>(&mut self, artifact: Artifact, value: &T) -> Result<()>;

    fn remove(&mut self, artifact: Artifact) -> Result<()>;
}

/// One JSON file per artifact inside a directory
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Directory is created on first save
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, artifact: Artifact) -> PathBuf {
        self.dir.join(artifact.file_name())
    }
}

impl ArtifactStore for JsonDirStore {
    fn contains(&self, artifact: Artifact) -> bool {
        self.path(artifact).is_file()
    }

    fn load<T: DeserializeOwned>(&self, artifact: Artifact) -> Result<Option<T>> {
        let path = self.path(artifact);
        if !path.is_file() {
            return Ok(None);
        }
        let reader = BufReader::new(fs::File::open(&path)?);
        let value = serde_json::from_reader(reader)?;
        debug!(path = %path.display(), "artifact loaded");
        Ok(Some(value))
    }

    fn save<T: Serialize>(&mut self, artifact: Artifact, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(artifact);
        let mut writer = BufWriter::new(fs::File::create(&path)?);
        serde_json::to_writer(&mut writer, value)?;
        writer.flush()?;
        debug!(path = %path.display(), "artifact saved");
        Ok(())
    }

    fn remove(&mut self, artifact: Artifact) -> Result<()> {
        let path = self.path(artifact);
        if path.is_file() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// In-process store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    artifacts: HashMap<Artifact, serde_json::Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactStore for MemoryStore {
    fn contains(&self, artifact: Artifact) -> bool {
        self.artifacts.contains_key(&artifact)
    }

    fn load<T: DeserializeOwned>(&self, artifact: Artifact) -> Result<Option<T>> {
        self.artifacts
            .get(&artifact)
            .map(|v| serde_json::from_value(v.clone()).map_err(SelectivityError::from))
            .transpose()
    }

    fn save<T: Serialize>(&mut self, artifact: Artifact, value: &T) -> Result<()> {
        self.artifacts.insert(artifact, serde_json::to_value(value)?);
        Ok(())
    }

    fn remove(&mut self, artifact: Artifact) -> Result<()> {
        self.artifacts.remove(&artifact);
        Ok(())
    }
}
