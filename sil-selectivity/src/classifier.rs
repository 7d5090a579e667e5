//! # Unit Response Classifier
//!
//! Classifies one unit's response vector as strongly encoding, weakly
//! encoding, or non-encoding a subset of stimulus identities.
//!
//! The response is grouped into `num_classes` identities of `num_samples`
//! presentations each:
//!
//! ```text
//! threshold = global_mean + n * std(response)      (total variance)
//! ref       = global_mean + n * std(local_means)   (between-group variance)
//! encode      = { i | local_means[i] > threshold }
//! weak_encode = { i | local_means[i] > ref } \ encode
//! ```

use serde::{Deserialize, Serialize};

use crate::config::EncodeConfig;
use crate::error::{Result, SelectivityError};
use crate::stats;

/// Group-level statistics of one unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitResponses {
    /// Mean response per identity
    pub local_means: Vec<f64>,
    pub global_mean: f64,
    /// Strong encoding threshold
    pub threshold: f64,
    /// Weak encoding reference
    pub reference: f64,
}

/// Identities encoded by one unit; both lists are sorted and disjoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UnitEncodingRecord")]
pub struct UnitEncoding {
    pub encode: Vec<usize>,
    pub weak_encode: Vec<usize>,
}

#[derive(Deserialize)]
struct UnitEncodingRecord {
    encode: Vec<usize>,
    weak_encode: Vec<usize>,
}

impl From<UnitEncodingRecord> for UnitEncoding {
    fn from(record: UnitEncodingRecord) -> Self {
        UnitEncoding::new(record.encode, record.weak_encode)
    }
}

/// Encoding strength and multiplicity of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EncodingClass {
    /// High selective: one strong identity
    Hs,
    /// Low selective: no strong identity, one weak identity
    Ls,
    /// High multi: several strong identities
    Hm,
    /// Low multi: no strong identity, several weak identities
    Lm,
    /// Non-encoding
    Ne,
}

impl EncodingClass {
    pub const ALL: [EncodingClass; 5] = [
        EncodingClass::Hs,
        EncodingClass::Ls,
        EncodingClass::Hm,
        EncodingClass::Lm,
        EncodingClass::Ne,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            EncodingClass::Hs => "hs",
            EncodingClass::Ls => "ls",
            EncodingClass::Hm => "hm",
            EncodingClass::Lm => "lm",
            EncodingClass::Ne => "ne",
        }
    }
}

impl UnitEncoding {
    pub fn new(mut encode: Vec<usize>, mut weak_encode: Vec<usize>) -> Self {
        encode.sort_unstable();
        encode.dedup();
        weak_encode.sort_unstable();
        weak_encode.dedup();
        weak_encode.retain(|i| encode.binary_search(i).is_err());
        Self { encode, weak_encode }
    }

    /// Encoding class; strong encoding takes precedence over weak
    pub fn class(&self) -> EncodingClass {
        match (self.encode.len(), self.weak_encode.len()) {
            (1, _) => EncodingClass::Hs,
            (n, _) if n > 1 => EncodingClass::Hm,
            (_, 0) => EncodingClass::Ne,
            (_, 1) => EncodingClass::Ls,
            _ => EncodingClass::Lm,
        }
    }

    /// Identities in either list
    pub fn all_identities(&self) -> impl Iterator<Item = usize> + '_ {
        self.encode.iter().chain(self.weak_encode.iter()).copied()
    }

    pub fn is_encoding(&self) -> bool {
        !self.encode.is_empty() || !self.weak_encode.is_empty()
    }
}

/// Compute the group statistics of one unit's response
pub fn unit_responses(response: &[f64], config: &EncodeConfig) -> Result<UnitResponses> {
    let expected = config.presentations();
    if config.num_classes == 0 || config.num_samples == 0 || response.len() != expected {
        return Err(SelectivityError::shape(
            format!("{} x {} = {} responses", config.num_classes, config.num_samples, expected),
            format!("{} responses", response.len()),
        ));
    }

    let local_means = stats::group_means(response, config.num_samples);
    let global_mean = stats::mean(response);
    let total_std = stats::std(response);
    let between_group_std = stats::std(&local_means);

    Ok(UnitResponses {
        threshold: global_mean + config.n * total_std,
        reference: global_mean + config.n * between_group_std,
        local_means,
        global_mean,
    })
}

/// Classify one unit's response vector
///
/// Pure; safe to run for many units in parallel.
pub fn classify_unit(response: &[f64], config: &EncodeConfig) -> Result<UnitEncoding> {
    let stats = unit_responses(response, config)?;

    // strict '>' keeps an all-zero unit from encoding
    let encode: Vec<usize> = stats
        .local_means
        .iter()
        .enumerate()
        .filter(|&(_, &m)| m > stats.threshold)
        .map(|(i, _)| i)
        .collect();

    let weak_encode: Vec<usize> = stats
        .local_means
        .iter()
        .enumerate()
        .filter(|&(i, &m)| m > stats.reference && !encode.contains(&i))
        .map(|(i, _)| i)
        .collect();

    Ok(UnitEncoding { encode, weak_encode })
}
