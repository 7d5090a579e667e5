//! Analysis configuration loaded from .env files
//!
//! Loads configuration values from .env or environment variables.
//!
//! | Variable                  | Default | Meaning                               |
//! |---------------------------|---------|---------------------------------------|
//! | `SIL_ENCODE_NUM_CLASSES`  | 50      | stimulus identities                   |
//! | `SIL_ENCODE_NUM_SAMPLES`  | 10      | presentations per identity            |
//! | `SIL_ENCODE_N`            | 2.0     | threshold standard-deviation multiplier |
//! | `SIL_ENCODE_NUM_WORKERS`  | all     | `all`, `-1` or a positive count       |

use std::env;
use std::num::NonZeroUsize;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SelectivityError};

// Automatically load .env when config module is accessed
static DOTENV_INIT: Lazy<()> = Lazy::new(|| {
    let _ = dotenv::dotenv();
});

/// Ensure environment is loaded
#[inline]
fn ensure_loaded() {
    let _ = &*DOTENV_INIT;
}

pub const DEFAULT_NUM_CLASSES: usize = 50;
pub const DEFAULT_NUM_SAMPLES: usize = 10;
pub const DEFAULT_N: f64 = 2.0;

/// Parallelism degree for per-unit classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Workers {
    /// Use every available worker
    #[default]
    All,
    /// Fixed number of workers
    Count(NonZeroUsize),
}

impl Workers {
    /// Parse `all`, `-1` or a positive count
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("all") || value == "-1" {
            return Some(Workers::All);
        }
        value.parse::<usize>().ok().and_then(NonZeroUsize::new).map(Workers::Count)
    }

    /// Thread count handed to the pool builder (0 lets rayon pick)
    pub fn threads(self) -> usize {
        match self {
            Workers::All => 0,
            Workers::Count(n) => n.get(),
        }
    }
}

/// Configuration recognized by the classification core
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncodeConfig {
    /// Number of stimulus identities
    pub num_classes: usize,
    /// Presentations per identity
    pub num_samples: usize,
    /// Standard-deviation multiplier for `threshold` and `ref`
    pub n: f64,
    /// Worker pool size for per-unit classification
    pub num_workers: Workers,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            num_classes: DEFAULT_NUM_CLASSES,
            num_samples: DEFAULT_NUM_SAMPLES,
            n: DEFAULT_N,
            num_workers: Workers::All,
        }
    }
}

impl EncodeConfig {
    /// Default `n` and workers for the given grouping
    pub fn new(num_classes: usize, num_samples: usize) -> Self {
        Self {
            num_classes,
            num_samples,
            ..Self::default()
        }
    }

    /// Set the standard-deviation multiplier
    pub fn with_n(mut self, n: f64) -> Self {
        self.n = n;
        self
    }

    /// Set the worker pool size
    pub fn with_workers(mut self, num_workers: Workers) -> Self {
        self.num_workers = num_workers;
        self
    }

    /// Load from environment (and `.env`), falling back to defaults
    pub fn from_env() -> Self {
        ensure_loaded();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unparseable values keep the default
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            num_classes: lookup("SIL_ENCODE_NUM_CLASSES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.num_classes),
            num_samples: lookup("SIL_ENCODE_NUM_SAMPLES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.num_samples),
            n: lookup("SIL_ENCODE_N")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.n),
            num_workers: lookup("SIL_ENCODE_NUM_WORKERS")
                .and_then(|v| Workers::parse(&v))
                .unwrap_or(defaults.num_workers),
        }
    }

    /// Rows expected in a layer's response matrix
    pub fn presentations(&self) -> usize {
        self.num_classes * self.num_samples
    }

    /// Reject empty identity or sample counts and a non-finite or negative `n`
    pub fn validate(&self) -> Result<()> {
        if self.num_classes == 0 {
            return Err(SelectivityError::Config("num_classes must be positive".into()));
        }
        if self.num_samples == 0 {
            return Err(SelectivityError::Config("num_samples must be positive".into()));
        }
        if !self.n.is_finite() || self.n < 0.0 {
            return Err(SelectivityError::Config(format!(
                "n must be a finite non-negative multiplier, got {}",
                self.n
            )));
        }
        Ok(())
    }
}
