//! # Unit Taxonomy
//!
//! Ten base categories cross significance with encoding class:
//!
//! ```text
//!              hs     ls     hm     lm     ne
//! anova      a_hs   a_ls   a_hm   a_lm   a_ne
//! non-anova  na_hs  na_ls  na_hm  na_lm  na_ne
//! ```
//!
//! Composite categories are fixed unions of base categories. The registry
//! is built once and is read-only afterwards; composites are expressed in
//! terms of [`BaseCategory`] so they cannot reference an unknown base.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::classifier::EncodingClass;
use crate::error::{Result, SelectivityError};

use BaseCategory as B;

/// ANOVA membership of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Significance {
    Anova,
    NonAnova,
}

impl Significance {
    pub fn prefix(self) -> &'static str {
        match self {
            Significance::Anova => "a",
            Significance::NonAnova => "na",
        }
    }
}

/// One of the ten mutually exclusive unit classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BaseCategory {
    pub significance: Significance,
    pub class: EncodingClass,
}

impl BaseCategory {
    pub const fn new(significance: Significance, class: EncodingClass) -> Self {
        Self { significance, class }
    }

    pub const A_HS: Self = Self::new(Significance::Anova, EncodingClass::Hs);
    pub const A_LS: Self = Self::new(Significance::Anova, EncodingClass::Ls);
    pub const A_HM: Self = Self::new(Significance::Anova, EncodingClass::Hm);
    pub const A_LM: Self = Self::new(Significance::Anova, EncodingClass::Lm);
    pub const A_NE: Self = Self::new(Significance::Anova, EncodingClass::Ne);
    pub const NA_HS: Self = Self::new(Significance::NonAnova, EncodingClass::Hs);
    pub const NA_LS: Self = Self::new(Significance::NonAnova, EncodingClass::Ls);
    pub const NA_HM: Self = Self::new(Significance::NonAnova, EncodingClass::Hm);
    pub const NA_LM: Self = Self::new(Significance::NonAnova, EncodingClass::Lm);
    pub const NA_NE: Self = Self::new(Significance::NonAnova, EncodingClass::Ne);

    /// Canonical order: `a_hs a_ls a_hm a_lm a_ne na_hs … na_ne`
    pub const ALL: [BaseCategory; 10] = [
        Self::A_HS,
        Self::A_LS,
        Self::A_HM,
        Self::A_LM,
        Self::A_NE,
        Self::NA_HS,
        Self::NA_LS,
        Self::NA_HM,
        Self::NA_LM,
        Self::NA_NE,
    ];

    /// Position in [`BaseCategory::ALL`]
    pub fn index(self) -> usize {
        let sig = match self.significance {
            Significance::Anova => 0,
            Significance::NonAnova => 5,
        };
        let class = match self.class {
            EncodingClass::Hs => 0,
            EncodingClass::Ls => 1,
            EncodingClass::Hm => 2,
            EncodingClass::Lm => 3,
            EncodingClass::Ne => 4,
        };
        sig + class
    }

    pub fn name(self) -> &'static str {
        const NAMES: [&str; 10] = [
            "a_hs", "a_ls", "a_hm", "a_lm", "a_ne", "na_hs", "na_ls", "na_hm", "na_lm", "na_ne",
        ];
        NAMES[self.index()]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    /// Which identities of a unit count toward this category's frequency
    pub fn pool(self) -> IdentityPool {
        match self.class {
            EncodingClass::Hs | EncodingClass::Hm => IdentityPool::Strong,
            EncodingClass::Ls | EncodingClass::Lm => IdentityPool::Weak,
            EncodingClass::Ne => IdentityPool::Both,
        }
    }
}

impl fmt::Display for BaseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity pooling semantics for frequency aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityPool {
    /// `encode` only
    Strong,
    /// `weak_encode` only
    Weak,
    /// `encode` and `weak_encode`
    Both,
}

impl IdentityPool {
    /// Pooling for a registered category name; composites pool both lists
    pub fn for_category(name: &str) -> Self {
        BaseCategory::from_name(name).map_or(IdentityPool::Both, BaseCategory::pool)
    }
}

const COMPOSITES: &[(&str, &[BaseCategory])] = &[
    ("qualified", &BaseCategory::ALL),
    ("selective", &[B::A_HS, B::A_LS, B::A_HM, B::A_LM]),
    ("high_selective", &[B::A_HS, B::A_HM]),
    ("low_selective", &[B::A_LS, B::A_LM]),
    ("non_selective", &[B::A_NE, B::NA_HS, B::NA_LS, B::NA_HM, B::NA_LM, B::NA_NE]),
    ("anova", &[B::A_HS, B::A_LS, B::A_HM, B::A_LM, B::A_NE]),
    ("non_anova", &[B::NA_HS, B::NA_LS, B::NA_HM, B::NA_LM, B::NA_NE]),
    ("encode", &[B::A_HS, B::NA_HS, B::A_LS, B::NA_LS, B::A_HM, B::NA_HM, B::A_LM, B::NA_LM]),
    ("high_encode", &[B::A_HS, B::NA_HS, B::A_HM, B::NA_HM]),
    ("weak_encode", &[B::A_LS, B::NA_LS, B::A_LM, B::NA_LM]),
    ("non_encode", &[B::A_NE, B::NA_NE]),
    ("hs", &[B::A_HS, B::NA_HS]),
    ("hm", &[B::A_HM, B::NA_HM]),
    ("ls", &[B::A_LS, B::NA_LS]),
    ("lm", &[B::A_LM, B::NA_LM]),
    ("a_encode", &[B::A_HS, B::A_LS, B::A_HM, B::A_LM]),
    ("na_h_encode", &[B::NA_HS, B::NA_HM]),
    ("na_l_encode", &[B::NA_LS, B::NA_LM]),
    ("na_encode", &[B::NA_HS, B::NA_LS, B::NA_HM, B::NA_LM]),
    ("a_s", &[B::A_HS, B::A_LS]),
    ("a_m", &[B::A_HM, B::A_LM]),
    ("na_s", &[B::NA_HS, B::NA_LS]),
    ("na_m", &[B::NA_HM, B::NA_LM]),
];

/// Every category name mapped to its base categories
static REGISTRY: Lazy<BTreeMap<&'static str, &'static [BaseCategory]>> = Lazy::new(|| {
    let mut registry: BTreeMap<&'static str, &'static [BaseCategory]> = BaseCategory::ALL
        .iter()
        .map(|b| (b.name(), std::slice::from_ref(&BASES[b.index()])))
        .collect();
    registry.extend(COMPOSITES.iter().copied());
    registry
});

static BASES: [BaseCategory; 10] = BaseCategory::ALL;

/// Base categories of a registered name
pub fn lookup(name: &str) -> Option<&'static [BaseCategory]> {
    REGISTRY.get(name).copied()
}

/// Whether `name` is a base or composite category
pub fn is_registered(name: &str) -> bool {
    REGISTRY.contains_key(name)
}

/// All registered names, sorted
pub fn category_names() -> impl Iterator<Item = &'static str> {
    REGISTRY.keys().copied()
}

/// Resolve requested names to their base categories
///
/// Every unknown name is reported together, before any resolution is
/// returned.
pub fn resolve<I, S>(names: I) -> Result<BTreeMap<String, Vec<BaseCategory>>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let names: BTreeSet<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();

    let unknown: Vec<String> = names.iter().filter(|n| !is_registered(n)).cloned().collect();
    if !unknown.is_empty() {
        return Err(SelectivityError::UnknownCategory(unknown));
    }

    Ok(names
        .into_iter()
        .filter_map(|n| lookup(&n).map(|bases| (n, bases.to_vec())))
        .collect())
}

/// Resolve requested names together with the ten base categories
pub fn resolve_with_bases<I, S>(names: I) -> Result<BTreeMap<String, Vec<BaseCategory>>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let requested: Vec<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
    resolve(requested.into_iter().chain(basic_types().map(str::to_string)))
}

/// The ten base category names
pub fn basic_types() -> impl Iterator<Item = &'static str> {
    BaseCategory::ALL.into_iter().map(BaseCategory::name)
}

pub const BASIC_TYPES_DISPLAY: [&str; 6] = ["a_hs", "a_ls", "a_hm", "a_lm", "a_ne", "non_anova"];

pub const ADVANCED_TYPES_DISPLAY: [&str; 6] = [
    "qualified",
    "high_selective",
    "low_selective",
    "selective",
    "non_anova",
    "non_selective",
];
