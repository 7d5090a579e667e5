//! # Statistics Functions
//!
//! Population statistics over response slices.

/// Mean (average) of the elements, shifted by the first sample
///
/// A constant slice yields exactly its value.
pub fn mean(values: &[f64]) -> f64 {
    let Some(&shift) = values.first() else {
        return 0.0;
    };
    let sum: f64 = values.iter().map(|v| v - shift).sum();
    shift + sum / values.len() as f64
}

/// Variance: σ² = (1/n) Σ (xi - μ)²
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean(values);
    let mut sum_sq = 0.0;

    for v in values {
        let diff = v - mean;
        sum_sq += diff * diff;
    }

    sum_sq / values.len() as f64
}

/// Standard deviation: σ = √variance
pub fn std(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Means of consecutive, equally sized groups
///
/// `values.len()` must be a multiple of `group_size`; a trailing partial
/// group is ignored.
pub fn group_means(values: &[f64], group_size: usize) -> Vec<f64> {
    if group_size == 0 {
        return Vec::new();
    }
    values.chunks_exact(group_size).map(mean).collect()
}
