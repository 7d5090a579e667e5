//! Curve helpers for per-layer percentage series.

/// Piecewise-linear value of `ys` at fractional position `x`
fn interpolate(ys: &[f64], x: f64) -> f64 {
    let last = ys.len() - 1;
    let i = (x.floor() as usize).min(last);
    if i == last {
        return ys[last];
    }
    let t = x - i as f64;
    ys[i] + t * (ys[i + 1] - ys[i])
}

/// First point where `y1` reaches `y2`
///
/// Both curves are interpolated on `num_interpolate` evenly spaced points
/// over `[0, len - 1]`. Returns `(x, y1(x))` for the first grid point with
/// `y1(x) >= y2(x)`, or `None` when the curves never meet or differ in
/// length.
pub fn intersection_point(y1: &[f64], y2: &[f64], num_interpolate: usize) -> Option<(f64, f64)> {
    if y1.is_empty() || y1.len() != y2.len() || num_interpolate == 0 {
        return None;
    }

    let span = (y1.len() - 1) as f64;
    let step = if num_interpolate > 1 {
        span / (num_interpolate - 1) as f64
    } else {
        0.0
    };

    (0..num_interpolate)
        .map(|k| (k as f64 * step).min(span))
        .find(|&x| interpolate(y1, x) >= interpolate(y2, x))
        .map(|x| (x, interpolate(y1, x)))
}
