//! Trend changepoint detection using the PELT algorithm.
//!
//! The per-product model lets its trend bend at a limited number of points
//! so structural shifts in demand (a promotion campaign ending, a listing
//! change) do not get smeared into a single global slope. Changepoints are
//! located on the standardized quantity series with an L2 segment cost and
//! a BIC-like penalty, then thinned to a configured maximum so the trend
//! basis stays narrow.

/// Sum of squared deviations from the segment mean.
fn segment_cost(values: &[f64], start: usize, end: usize) -> f64 {
    if end <= start {
        return 0.0;
    }

    let segment = &values[start..end];
    let n = segment.len() as f64;
    let mean: f64 = segment.iter().sum::<f64>() / n;
    segment.iter().map(|v| (v - mean).powi(2)).sum()
}

/// Standardize to zero mean and unit variance so the penalty is scale-free.
fn zscore(values: &[f64]) -> Vec<f64> {
    let n = values.len() as f64;
    let mean: f64 = values.iter().sum::<f64>() / n;
    let variance: f64 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let sd = variance.sqrt();

    if sd <= f64::EPSILON {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / sd).collect()
}

/// Detect trend changepoints with PELT (Pruned Exact Linear Time).
///
/// # Arguments
/// * `values` - Observed quantities, in date order
/// * `min_segment` - Minimum observations between changepoints
/// * `max_changepoints` - Upper bound on returned changepoints; detections
///   are evenly thinned when exceeded
///
/// # Returns
/// Sorted indices into `values` where the trend is allowed to bend. Series
/// too short for two segments yield no changepoints.
pub fn detect_trend_changepoints(
    values: &[f64],
    min_segment: usize,
    max_changepoints: usize,
) -> Vec<usize> {
    let n = values.len();

    if max_changepoints == 0 || n < 2 * min_segment {
        return vec![];
    }

    let standardized = zscore(values);

    // BIC-like penalty per changepoint
    let penalty = 2.0 * (n as f64).ln();

    let mut best_cost = vec![f64::INFINITY; n + 1];
    let mut previous = vec![0usize; n + 1];
    best_cost[0] = -penalty;

    for end in min_segment..=n {
        let mut best = f64::INFINITY;
        let mut best_start = 0;

        for start in 0..=(end - min_segment) {
            let candidate = best_cost[start] + segment_cost(&standardized, start, end) + penalty;
            if candidate < best {
                best = candidate;
                best_start = start;
            }
        }

        best_cost[end] = best;
        previous[end] = best_start;
    }

    // Backtrack the optimal segmentation
    let mut changepoints = Vec::new();
    let mut idx = n;
    while idx > 0 {
        let start = previous[idx];
        if start > 0 {
            changepoints.push(start);
        }
        idx = start;
    }
    changepoints.reverse();

    thin_changepoints(changepoints, max_changepoints)
}

/// Keep an evenly spaced subset when more changepoints were detected than
/// the trend basis can afford.
fn thin_changepoints(changepoints: Vec<usize>, max_changepoints: usize) -> Vec<usize> {
    if changepoints.len() <= max_changepoints {
        return changepoints;
    }

    let stride = changepoints.len() as f64 / max_changepoints as f64;
    (0..max_changepoints)
        .map(|i| changepoints[(i as f64 * stride) as usize])
        .collect()
}
