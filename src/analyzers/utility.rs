/// Mean of a series of traffic sums. Returns `None` for an empty series.
pub fn mean(sums: &[u64]) -> Option<f64> {
    if sums.is_empty() {
        return None;
    }
    Some(sums.iter().map(|&s| s as f64).sum::<f64>() / sums.len() as f64)
}

/// Population standard deviation of a series around its `mean`.
/// Returns 0.0 for an empty series.
pub fn stddev(sums: &[u64], mean: f64) -> f64 {
    if sums.is_empty() {
        return 0.0;
    }
    let variance = sums
        .iter()
        .map(|&s| (s as f64 - mean).powi(2))
        .sum::<f64>()
        / sums.len() as f64;

    variance.sqrt()
}
