/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sorted distinct values of an iterator.
pub fn distinct_sorted<T: Ord, I: IntoIterator<Item = T>>(values: I) -> Vec<T> {
    let mut out: Vec<T> = values.into_iter().collect();
    out.sort();
    out.dedup();
    out
}
