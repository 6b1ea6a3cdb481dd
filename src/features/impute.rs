/// Fill gaps by carrying the last valid value forward, then filling any
/// leading gap with the first valid value.
///
/// Returns `None` when the column has no valid value at all.
pub fn fill_gaps(values: &[Option<f64>]) -> Option<Vec<f64>> {
    let first_valid = values.iter().flatten().copied().next()?;

    let mut last = None;
    let forward: Vec<Option<f64>> = values
        .iter()
        .map(|value| {
            if value.is_some() {
                last = *value;
            }
            last
        })
        .collect();

    // Only a leading run can still be empty after the forward pass.
    Some(forward.into_iter().map(|v| v.unwrap_or(first_valid)).collect())
}
