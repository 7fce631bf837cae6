//! Numerical differentiation of sampled series.

/// Derivative of `values` with respect to `times`.
///
/// Interior samples use the centred difference, the first and last samples a
/// one-sided difference. Mismatched inputs are truncated to the shorter one;
/// fewer than two samples, or a zero time step, give zeros.
pub fn derivative(values: &[f64], times: &[f64]) -> Vec<f64> {
    let n = values.len().min(times.len());
    if n < 2 {
        return vec![0.0; n];
    }

    let slope = |i: usize, j: usize| {
        let dt = times[j] - times[i];
        if dt == 0.0 {
            0.0
        } else {
            (values[j] - values[i]) / dt
        }
    };

    (0..n)
        .map(|i| match i {
            0 => slope(0, 1),
            i if i == n - 1 => slope(n - 2, n - 1),
            i => slope(i - 1, i + 1),
        })
        .collect()
}
