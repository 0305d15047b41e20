//! Uniform cubic B-spline basis weights.
//!
//! For a span parameter `t` the four weights multiply the control values at
//! logical indices `-1, 0, 1, 2` around the active cell:
//!
//! ```text
//! w0 = (1 - 3t + 3t² - t³) / 6
//! w1 = (4 - 6t² + 3t³) / 6
//! w2 = (1 + 3t + 3t² - 3t³) / 6
//! w3 = t³ / 6
//! ```
//!
//! Input is clamped to `[0, 1]` first. That is a policy, not an error path:
//! values outside the cell evaluate as the nearest cell end.

/// Number of basis functions that are non-zero on one span.
pub const BASIS_WIDTH: usize = 4;

/// Weights for a single parameter. They sum to one for every `t`.
#[must_use]
pub fn basis_weights(t: f64) -> [f64; BASIS_WIDTH] {
    let t = t.clamp(0.0, 1.0);
    let t2 = t * t;
    let t3 = t2 * t;
    [
        (1.0 - 3.0 * t + 3.0 * t2 - t3) / 6.0,
        (4.0 - 6.0 * t2 + 3.0 * t3) / 6.0,
        (1.0 + 3.0 * t + 3.0 * t2 - 3.0 * t3) / 6.0,
        t3 / 6.0,
    ]
}

/// Evaluates [`basis_weights`] for every entry of `params`.
#[must_use]
pub fn basis_weights_batch(params: &[f64]) -> Vec<[f64; BASIS_WIDTH]> {
    let mut out = vec![[0.0; BASIS_WIDTH]; params.len()];
    basis_weights_into(params, &mut out);
    out
}

/// Writes the weights for `params[i]` into `out[i]`.
///
/// The loop body is straight-line arithmetic so it vectorizes; only the
/// common prefix of the two slices is written.
pub fn basis_weights_into(params: &[f64], out: &mut [[f64; BASIS_WIDTH]]) {
    for (t, w) in params.iter().zip(out.iter_mut()) {
        *w = basis_weights(*t);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_at_cell_ends() {
        let w = basis_weights(0.0);
        assert!((w[0] - 1.0 / 6.0).abs() < 1e-15);
        assert!((w[1] - 4.0 / 6.0).abs() < 1e-15);
        assert!((w[2] - 1.0 / 6.0).abs() < 1e-15);
        assert!(w[3].abs() < 1e-15);

        let w = basis_weights(1.0);
        assert!(w[0].abs() < 1e-15);
        assert!((w[1] - 1.0 / 6.0).abs() < 1e-15);
        assert!((w[2] - 4.0 / 6.0).abs() < 1e-15);
        assert!((w[3] - 1.0 / 6.0).abs() < 1e-15);
    }

    #[test]
    fn test_weights_symmetric() {
        for i in 0..=20 {
            let t = f64::from(i) / 20.0;
            let a = basis_weights(t);
            let b = basis_weights(1.0 - t);
            for k in 0..BASIS_WIDTH {
                assert!((a[k] - b[BASIS_WIDTH - 1 - k]).abs() < 1e-14, "t = {t}, k = {k}");
            }
        }
    }

    #[test]
    fn test_out_of_range_clamps() {
        assert_eq!(basis_weights(-3.0), basis_weights(0.0));
        assert_eq!(basis_weights(4.5), basis_weights(1.0));
    }

    #[test]
    fn test_batch_matches_scalar() {
        let params = [0.0, 0.1, 0.5, 0.75, 1.0, -0.2, 1.2];
        let batch = basis_weights_batch(&params);
        assert_eq!(batch.len(), params.len());
        for (t, w) in params.iter().zip(&batch) {
            assert_eq!(*w, basis_weights(*t));
        }
    }

    #[test]
    fn test_into_writes_common_prefix() {
        let mut out = [[9.0; BASIS_WIDTH]; 2];
        basis_weights_into(&[0.25], &mut out);
        assert_eq!(out[0], basis_weights(0.25));
        assert_eq!(out[1], [9.0; BASIS_WIDTH]);
    }
}
