//! Rank transforms behind the rank correlation.
//!
//! Spearman's correlation of two vectors is the Pearson correlation of
//! their average ranks. After centring and scaling the ranks to unit
//! norm the correlation becomes a plain dot product, and the squared
//! Euclidean distance `d^2 = 2 - 2 r`, which is what lets a nearest
//! neighbour index answer "most correlated" queries.

use ndarray::{Array1, ArrayView1};

/// Average ranks (1-based) of `xx`; tied values receive the mean of
/// the positions they occupy. `NaN` values are ordered last.
pub fn average_ranks(xx: &[f32]) -> Vec<f32> {
    let n = xx.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| xx[a].total_cmp(&xx[b]).then(a.cmp(&b)));

    let mut ranks = vec![0_f32; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && xx[order[end]] == xx[order[start]] {
            end += 1;
        }
        // positions start..end (0-based) share the rank
        let avg = (start + end + 1) as f32 * 0.5;
        for &k in &order[start..end] {
            ranks[k] = avg;
        }
        start = end;
    }
    ranks
}

/// Centre and scale a rank vector to zero mean and unit norm. A
/// constant vector maps to all zeros, so it correlates 0 with
/// anything.
pub fn scale_ranks(ranks: &[f32]) -> Array1<f32> {
    let n = ranks.len();
    if n == 0 {
        return Array1::zeros(0);
    }
    let mean = ranks.iter().sum::<f32>() / n as f32;
    let centred: Array1<f32> = ranks.iter().map(|&r| r - mean).collect();
    let norm = centred.dot(&centred).sqrt();
    if norm > 0. {
        centred / norm
    } else {
        Array1::zeros(n)
    }
}

/// Average ranks followed by [`scale_ranks`]
pub fn scaled_ranks(xx: &[f32]) -> Array1<f32> {
    scale_ranks(&average_ranks(xx))
}

/// Re-rank a stored rank vector on a subset of its positions. Ranks
/// are monotone in the original values, so this equals ranking the
/// original values restricted to `positions`.
pub fn scaled_ranks_at(ranks: ArrayView1<f32>, positions: &[usize]) -> Array1<f32> {
    let sub: Vec<f32> = positions.iter().map(|&p| ranks[p]).collect();
    scaled_ranks(&sub)
}

/// Quantile of `values` with linear interpolation between the two
/// closest order statistics (type 7): `pos = q (n-1)`. `q = 1` gives
/// the maximum, `q = 0` the minimum. Sorts `values` in place.
pub fn interpolated_quantile(values: &mut [f32], q: f32) -> Option<f32> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    Some(interpolate_sorted(values, q))
}

/// Same as [`interpolated_quantile`] for already ascending `sorted`
pub fn interpolate_sorted(sorted: &[f32], q: f32) -> f32 {
    let n = sorted.len();
    let pos = q.clamp(0., 1.) * (n - 1) as f32;
    let lo = pos.floor() as usize;
    let hi = (pos.ceil() as usize).min(n - 1);
    let frac = pos - lo as f32;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn ties_get_average_rank() {
        let r = average_ranks(&[3.0, 1.0, 3.0, 2.0, 3.0]);
        assert_eq!(r, vec![4.0, 1.0, 4.0, 2.0, 4.0]);
    }

    #[test]
    fn scaled_ranks_are_unit_and_centred() {
        let s = scaled_ranks(&[0.5, 2.0, -1.0, 7.0, 7.0]);
        assert_abs_diff_eq!(s.sum(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(s.dot(&s), 1.0, epsilon = 1e-6);

        let z = scaled_ranks(&[2.0, 2.0, 2.0]);
        assert!(z.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn spearman_of_monotone_vectors() {
        let a = scaled_ranks(&[1.0, 2.0, 3.0, 4.0]);
        let b = scaled_ranks(&[10.0, 20.0, 35.0, 100.0]);
        let c = scaled_ranks(&[4.0, 3.0, 2.0, 1.0]);
        assert_abs_diff_eq!(a.dot(&b), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(a.dot(&c), -1.0, epsilon = 1e-6);
    }

    #[test]
    fn quantile_interpolates() {
        let mut v = vec![0.4, 0.1, 0.3, 0.2];
        assert_abs_diff_eq!(interpolated_quantile(&mut v, 1.0).unwrap(), 0.4);
        assert_abs_diff_eq!(interpolated_quantile(&mut v, 0.0).unwrap(), 0.1);
        // pos = 0.5 * 3 = 1.5
        assert_abs_diff_eq!(interpolated_quantile(&mut v, 0.5).unwrap(), 0.25, epsilon = 1e-6);
        assert!(interpolated_quantile(&mut [], 0.5).is_none());
    }
}
