//! Numeric helpers for policies

use ndarray::{ArrayBase, Axis, DataMut, Dimension};
use rand::Rng;

/// Calculate Shannon entropy from a probability distribution.
///
/// The Shannon entropy is calculated as: H = -Σ(p * ln(p)) for p > 0
///
/// # Examples
///
/// ```
/// use crld::utils::shannon_entropy;
///
/// let entropy = shannon_entropy(vec![0.5, 0.5]);
/// assert!((entropy - std::f64::consts::LN_2).abs() < 0.001);
///
/// let entropy = shannon_entropy(vec![1.0, 0.0, 0.0]);
/// assert!(entropy.abs() < 0.001);
/// ```
pub fn shannon_entropy<I>(probabilities: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    probabilities
        .into_iter()
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.ln())
        .sum()
}

/// Normalize every lane along the last axis to sum to one.
///
/// Lanes whose total is zero or not finite become uniform.
///
/// ```
/// use crld::utils::normalize_last_axis;
/// use ndarray::array;
///
/// let mut x = array![[1.0, 3.0], [0.0, 0.0]];
/// normalize_last_axis(&mut x);
/// assert_eq!(x, array![[0.25, 0.75], [0.5, 0.5]]);
/// ```
pub fn normalize_last_axis<S, D>(array: &mut ArrayBase<S, D>)
where
    S: DataMut<Elem = f64>,
    D: Dimension,
{
    let last = Axis(array.ndim() - 1);
    for mut lane in array.lanes_mut(last) {
        let total = lane.sum();
        if total > 0.0 && total.is_finite() {
            lane /= total;
        } else {
            lane.fill(1.0 / lane.len() as f64);
        }
    }
}

/// Softmax over the last axis, in place.
///
/// Each lane is shifted by its maximum before exponentiating.
pub fn softmax_last_axis<S, D>(array: &mut ArrayBase<S, D>)
where
    S: DataMut<Elem = f64>,
    D: Dimension,
{
    let last = Axis(array.ndim() - 1);
    for mut lane in array.lanes_mut(last) {
        let max = lane.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        lane.mapv_inplace(|v| (v - max).exp());
    }
    normalize_last_axis(array);
}

/// Draw from the standard normal distribution (Box-Muller).
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use ndarray::{Array3, array};
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn softmax_is_shift_invariant() {
        let mut a = array![[1.0, 2.0, 3.0]];
        let mut b = array![[1001.0, 1002.0, 1003.0]];
        softmax_last_axis(&mut a);
        softmax_last_axis(&mut b);
        assert!((&a - &b).iter().all(|d| d.abs() < 1e-12));
        assert!((a.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normalization_applies_per_lane() {
        let mut x = Array3::from_elem((2, 3, 4), 2.0);
        normalize_last_axis(&mut x);
        assert!(x.iter().all(|&p| (p - 0.25).abs() < 1e-12));
    }

    #[test]
    fn standard_normal_has_plausible_moments() {
        let mut rng = StdRng::seed_from_u64(7);
        let samples: Vec<f64> = (0..20_000).map(|_| standard_normal(&mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.05);
        assert!((variance - 1.0).abs() < 0.05);
    }
}
