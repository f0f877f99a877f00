//! Common fixtures for the crld test suite.
//!
//! Deterministic toy environments plus random stochastic tensors drawn from
//! Dirichlet distributions.

#![allow(dead_code)]

use crld::{
    environments::{TabularEnvironment, identity_observations},
    utils::standard_normal,
};
use ndarray::{Array3, ArrayD, IxDyn};
use rand::{Rng, distr::StandardUniform, rngs::StdRng};

/// One agent, two states, two actions: action 0 keeps the state and pays 1,
/// action 1 flips the state and pays 0. Fully observable.
pub fn stay_flip() -> TabularEnvironment {
    let mut t = ArrayD::zeros(IxDyn(&[2, 2, 2]));
    let mut r = ArrayD::zeros(IxDyn(&[1, 2, 2, 2]));
    for s in 0..2 {
        t[IxDyn(&[s, 0, s])] = 1.0;
        t[IxDyn(&[s, 1, 1 - s])] = 1.0;
        r[IxDyn(&[0, s, 0, s])] = 1.0;
    }
    TabularEnvironment::fully_observable("stay-flip", t, r)
}

/// Random environment with `agents` agents, Dirichlet-distributed transition
/// and observation rows, and uniform rewards in `[-1, 1]`.
pub fn random_environment(
    agents: usize,
    actions: usize,
    states: usize,
    observations: usize,
    rng: &mut StdRng,
) -> TabularEnvironment {
    let mut t_shape = vec![states];
    t_shape.extend(std::iter::repeat_n(actions, agents));
    t_shape.push(states);
    let mut r_shape = vec![agents];
    r_shape.extend_from_slice(&t_shape);

    let mut t = ArrayD::zeros(IxDyn(&t_shape));
    let alpha = vec![1.0; states];
    for mut row in t.lanes_mut(ndarray::Axis(agents + 1)) {
        for (value, p) in row.iter_mut().zip(sample_dirichlet(&alpha, rng)) {
            *value = p;
        }
    }
    let r = ArrayD::from_shape_fn(IxDyn(&r_shape), |_| {
        2.0 * rng.sample::<f64, _>(StandardUniform) - 1.0
    });

    let o = if observations == states {
        identity_observations(agents, states)
    } else {
        random_stochastic(agents, states, observations, rng)
    };

    TabularEnvironment::new("random", t, r, o)
}

/// Array of shape `(n, rows, columns)` whose rows are Dirichlet(1) samples.
pub fn random_stochastic(n: usize, rows: usize, columns: usize, rng: &mut StdRng) -> Array3<f64> {
    let alpha = vec![1.0; columns];
    let mut array = Array3::zeros((n, rows, columns));
    for mut row in array.lanes_mut(ndarray::Axis(2)) {
        for (value, p) in row.iter_mut().zip(sample_dirichlet(&alpha, rng)) {
            *value = p;
        }
    }
    array
}

/// Sample from a Dirichlet distribution using the Gamma-Dirichlet relationship.
pub fn sample_dirichlet(alpha: &[f64], rng: &mut StdRng) -> Vec<f64> {
    let mut draws = Vec::with_capacity(alpha.len());
    let mut total = 0.0;
    for &a in alpha {
        let value = sample_gamma(a, rng);
        draws.push(value);
        total += value;
    }
    draws.iter_mut().for_each(|value| *value /= total);
    draws
}

/// Sample from a Gamma distribution using Marsaglia and Tsang's method.
///
/// # Panics
///
/// Panics if shape <= 0
fn sample_gamma(shape: f64, rng: &mut StdRng) -> f64 {
    assert!(shape > 0.0, "gamma shape must be positive");
    if shape < 1.0 {
        let u: f64 = rng.sample(StandardUniform);
        let u = u.max(1e-12);
        return sample_gamma(shape + 1.0, rng) * u.powf(1.0 / shape);
    }

    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();

    loop {
        let x = standard_normal(rng);
        let v_candidate = 1.0 + c * x;
        if v_candidate <= 0.0 {
            continue;
        }
        let v = v_candidate * v_candidate * v_candidate;
        let u: f64 = rng.sample(StandardUniform);

        if u < 1.0 - 0.0331 * x.powi(4) {
            return d * v;
        }

        if u.ln() < 0.5 * x * x + d * (1.0 - v + v.ln()) {
            return d * v;
        }
    }
}
