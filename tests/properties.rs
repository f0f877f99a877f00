//! Property-based tests for the averaged dynamics on random environments.

mod common;

use crld::{AveragedDynamics, DynamicsConfig, Precomputed};
use ndarray::{Array3, Axis};
use proptest::prelude::*;
use rand::{SeedableRng, rngs::StdRng};

use common::{random_environment, random_stochastic};

#[derive(Debug, Clone, Copy)]
struct Shape {
    agents: usize,
    actions: usize,
    states: usize,
    observations: usize,
}

/// Strategy: small game dimensions, partially observable or not.
fn shape_strategy() -> impl Strategy<Value = Shape> {
    (1..=3usize, 2..=3usize, 2..=3usize, 2..=3usize).prop_map(
        |(agents, actions, states, observations)| Shape {
            agents,
            actions,
            states,
            observations,
        },
    )
}

fn setup(shape: Shape, seed: u64) -> (AveragedDynamics, Array3<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let env = random_environment(
        shape.agents,
        shape.actions,
        shape.states,
        shape.observations,
        &mut rng,
    );
    let x = random_stochastic(shape.agents, shape.observations, shape.actions, &mut rng);
    let engine = AveragedDynamics::new(&env, DynamicsConfig::new(0.85)).unwrap();
    (engine, x)
}

fn all_rows_sum_to_one(array: &Array3<f64>) -> bool {
    array
        .sum_axis(Axis(2))
        .iter()
        .all(|total| (total - 1.0).abs() < 1e-9)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // 1. State-action policies are row-stochastic
    #[test]
    fn xisa_rows_sum_to_one(shape in shape_strategy(), seed in any::<u64>()) {
        let (engine, x) = setup(shape, seed);
        let xisa = engine.xisa(&x).unwrap();
        prop_assert!(all_rows_sum_to_one(&xisa), "xisa={xisa:?}");
    }

    // 2. Beliefs are distributions over states
    #[test]
    fn beliefs_are_normalized(shape in shape_strategy(), seed in any::<u64>()) {
        let (mut engine, x) = setup(shape, seed);
        let bios = engine.bios(&x).unwrap();
        prop_assert!(bios.iter().all(|&b| b >= 0.0));
        prop_assert!(all_rows_sum_to_one(&bios), "bios={bios:?}");
    }

    // 3. Observation transitions are row-stochastic
    #[test]
    fn tioo_is_row_stochastic(shape in shape_strategy(), seed in any::<u64>()) {
        let (mut engine, x) = setup(shape, seed);
        let tioo = engine.tioo(&x, Precomputed::none()).unwrap();
        prop_assert!(tioo.iter().all(|&p| p >= -1e-12));
        prop_assert!(all_rows_sum_to_one(&tioo), "tioo={tioo:?}");
    }

    // 4. Both ways of computing Rio agree
    #[test]
    fn reward_paths_agree(shape in shape_strategy(), seed in any::<u64>()) {
        let (mut engine, x) = setup(shape, seed);
        let direct = engine.rio(&x, Precomputed::none()).unwrap();
        let rioa = engine.rioa(&x, Precomputed::none()).unwrap();
        let via_rioa = engine.rio(&x, Precomputed::none().with_rioa(&rioa)).unwrap();
        for (a, b) in direct.iter().zip(via_rioa.iter()) {
            prop_assert!((a - b).abs() < 1e-9, "direct={direct:?} via_rioa={via_rioa:?}");
        }
    }

    // 5. Prediction errors vanish in policy expectation
    #[test]
    fn td_error_has_zero_policy_mean(shape in shape_strategy(), seed in any::<u64>()) {
        let (mut engine, x) = setup(shape, seed);
        let td = engine.td_error(&x, Precomputed::none()).unwrap();
        let mean = (&td * &x).sum_axis(Axis(2));
        prop_assert!(mean.iter().all(|m| m.abs() < 1e-8), "mean={mean:?}");
    }
}
