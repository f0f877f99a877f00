//! Environment collaborators
//!
//! An environment supplies the exact transition, reward, and observation
//! models of a multi-agent Markov game:
//!
//! - `T[s, a_1, .., a_N, s']`: transition probabilities, row-stochastic in `s'`
//! - `R[i, s, a_1, .., a_N, s']`: reward of agent `i` for the transition
//! - `O[i, s, o]`: probability that agent `i` observes `o` in state `s`
//!
//! The averaged-dynamics engine reads these once at construction. An
//! environment that does not override [`Environment::observation_tensor`] is
//! fully observable: every agent observes the state itself.
//!
//! ## Provided environments
//!
//! - [`TabularEnvironment`]: explicit tensors, loadable from JSON
//! - [`RiskReward`]: a two-state prosperity/degradation decision problem
//! - [`RenewableResources`]: a harvested logistic-growth stock

pub mod renewable_resources;
pub mod risk_reward;
pub mod tabular;

use ndarray::{Array3, ArrayD};

pub use renewable_resources::RenewableResources;
pub use risk_reward::RiskReward;
pub use tabular::TabularEnvironment;

/// Capability interface of an environment.
pub trait Environment {
    /// Transition tensor `T[s, a_1, .., a_N, s']`.
    fn transition_tensor(&self) -> ArrayD<f64>;

    /// Reward tensor `R[i, s, a_1, .., a_N, s']`.
    fn reward_tensor(&self) -> ArrayD<f64>;

    /// Observation tensor `O[i, s, o]`.
    ///
    /// Defaults to the identity, i.e. full observability.
    fn observation_tensor(&self) -> Array3<f64> {
        let shape = self.reward_tensor().shape().to_vec();
        identity_observations(shape[0], shape[1])
    }

    /// Action labels, one list per agent.
    fn actions(&self) -> Vec<Vec<String>>;

    /// State labels.
    fn states(&self) -> Vec<String>;

    /// Observation labels. Defaults to the state labels.
    fn observations(&self) -> Vec<String> {
        self.states()
    }

    /// Identifier naming the environment and its parameters.
    fn id(&self) -> String;
}

/// `O[i, s, o] = δ(s, o)` for every agent.
pub fn identity_observations(agents: usize, states: usize) -> Array3<f64> {
    Array3::from_shape_fn((agents, states, states), |(_, s, o)| {
        if s == o { 1.0 } else { 0.0 }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_observation_rows_are_stochastic() {
        let o = identity_observations(2, 3);
        assert_eq!(o.shape(), &[2, 3, 3]);
        for value in o.sum_axis(ndarray::Axis(2)).iter() {
            assert_eq!(*value, 1.0);
        }
    }
}
