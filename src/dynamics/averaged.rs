//! Observation-level averaged transition and reward models.
//!
//! Each model sums the environment tensors over hidden states and joint
//! actions, weighted by the focal agent's belief. The focal agent acts on its
//! observation through `X[i, o, a]`; the other agents act on the hidden state
//! through their state-action policies, marginalized via
//! [`Omega`](crate::tensor::Omega). The action-conditional variants leave the
//! focal action free, so `Tioo = Σ_a X·Tioao` and `Rio = Σ_a X·Rioa` hold
//! exactly.

use ndarray::{Array2, Array3, Array4};

use super::{Precomputed, engine::AveragedDynamics};
use crate::{Result, tensor::Operand};

impl AveragedDynamics {
    /// `Tioo[i, o, o']`: probability that agent `i` observes `o'` next, having observed `o`.
    pub fn tioo(&mut self, x: &Array3<f64>, pre: Precomputed<'_>) -> Result<Array3<f64>> {
        self.check_policy(x)?;
        let (xisa, bios) = self.upstream(x, &pre)?;
        let l = &self.labels;

        let mut operands = self.focal_operands(x, &bios);
        operands.extend(self.other_policy_operands(&xisa));
        operands.push(self.transition_operand());
        operands.push(self.next_observation_operand());
        self.contract_into(&operands, &[l.agent, l.obs, l.next_obs])
    }

    /// `Tioao[i, o, a, o']`: as [`tioo`](Self::tioo), conditioned on agent `i` taking `a`.
    pub fn tioao(&mut self, x: &Array3<f64>, pre: Precomputed<'_>) -> Result<Array4<f64>> {
        self.check_policy(x)?;
        let (xisa, bios) = self.upstream(x, &pre)?;
        let l = &self.labels;

        let mut operands = vec![
            self.omega_operand(),
            Operand::new(bios.view(), &[l.agent, l.obs, l.state]),
        ];
        operands.extend(self.other_policy_operands(&xisa));
        operands.push(self.transition_operand());
        operands.push(self.next_observation_operand());
        self.contract_into(&operands, &[l.agent, l.obs, l.action, l.next_obs])
    }

    /// `Rioa[i, o, a]`: expected reward of agent `i` for action `a` after observing `o`.
    pub fn rioa(&mut self, x: &Array3<f64>, pre: Precomputed<'_>) -> Result<Array3<f64>> {
        self.check_policy(x)?;
        let (xisa, bios) = self.upstream(x, &pre)?;
        let l = &self.labels;

        let mut operands = vec![
            self.omega_operand(),
            Operand::new(bios.view(), &[l.agent, l.obs, l.state]),
        ];
        operands.extend(self.other_policy_operands(&xisa));
        operands.push(self.transition_operand());
        operands.push(self.reward_operand());
        self.contract_into(&operands, &[l.agent, l.obs, l.action])
    }

    /// `Rio[i, o]`: expected reward of agent `i` after observing `o`.
    ///
    /// With `pre.rioa` present this is `Σ_a X[i, o, a] · Rioa[i, o, a]`, which
    /// skips the environment tensors entirely.
    pub fn rio(&mut self, x: &Array3<f64>, pre: Precomputed<'_>) -> Result<Array2<f64>> {
        self.check_policy(x)?;
        let l = &self.labels;
        if let Some(rioa) = pre.rioa {
            return self.contract_into(
                &[
                    Operand::new(x.view(), &[l.agent, l.obs, l.action]),
                    Operand::new(rioa.view(), &[l.agent, l.obs, l.action]),
                ],
                &[l.agent, l.obs],
            );
        }

        let (xisa, bios) = self.upstream(x, &pre)?;
        let l = &self.labels;
        let mut operands = self.focal_operands(x, &bios);
        operands.extend(self.other_policy_operands(&xisa));
        operands.push(self.transition_operand());
        operands.push(self.reward_operand());
        self.contract_into(&operands, &[l.agent, l.obs])
    }

    /// `Omega(i, j.., a, b.., e..)`, `Bios(i, o, s)` and `X(i, o, a)`.
    fn focal_operands<'x>(
        &'x self,
        x: &'x Array3<f64>,
        bios: &'x Array3<f64>,
    ) -> Vec<Operand<'x>> {
        let l = &self.labels;
        vec![
            self.omega_operand(),
            Operand::new(bios.view(), &[l.agent, l.obs, l.state]),
            Operand::new(x.view(), &[l.agent, l.obs, l.action]),
        ]
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{ArrayD, IxDyn, array};

    use super::*;
    use crate::dynamics::DynamicsConfig;
    use crate::environments::identity_observations;

    /// One agent; action 0 keeps the state and pays 1, action 1 flips it and pays 0.
    fn stay_flip() -> AveragedDynamics {
        let mut t = ArrayD::zeros(IxDyn(&[2, 2, 2]));
        let mut r = ArrayD::zeros(IxDyn(&[1, 2, 2, 2]));
        for s in 0..2 {
            t[IxDyn(&[s, 0, s])] = 1.0;
            t[IxDyn(&[s, 1, 1 - s])] = 1.0;
            r[IxDyn(&[0, s, 0, s])] = 1.0;
        }
        AveragedDynamics::from_tensors(t, r, identity_observations(1, 2), DynamicsConfig::default())
            .unwrap()
    }

    #[test]
    fn fully_observable_tioo_is_policy_averaged_transition() {
        let mut engine = stay_flip();
        let x = array![[[0.8, 0.2], [0.3, 0.7]]];
        let tioo = engine.tioo(&x, Precomputed::none()).unwrap();
        let expected = array![[[0.8, 0.2], [0.7, 0.3]]];
        assert!((&tioo - &expected).iter().all(|d| d.abs() < 1e-12));
    }

    #[test]
    fn action_conditional_models_are_deterministic_here() {
        let mut engine = stay_flip();
        let x = Array3::from_elem((1, 2, 2), 0.5);
        let tioao = engine.tioao(&x, Precomputed::none()).unwrap();
        assert_eq!(tioao.shape(), &[1, 2, 2, 2]);
        assert!((tioao[[0, 1, 0, 1]] - 1.0).abs() < 1e-12);
        assert!((tioao[[0, 1, 1, 0]] - 1.0).abs() < 1e-12);

        let rioa = engine.rioa(&x, Precomputed::none()).unwrap();
        assert!((&rioa - &array![[[1.0, 0.0], [1.0, 0.0]]]).iter().all(|d| d.abs() < 1e-12));
    }

    #[test]
    fn reward_paths_agree() {
        let mut engine = stay_flip();
        let x = array![[[0.9, 0.1], [0.4, 0.6]]];
        let direct = engine.rio(&x, Precomputed::none()).unwrap();
        let rioa = engine.rioa(&x, Precomputed::none()).unwrap();
        let via_rioa = engine.rio(&x, Precomputed::none().with_rioa(&rioa)).unwrap();
        assert!((&direct - &via_rioa).iter().all(|d| d.abs() < 1e-12));
        assert!((direct[[0, 0]] - 0.9).abs() < 1e-12);
    }
}
