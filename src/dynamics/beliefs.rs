use std::borrow::Cow;

use ndarray::{Array1, Array3, ArrayView1, Axis};

use super::{Precomputed, engine::AveragedDynamics};
use crate::{Error, Result, tensor::Operand};

impl AveragedDynamics {
    /// Beliefs `Bios[i, o, s] = p(s | i, o)` against the stationary state distribution of `x`.
    ///
    /// Solves the state distribution afresh and updates the cache.
    pub fn bios(&mut self, x: &Array3<f64>) -> Result<Array3<f64>> {
        let xisa = self.xisa(x)?;
        let p = self.solve_state_distribution(&xisa)?;
        self.bios_from(p.view())
    }

    /// Beliefs through the lightweight state-distribution solve.
    ///
    /// Picks the stationary candidate closest to the cached distribution
    /// without any diagnostics, then writes it back to the cache.
    pub fn fast_bios(&mut self, x: &Array3<f64>) -> Result<Array3<f64>> {
        let xisa = self.xisa(x)?;
        let p = self.select_state_distribution(&xisa)?;
        self.bios_from(p.view())
    }

    fn select_state_distribution(&mut self, xisa: &Array3<f64>) -> Result<Array1<f64>> {
        let tss = self.tss_from(xisa)?;
        let p = self.solver.select(
            tss.view(),
            self.cache.state_distribution.view(),
            "state distribution",
        )?;
        self.cache.state_distribution = p.clone();
        Ok(p)
    }

    /// Beliefs against an explicit state distribution `p(s)`.
    ///
    /// Observations that carry no probability mass keep an all-zero belief.
    pub fn bios_from(&self, p: ArrayView1<'_, f64>) -> Result<Array3<f64>> {
        if p.len() != self.dims.states {
            return Err(Error::DimensionMismatch {
                what: "states".to_string(),
                context: format!(
                    "state distribution has {} entries, environment has {} states",
                    p.len(),
                    self.dims.states
                ),
            });
        }
        let l = &self.labels;
        let mut joint: Array3<f64> = self.contract_into(
            &[
                Operand::new(self.observations.view(), &[l.agent, l.state, l.obs]),
                Operand::new(p.view(), &[l.state]),
            ],
            &[l.agent, l.obs, l.state],
        )?;
        for mut lane in joint.lanes_mut(Axis(2)) {
            let total = lane.sum();
            if total != 0.0 {
                lane /= total;
            }
        }
        Ok(joint)
    }

    pub(super) fn beliefs_for(&mut self, xisa: &Array3<f64>) -> Result<Array3<f64>> {
        let p = if self.fast_beliefs {
            self.select_state_distribution(xisa)?
        } else {
            self.solve_state_distribution(xisa)?
        };
        self.bios_from(p.view())
    }

    /// `Xisa` and `Bios`, borrowed from the hints where present.
    pub(super) fn upstream<'p>(
        &mut self,
        x: &Array3<f64>,
        pre: &Precomputed<'p>,
    ) -> Result<(Cow<'p, Array3<f64>>, Cow<'p, Array3<f64>>)> {
        let xisa = match pre.xisa {
            Some(xisa) => Cow::Borrowed(xisa),
            None => Cow::Owned(self.xisa(x)?),
        };
        let bios = match pre.bios {
            Some(bios) => Cow::Borrowed(bios),
            None => Cow::Owned(self.beliefs_for(&xisa)?),
        };
        Ok((xisa, bios))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array3, ArrayD, IxDyn, array};

    use super::*;
    use crate::dynamics::DynamicsConfig;

    /// Two states, one coarse observation covering both plus an unused one.
    fn coarse_engine() -> AveragedDynamics {
        let mut t = ArrayD::zeros(IxDyn(&[2, 2, 2]));
        for s in 0..2 {
            for a in 0..2 {
                t[IxDyn(&[s, a, 0])] = 0.25;
                t[IxDyn(&[s, a, 1])] = 0.75;
            }
        }
        let r = ArrayD::zeros(IxDyn(&[1, 2, 2, 2]));
        let mut o = Array3::zeros((1, 2, 2));
        o[[0, 0, 0]] = 1.0;
        o[[0, 1, 0]] = 1.0;
        AveragedDynamics::from_tensors(t, r, o, DynamicsConfig::default()).unwrap()
    }

    #[test]
    fn beliefs_follow_bayes_rule() {
        let engine = coarse_engine();
        let bios = engine.bios_from(array![0.2, 0.8].view()).unwrap();
        assert!((bios[[0, 0, 0]] - 0.2).abs() < 1e-12);
        assert!((bios[[0, 0, 1]] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn massless_observation_keeps_zero_belief() {
        let engine = coarse_engine();
        let bios = engine.bios_from(array![0.5, 0.5].view()).unwrap();
        assert_eq!(bios[[0, 1, 0]], 0.0);
        assert_eq!(bios[[0, 1, 1]], 0.0);
    }

    #[test]
    fn exact_beliefs_update_the_cache() {
        let mut engine = coarse_engine();
        let x = Array3::from_elem((1, 2, 2), 0.5);
        let bios = engine.bios(&x).unwrap();
        let cached = engine.continuity_cache().state_distribution().clone();
        assert!((cached[0] - 0.25).abs() < 1e-9);
        assert!((bios[[0, 0, 1]] - 0.75).abs() < 1e-9);
        let fast = engine.fast_bios(&x).unwrap();
        assert!((&fast - &bios).iter().all(|d| d.abs() < 1e-12));
    }

    #[test]
    fn fast_beliefs_update_the_cache() {
        let mut engine = coarse_engine();
        let x = Array3::from_elem((1, 2, 2), 0.5);
        let fast = engine.fast_bios(&x).unwrap();
        let cached = engine.continuity_cache().state_distribution().clone();
        assert!((cached[0] - 0.25).abs() < 1e-9);
        assert!((cached[1] - 0.75).abs() < 1e-9);
        assert!((fast[[0, 0, 1]] - 0.75).abs() < 1e-9);
    }

    #[test]
    fn distribution_of_wrong_length_is_rejected() {
        let engine = coarse_engine();
        assert!(engine.bios_from(array![1.0].view()).is_err());
    }
}
