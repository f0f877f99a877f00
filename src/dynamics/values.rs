//! Observation values, action values, and derived averages.

use std::borrow::Cow;

use nalgebra::DMatrix;
use ndarray::{Array1, Array2, Array3, Axis};
use tracing::debug;

use super::{Precomputed, engine::AveragedDynamics};
use crate::{Error, Result, tensor::Operand};

impl AveragedDynamics {
    /// Observation values `Vio[i, o]` solving `V = R + γ·Tioo·V`, times the prefactor.
    ///
    /// # Errors
    ///
    /// [`Error::SingularValueSystem`] when `I - γ·Tioo[i]` cannot be inverted.
    pub fn vio(&mut self, x: &Array3<f64>, pre: Precomputed<'_>) -> Result<Array2<f64>> {
        self.check_policy(x)?;
        let (rio, tioo) = match (pre.rio, pre.tioo) {
            (Some(rio), Some(tioo)) => (Cow::Borrowed(rio), Cow::Borrowed(tioo)),
            _ => {
                let (xisa, bios) = self.upstream(x, &pre)?;
                let hints = Precomputed {
                    xisa: Some(&*xisa),
                    bios: Some(&*bios),
                    ..pre
                };
                let rio = match pre.rio {
                    Some(rio) => Cow::Borrowed(rio),
                    None => Cow::Owned(self.rio(x, hints)?),
                };
                let tioo = match pre.tioo {
                    Some(tioo) => Cow::Borrowed(tioo),
                    None => Cow::Owned(self.tioo(x, hints)?),
                };
                (rio, tioo)
            }
        };

        let (agents, q) = (self.dims.agents, self.dims.observations);
        self.check_hint("Tioo", tioo.shape(), &[agents, q, q])?;
        self.check_hint("Rio", rio.shape(), &[agents, q])?;

        let mut inverses = Array3::zeros((agents, q, q));
        for agent in 0..agents {
            let gamma = self.gamma[agent];
            let system = DMatrix::from_fn(q, q, |o, next| {
                let identity = if o == next { 1.0 } else { 0.0 };
                identity - gamma * tioo[[agent, o, next]]
            });
            let inverse = system
                .try_inverse()
                .ok_or(Error::SingularValueSystem { agent })?;
            for ((o, next), value) in inverses.index_axis_mut(Axis(0), agent).indexed_iter_mut() {
                *value = inverse[(o, next)];
            }
        }

        let l = &self.labels;
        let values: Array2<f64> = self.contract_into(
            &[
                Operand::new(inverses.view(), &[l.agent, l.obs, l.next_obs]),
                Operand::new(rio.view(), &[l.agent, l.next_obs]),
            ],
            &[l.agent, l.obs],
        )?;
        Ok(values * &self.prefactor.view().insert_axis(Axis(1)))
    }

    /// Action values `Qioa[i, o, a] = prefactor·Rioa + γ·Σ_o' Tioao[i, o, a, o']·Vio[i, o']`.
    pub fn qioa(&mut self, x: &Array3<f64>, pre: Precomputed<'_>) -> Result<Array3<f64>> {
        self.check_policy(x)?;
        let (xisa, bios);
        let hints = if pre.rioa.is_some() && pre.vio.is_some() && pre.tioao.is_some() {
            pre
        } else {
            (xisa, bios) = self.upstream(x, &pre)?;
            Precomputed {
                xisa: Some(&*xisa),
                bios: Some(&*bios),
                ..pre
            }
        };

        let rioa = match hints.rioa {
            Some(rioa) => Cow::Borrowed(rioa),
            None => Cow::Owned(self.rioa(x, hints)?),
        };
        let hints = Precomputed {
            rioa: Some(&*rioa),
            ..hints
        };
        let vio = match hints.vio {
            Some(vio) => Cow::Borrowed(vio),
            None => Cow::Owned(self.vio(x, hints)?),
        };
        let tioao = match hints.tioao {
            Some(tioao) => Cow::Borrowed(tioao),
            None => Cow::Owned(self.tioao(x, hints)?),
        };

        let l = &self.labels;
        let next: Array3<f64> = self.contract_into(
            &[
                Operand::new(tioao.view(), &[l.agent, l.obs, l.action, l.next_obs]),
                Operand::new(vio.view(), &[l.agent, l.next_obs]),
            ],
            &[l.agent, l.obs, l.action],
        )?;
        let prefactor = self.prefactor.view().insert_axis(Axis(1)).insert_axis(Axis(1));
        let gamma = self.gamma.view().insert_axis(Axis(1)).insert_axis(Axis(1));
        Ok(&*rioa * &prefactor + &next * &gamma)
    }

    /// Reward-prediction error `Qioa[i, o, a] - Vio[i, o]`.
    ///
    /// It vanishes in expectation over the current policy:
    /// `Σ_a X[i, o, a]·TD[i, o, a] = 0`.
    pub fn td_error(&mut self, x: &Array3<f64>, pre: Precomputed<'_>) -> Result<Array3<f64>> {
        self.check_policy(x)?;
        let (xisa, bios) = self.upstream(x, &pre)?;
        let hints = Precomputed {
            xisa: Some(&*xisa),
            bios: Some(&*bios),
            ..pre
        };
        let rioa = match hints.rioa {
            Some(rioa) => Cow::Borrowed(rioa),
            None => Cow::Owned(self.rioa(x, hints)?),
        };
        let hints = hints.with_rioa(&rioa);
        let vio = match hints.vio {
            Some(vio) => Cow::Borrowed(vio),
            None => Cow::Owned(self.vio(x, hints)?),
        };
        let qioa = self.qioa(x, hints.with_vio(&vio))?;
        Ok(&qioa - &vio.view().insert_axis(Axis(2)))
    }

    /// Stationary observation distribution `p(i, o)` of every agent's `Tioo`.
    ///
    /// Degenerate chains are resolved against the previous result, which is
    /// then replaced by this one.
    pub fn observation_distribution(
        &mut self,
        x: &Array3<f64>,
        pre: Precomputed<'_>,
    ) -> Result<Array2<f64>> {
        let tioo = match pre.tioo {
            Some(tioo) => Cow::Borrowed(tioo),
            None => Cow::Owned(self.tioo(x, pre)?),
        };
        let distribution = self.solver.solve_batch(
            tioo.view(),
            self.cache.observation_distribution.view(),
            "observation distribution",
        )?;
        debug!(?distribution, "observation distribution");
        self.cache.observation_distribution = distribution.clone();
        Ok(distribution)
    }

    /// Long-run average reward `Ri[i] = Σ_o p(i, o)·Rio[i, o]`.
    pub fn average_reward(&mut self, x: &Array3<f64>, pre: Precomputed<'_>) -> Result<Array1<f64>> {
        self.check_policy(x)?;
        let (xisa, bios) = self.upstream(x, &pre)?;
        let hints = Precomputed {
            xisa: Some(&*xisa),
            bios: Some(&*bios),
            ..pre
        };
        let tioo = match hints.tioo {
            Some(tioo) => Cow::Borrowed(tioo),
            None => Cow::Owned(self.tioo(x, hints)?),
        };
        let rio = match hints.rio {
            Some(rio) => Cow::Borrowed(rio),
            None => Cow::Owned(self.rio(x, hints)?),
        };
        let distribution = self.observation_distribution(x, hints.with_tioo(&tioo))?;

        let l = &self.labels;
        self.contract_into(
            &[
                Operand::new(distribution.view(), &[l.agent, l.obs]),
                Operand::new(rio.view(), &[l.agent, l.obs]),
            ],
            &[l.agent],
        )
    }

    fn check_hint(&self, name: &str, shape: &[usize], expected: &[usize]) -> Result<()> {
        if shape != expected {
            return Err(Error::DimensionMismatch {
                what: "observations".to_string(),
                context: format!("{name} has shape {shape:?}, expected {expected:?}"),
            });
        }
        Ok(())
    }
}
