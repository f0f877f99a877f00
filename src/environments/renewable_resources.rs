//! Harvested renewable stock with logistic regrowth.
//!
//! The stock level is the state. Each agent chooses an extraction level
//! (none, low, high) relative to the maximum sustainable yield. After
//! harvesting the stock regrows logistically; the next state is drawn from a
//! Gaussian around the resulting stock, discretized to the integer levels.
//! A depleted stock recovers with a probability that is higher the less the
//! agents extract.
//!
//! Agents may observe the stock only coarsely: `observation_groups[o]` lists
//! the stock levels that emit observation `o`.

use ndarray::{Array3, ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erf;

use super::Environment;
use crate::{Error, Result, tensor::omega::decode_joint_action};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenewableResources {
    agents: usize,
    regrowth_rate: f64,
    capacity: f64,
    recovery_probability: f64,
    extraction_spread: f64,
    noise: f64,
    observation_groups: Option<Vec<Vec<usize>>>,
}

impl RenewableResources {
    /// Single-agent stock with regrowth rate `r` and capacity `capacity`.
    pub fn new(regrowth_rate: f64, capacity: f64) -> Result<Self> {
        if !(regrowth_rate > 0.0 && regrowth_rate.is_finite()) {
            return Err(Error::InvalidConfiguration {
                message: format!("regrowth rate must be positive, got {regrowth_rate}"),
            });
        }
        if !(capacity > 2.0 && capacity.is_finite()) {
            return Err(Error::InvalidConfiguration {
                message: format!("capacity must exceed 2 stock levels, got {capacity}"),
            });
        }
        Ok(Self {
            agents: 1,
            regrowth_rate,
            capacity,
            recovery_probability: 0.1,
            extraction_spread: 0.2,
            noise: 1.0,
            observation_groups: None,
        })
    }

    pub fn with_agents(mut self, agents: usize) -> Result<Self> {
        if agents == 0 {
            return Err(Error::InvalidConfiguration {
                message: "at least one agent is required".to_string(),
            });
        }
        self.agents = agents;
        Ok(self)
    }

    pub fn with_recovery_probability(mut self, probability: f64) -> Self {
        self.recovery_probability = probability;
        self
    }

    /// Relative distance of the low and high extraction levels from the maximum sustainable yield.
    pub fn with_extraction_spread(mut self, spread: f64) -> Self {
        self.extraction_spread = spread;
        self
    }

    /// Standard deviation of the transition noise.
    pub fn with_noise(mut self, noise: f64) -> Result<Self> {
        if !(noise > 0.0 && noise.is_finite()) {
            return Err(Error::InvalidConfiguration {
                message: format!("transition noise must be positive, got {noise}"),
            });
        }
        self.noise = noise;
        Ok(self)
    }

    /// Coarse observations; every stock level must belong to at least one group.
    pub fn with_observation_groups(mut self, groups: Vec<Vec<usize>>) -> Result<Self> {
        let levels = self.levels();
        for state in 0..levels {
            if !groups.iter().any(|group| group.contains(&state)) {
                return Err(Error::InvalidConfiguration {
                    message: format!("stock level {state} is not covered by any observation"),
                });
            }
        }
        if let Some(state) = groups.iter().flatten().find(|&&state| state >= levels) {
            return Err(Error::InvalidConfiguration {
                message: format!("observation refers to stock level {state}, only {levels} exist"),
            });
        }
        self.observation_groups = Some(groups);
        Ok(self)
    }

    fn growth(&self, stock: f64) -> f64 {
        self.regrowth_rate * stock * (1.0 - stock / self.capacity)
    }

    /// Number of stock levels: zero plus every level with positive regrowth.
    pub fn levels(&self) -> usize {
        let mut stock = 1;
        while self.growth(stock as f64) > 0.0 {
            stock += 1;
        }
        stock
    }

    fn maximum_sustainable_yield(&self) -> f64 {
        (0..self.levels())
            .map(|stock| self.growth(stock as f64))
            .fold(0.0, f64::max)
    }

    /// Extraction amounts of the none / low / high actions.
    pub fn extraction_levels(&self) -> [f64; 3] {
        let msy = self.maximum_sustainable_yield();
        [
            0.0,
            (1.0 - self.extraction_spread) * msy,
            (1.0 + self.extraction_spread) * msy,
        ]
    }

    fn recovery(&self, joint: &[usize]) -> f64 {
        let per_action = [
            (1.0 + self.extraction_spread) * self.recovery_probability,
            (1.0 - self.extraction_spread) * self.recovery_probability,
            0.0,
        ];
        joint.iter().map(|&a| per_action[a]).sum::<f64>() / joint.len() as f64
    }

    fn normal_cdf(&self, x: f64, mean: f64) -> f64 {
        0.5 * (1.0 + erf((x - mean) / (self.noise * std::f64::consts::SQRT_2)))
    }

    fn transition_probability(&self, state: usize, joint: &[usize], next: usize) -> f64 {
        let levels = self.levels();
        let extraction = self.extraction_levels();
        let harvest: f64 = joint.iter().map(|&a| extraction[a]).sum();
        let remaining = (state as f64 - harvest).max(0.0);
        let regrown = (remaining + self.growth(remaining))
            .max(self.recovery(joint))
            .min((levels - 1) as f64);

        if next == 0 {
            self.normal_cdf(0.5, regrown)
        } else if next == levels - 1 {
            1.0 - self.normal_cdf(levels as f64 - 1.5, regrown)
        } else {
            self.normal_cdf(next as f64 + 0.5, regrown) - self.normal_cdf(next as f64 - 0.5, regrown)
        }
    }

    fn reward(&self, agent: usize, state: usize, joint: &[usize], next: usize) -> f64 {
        let extracted = self.extraction_levels()[joint[agent]];
        if state == 0 || next == 0 {
            0.1 * extracted
        } else {
            extracted
        }
    }

    fn model_shape(&self, leading: &[usize]) -> Vec<usize> {
        let levels = self.levels();
        let mut shape = leading.to_vec();
        shape.push(levels);
        shape.extend(std::iter::repeat_n(3, self.agents));
        shape.push(levels);
        shape
    }
}

impl Environment for RenewableResources {
    fn transition_tensor(&self) -> ArrayD<f64> {
        let levels = self.levels();
        let mut t = ArrayD::zeros(IxDyn(&self.model_shape(&[])));
        let mut index = Vec::with_capacity(self.agents + 2);
        for state in 0..levels {
            for flat in 0..3usize.pow(self.agents as u32) {
                let joint = decode_joint_action(flat, self.agents, 3);
                for next in 0..levels {
                    index.clear();
                    index.push(state);
                    index.extend_from_slice(&joint);
                    index.push(next);
                    t[IxDyn(&index)] = self.transition_probability(state, &joint, next);
                }
            }
        }
        t
    }

    fn reward_tensor(&self) -> ArrayD<f64> {
        let levels = self.levels();
        let mut r = ArrayD::zeros(IxDyn(&self.model_shape(&[self.agents])));
        let mut index = Vec::with_capacity(self.agents + 3);
        for agent in 0..self.agents {
            for state in 0..levels {
                for flat in 0..3usize.pow(self.agents as u32) {
                    let joint = decode_joint_action(flat, self.agents, 3);
                    for next in 0..levels {
                        index.clear();
                        index.push(agent);
                        index.push(state);
                        index.extend_from_slice(&joint);
                        index.push(next);
                        r[IxDyn(&index)] = self.reward(agent, state, &joint, next);
                    }
                }
            }
        }
        r
    }

    fn observation_tensor(&self) -> Array3<f64> {
        let levels = self.levels();
        let groups: Vec<Vec<usize>> = match &self.observation_groups {
            Some(groups) => groups.clone(),
            None => (0..levels).map(|state| vec![state]).collect(),
        };
        let mut o = Array3::zeros((self.agents, levels, groups.len()));
        for (observation, group) in groups.iter().enumerate() {
            for &state in group {
                for agent in 0..self.agents {
                    o[[agent, state, observation]] = 1.0;
                }
            }
        }
        for mut row in o.rows_mut() {
            let total = row.sum();
            if total > 0.0 {
                row /= total;
            }
        }
        o
    }

    fn actions(&self) -> Vec<Vec<String>> {
        let labels = vec!["0".to_string(), "low".to_string(), "high".to_string()];
        vec![labels; self.agents]
    }

    fn states(&self) -> Vec<String> {
        (0..self.levels()).map(|stock| stock.to_string()).collect()
    }

    fn observations(&self) -> Vec<String> {
        match &self.observation_groups {
            Some(groups) => groups
                .iter()
                .map(|group| {
                    let members: Vec<String> = group.iter().map(|s| s.to_string()).collect();
                    members.join("|")
                })
                .collect(),
            None => self.states(),
        }
    }

    fn id(&self) -> String {
        format!(
            "RenewableResources_{}_{}_{}",
            self.agents, self.regrowth_rate, self.capacity
        )
    }
}
