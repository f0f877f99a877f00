//! Single-agent decision problem with a prosperous and a degraded state.
//!
//! In the prosperous state the cautious action keeps the environment
//! prosperous, while the risky action earns more but collapses it with
//! probability `pc`. In the degraded state the cautious action recovers it
//! with probability `pr`, the risky action never does.

use ndarray::{Array3, Array4, ArrayD};
use serde::{Deserialize, Serialize};

use super::Environment;

const PROSPEROUS: usize = 0;
const DEGRADED: usize = 1;
const CAUTIOUS: usize = 0;
const RISKY: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskReward {
    /// Collapse probability when risky in the prosperous state
    pub pc: f64,
    /// Recovery probability when cautious in the degraded state
    pub pr: f64,
    /// Reward for staying prosperous while cautious
    pub rs: f64,
    /// Reward for staying prosperous while risky
    pub rr: f64,
    /// Reward whenever the transition ends degraded
    pub rd: f64,
}

impl RiskReward {
    pub fn new(pc: f64, pr: f64, rs: f64, rr: f64, rd: f64) -> Self {
        Self { pc, pr, rs, rr, rd }
    }
}

impl Default for RiskReward {
    fn default() -> Self {
        Self::new(0.2, 0.01, 0.8, 1.0, 0.0)
    }
}

impl Environment for RiskReward {
    fn transition_tensor(&self) -> ArrayD<f64> {
        let mut t = Array3::zeros((2, 2, 2));
        t[[PROSPEROUS, CAUTIOUS, PROSPEROUS]] = 1.0;
        t[[PROSPEROUS, RISKY, PROSPEROUS]] = 1.0 - self.pc;
        t[[PROSPEROUS, RISKY, DEGRADED]] = self.pc;
        t[[DEGRADED, CAUTIOUS, PROSPEROUS]] = self.pr;
        t[[DEGRADED, CAUTIOUS, DEGRADED]] = 1.0 - self.pr;
        t[[DEGRADED, RISKY, DEGRADED]] = 1.0;
        t.into_dyn()
    }

    fn reward_tensor(&self) -> ArrayD<f64> {
        let mut r = Array4::zeros((1, 2, 2, 2));
        r[[0, PROSPEROUS, CAUTIOUS, PROSPEROUS]] = self.rs;
        r[[0, PROSPEROUS, RISKY, PROSPEROUS]] = self.rr;
        r[[0, PROSPEROUS, RISKY, DEGRADED]] = self.rd;
        r[[0, DEGRADED, CAUTIOUS, DEGRADED]] = self.rd;
        r[[0, DEGRADED, RISKY, DEGRADED]] = self.rd;
        r.into_dyn()
    }

    fn actions(&self) -> Vec<Vec<String>> {
        vec![vec!["cautious".to_string(), "risky".to_string()]]
    }

    fn states(&self) -> Vec<String> {
        vec!["prosperous".to_string(), "degraded".to_string()]
    }

    fn id(&self) -> String {
        format!(
            "RiskReward_pc{}_pr{}_rs{}_rr{}_rd{}",
            self.pc, self.pr, self.rs, self.rr, self.rd
        )
    }
}
