//! Environment given by explicit tensors.

use std::path::Path;

use ndarray::{Array3, ArrayD};
use serde::{Deserialize, Serialize};

use super::{Environment, identity_observations};
use crate::Result;

/// An environment whose models are stored verbatim.
///
/// Shape consistency is checked by the engine at construction, not here, so
/// that a malformed file surfaces as a dimension error naming the offending
/// tensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularEnvironment {
    name: String,
    transitions: ArrayD<f64>,
    rewards: ArrayD<f64>,
    observations: Array3<f64>,
    #[serde(default)]
    state_labels: Vec<String>,
    #[serde(default)]
    action_labels: Vec<Vec<String>>,
    #[serde(default)]
    observation_labels: Vec<String>,
}

impl TabularEnvironment {
    pub fn new(
        name: impl Into<String>,
        transitions: ArrayD<f64>,
        rewards: ArrayD<f64>,
        observations: Array3<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            transitions,
            rewards,
            observations,
            state_labels: Vec::new(),
            action_labels: Vec::new(),
            observation_labels: Vec::new(),
        }
    }

    /// Every agent observes the state directly.
    pub fn fully_observable(
        name: impl Into<String>,
        transitions: ArrayD<f64>,
        rewards: ArrayD<f64>,
    ) -> Self {
        let (agents, states) = match rewards.shape() {
            [agents, states, ..] => (*agents, *states),
            _ => (0, 0),
        };
        let observations = identity_observations(agents, states);
        Self::new(name, transitions, rewards, observations)
    }

    pub fn with_state_labels(mut self, labels: Vec<String>) -> Self {
        self.state_labels = labels;
        self
    }

    pub fn with_action_labels(mut self, labels: Vec<Vec<String>>) -> Self {
        self.action_labels = labels;
        self
    }

    pub fn with_observation_labels(mut self, labels: Vec<String>) -> Self {
        self.observation_labels = labels;
        self
    }

    /// Load from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let env = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(env)
    }

    /// Save as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

fn numbered(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|k| format!("{prefix}{k}")).collect()
}

impl Environment for TabularEnvironment {
    fn transition_tensor(&self) -> ArrayD<f64> {
        self.transitions.clone()
    }

    fn reward_tensor(&self) -> ArrayD<f64> {
        self.rewards.clone()
    }

    fn observation_tensor(&self) -> Array3<f64> {
        self.observations.clone()
    }

    fn actions(&self) -> Vec<Vec<String>> {
        if !self.action_labels.is_empty() {
            return self.action_labels.clone();
        }
        let agents = self.rewards.shape().first().copied().unwrap_or(0);
        let actions = self.transitions.shape().get(1).copied().unwrap_or(0);
        vec![numbered("a", actions); agents]
    }

    fn states(&self) -> Vec<String> {
        if !self.state_labels.is_empty() {
            return self.state_labels.clone();
        }
        numbered("s", self.transitions.shape().first().copied().unwrap_or(0))
    }

    fn observations(&self) -> Vec<String> {
        if !self.observation_labels.is_empty() {
            return self.observation_labels.clone();
        }
        numbered("o", self.observations.shape()[2])
    }

    fn id(&self) -> String {
        self.name.clone()
    }
}
