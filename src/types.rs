//! Shared value types: model dimensions and per-agent parameters.

use std::fmt;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Sizes of the agent, action, state, and observation spaces.
///
/// Fixed once an engine is constructed; every derived tensor is shaped from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Number of agents `N`
    pub agents: usize,
    /// Number of actions per agent `M`
    pub actions: usize,
    /// Number of hidden environment states `Z`
    pub states: usize,
    /// Number of observations per agent `Q`
    pub observations: usize,
}

impl Dimensions {
    /// Shape of a joint policy `X[i, o, a]`.
    pub fn policy_shape(&self) -> [usize; 3] {
        [self.agents, self.observations, self.actions]
    }

    /// Number of joint actions `M^N`.
    pub fn joint_actions(&self) -> usize {
        self.actions.pow(self.agents as u32)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N={} M={} Z={} Q={}",
            self.agents, self.actions, self.states, self.observations
        )
    }
}

/// A parameter given either once for all agents or once per agent.
///
/// Deserializes from a bare number or an array of numbers.
///
/// ```
/// use crld::types::AgentParameter;
///
/// let shared = AgentParameter::from(0.9).resolve("discount factors", 3)?;
/// assert_eq!(shared.to_vec(), vec![0.9, 0.9, 0.9]);
///
/// let each = AgentParameter::from(vec![0.9, 0.5]);
/// assert!(each.resolve("discount factors", 3).is_err());
/// # Ok::<(), crld::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentParameter {
    Shared(f64),
    PerAgent(Vec<f64>),
}

impl AgentParameter {
    /// Expand to one value per agent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ParameterLength`] when a per-agent vector has the wrong length.
    pub fn resolve(&self, parameter: &str, agents: usize) -> crate::Result<Array1<f64>> {
        match self {
            AgentParameter::Shared(value) => Ok(Array1::from_elem(agents, *value)),
            AgentParameter::PerAgent(values) if values.len() == agents => {
                Ok(Array1::from_vec(values.clone()))
            }
            AgentParameter::PerAgent(values) => Err(crate::Error::ParameterLength {
                parameter: parameter.to_string(),
                expected: agents,
                got: values.len(),
            }),
        }
    }
}

impl From<f64> for AgentParameter {
    fn from(value: f64) -> Self {
        AgentParameter::Shared(value)
    }
}

impl From<Vec<f64>> for AgentParameter {
    fn from(values: Vec<f64>) -> Self {
        AgentParameter::PerAgent(values)
    }
}

impl From<&[f64]> for AgentParameter {
    fn from(values: &[f64]) -> Self {
        AgentParameter::PerAgent(values.to_vec())
    }
}

impl fmt::Display for AgentParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentParameter::Shared(value) => write!(f, "{value}"),
            AgentParameter::PerAgent(values) => {
                let joined: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", joined.join(","))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_agent_parameter_round_trips_through_json() {
        let shared: AgentParameter = serde_json::from_str("0.75").unwrap();
        assert_eq!(shared, AgentParameter::Shared(0.75));
        let each: AgentParameter = serde_json::from_str("[0.1, 0.2]").unwrap();
        assert_eq!(each.to_string(), "[0.1,0.2]");
    }

    #[test]
    fn joint_action_count() {
        let dims = Dimensions {
            agents: 3,
            actions: 2,
            states: 4,
            observations: 4,
        };
        assert_eq!(dims.joint_actions(), 8);
        assert_eq!(dims.policy_shape(), [3, 4, 2]);
    }
}
