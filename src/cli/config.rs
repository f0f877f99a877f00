//! Run configuration shared by the CLI commands
//!
//! A [`RunConfig`] can be loaded from JSON with `--config`; explicit flags
//! override what the file says.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    dynamics::DynamicsConfig,
    environments::{Environment, RenewableResources, RiskReward, TabularEnvironment},
    learning::LearnerConfig,
    pipeline::LearningConfig,
};

/// Which environment to build, with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EnvironmentConfig {
    RiskReward(RiskReward),
    RenewableResources {
        #[serde(default = "default_agents")]
        agents: usize,
        regrowth_rate: f64,
        capacity: f64,
        #[serde(default)]
        observation_groups: Option<Vec<Vec<usize>>>,
    },
    Tabular {
        path: PathBuf,
    },
}

fn default_agents() -> usize {
    1
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        EnvironmentConfig::RiskReward(RiskReward::default())
    }
}

impl EnvironmentConfig {
    /// Build the configured environment.
    pub fn build(&self) -> Result<Box<dyn Environment>> {
        match self {
            EnvironmentConfig::RiskReward(env) => Ok(Box::new(*env)),
            EnvironmentConfig::RenewableResources {
                agents,
                regrowth_rate,
                capacity,
                observation_groups,
            } => {
                let mut env =
                    RenewableResources::new(*regrowth_rate, *capacity)?.with_agents(*agents)?;
                if let Some(groups) = observation_groups {
                    env = env.with_observation_groups(groups.clone())?;
                }
                Ok(Box::new(env))
            }
            EnvironmentConfig::Tabular { path } => Ok(Box::new(TabularEnvironment::load(path)?)),
        }
    }
}

/// Complete configuration of a `solve` or `learn` invocation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RunConfig {
    pub environment: EnvironmentConfig,
    pub dynamics: DynamicsConfig,
    pub learner: LearnerConfig,
    pub learning: LearningConfig,
    /// Seed for random initial policies
    pub seed: Option<u64>,
}

impl RunConfig {
    /// Load from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| Error::Io {
            operation: format!("open config {}", path.display()),
            source,
        })?;
        Ok(serde_json::from_reader(file)?)
    }

    /// Save as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AgentParameter;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: RunConfig = serde_json::from_str(
            r#"{
                "environment": { "kind": "renewable-resources", "regrowth_rate": 0.8, "capacity": 5.0 },
                "dynamics": { "discount_factors": [0.9], "use_prefactor": true,
                              "opteinsum": true, "solve_mode": "vectorized", "tolerance": 1e-10 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.dynamics.discount_factors, AgentParameter::PerAgent(vec![0.9]));
        assert_eq!(config.learning.max_steps, LearningConfig::default().max_steps);
        let env = config.environment.build().unwrap();
        assert_eq!(env.id(), "RenewableResources_1_0.8_5");
    }

    #[test]
    fn config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let config = RunConfig {
            seed: Some(11),
            ..RunConfig::default()
        };
        config.save(&path).unwrap();
        let loaded = RunConfig::load(&path).unwrap();
        assert_eq!(loaded.seed, Some(11));
        assert_eq!(loaded.environment, EnvironmentConfig::default());
    }
}
