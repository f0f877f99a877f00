//! CLI commands and the arguments they share

pub mod learn;
pub mod solve;

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Args;
use ndarray::Array3;
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    cli::config::{EnvironmentConfig, RunConfig},
    environments::RiskReward,
    learning::StrategyLearner,
    stationary::SolveMode,
    types::AgentParameter,
};

/// Environment, engine, and initial-policy options
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// JSON run configuration; the flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Built-in environment
    #[arg(long, value_parser = ["risk-reward", "renewable-resources"])]
    pub env: Option<String>,

    /// Tabular environment file (JSON)
    #[arg(long, conflicts_with = "env")]
    pub env_file: Option<PathBuf>,

    /// Number of agents (renewable-resources)
    #[arg(long)]
    pub agents: Option<usize>,

    /// Logistic regrowth rate (renewable-resources, default 0.8)
    #[arg(long)]
    pub regrowth_rate: Option<f64>,

    /// Carrying capacity (renewable-resources, default 4)
    #[arg(long)]
    pub capacity: Option<f64>,

    /// Discount factor shared by all agents
    #[arg(long, short = 'g')]
    pub discount: Option<f64>,

    /// Scale values by 1 - discount
    #[arg(long)]
    pub prefactor: bool,

    /// Stationary solver mode (reference, vectorized)
    #[arg(long)]
    pub solve_mode: Option<SolveMode>,

    /// Beliefs from the cached state distribution
    #[arg(long)]
    pub fast_beliefs: bool,

    /// Initial policy
    #[arg(long, default_value = "uniform", value_parser = ["uniform", "random"])]
    pub policy: String,

    /// Initial policy from a JSON array of shape [agents, observations, actions]
    #[arg(long, conflicts_with = "policy")]
    pub policy_file: Option<PathBuf>,

    /// Random seed for the random initial policy
    #[arg(long)]
    pub seed: Option<u64>,
}

impl ModelArgs {
    /// Configuration file (or defaults) with the flags applied on top
    pub fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)
                .with_context(|| format!("loading run configuration {}", path.display()))?,
            None => RunConfig::default(),
        };

        if let Some(path) = &self.env_file {
            config.environment = EnvironmentConfig::Tabular { path: path.clone() };
        }
        match self.env.as_deref() {
            Some("risk-reward") => {
                if !matches!(config.environment, EnvironmentConfig::RiskReward(_)) {
                    config.environment = EnvironmentConfig::RiskReward(RiskReward::default());
                }
            }
            Some("renewable-resources") => {
                if !matches!(config.environment, EnvironmentConfig::RenewableResources { .. }) {
                    config.environment = EnvironmentConfig::RenewableResources {
                        agents: 1,
                        regrowth_rate: 0.8,
                        capacity: 4.0,
                        observation_groups: None,
                    };
                }
            }
            Some(other) => return Err(anyhow!("Unknown environment: '{other}'")),
            None => {}
        }
        if let EnvironmentConfig::RenewableResources {
            agents,
            regrowth_rate,
            capacity,
            ..
        } = &mut config.environment
        {
            *agents = self.agents.unwrap_or(*agents);
            *regrowth_rate = self.regrowth_rate.unwrap_or(*regrowth_rate);
            *capacity = self.capacity.unwrap_or(*capacity);
        } else if self.agents.is_some() || self.regrowth_rate.is_some() || self.capacity.is_some() {
            return Err(anyhow!(
                "--agents, --regrowth-rate and --capacity apply to renewable-resources only"
            ));
        }

        if let Some(discount) = self.discount {
            config.dynamics.discount_factors = AgentParameter::Shared(discount);
        }
        config.dynamics.use_prefactor |= self.prefactor;
        config.dynamics.fast_beliefs |= self.fast_beliefs;
        if let Some(mode) = self.solve_mode {
            config.dynamics.solve_mode = mode;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }

    /// Initial joint policy for `learner`
    pub fn initial_policy(&self, learner: &StrategyLearner, seed: Option<u64>) -> Result<Array3<f64>> {
        if let Some(path) = &self.policy_file {
            let file = std::fs::File::open(path)
                .with_context(|| format!("opening policy file {}", path.display()))?;
            let policy: Array3<f64> = serde_json::from_reader(file)
                .with_context(|| format!("parsing policy file {}", path.display()))?;
            return Ok(policy);
        }
        match self.policy.as_str() {
            "random" => {
                let mut rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_os_rng(),
                };
                Ok(learner.random_softmax_strategy(&mut rng))
            }
            _ => Ok(learner.zero_intelligence_strategy()),
        }
    }
}
