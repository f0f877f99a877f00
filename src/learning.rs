//! Deterministic strategy-averaged temporal-difference learning.
//!
//! Instead of sampling experience, every agent updates its policy along the
//! expected prediction error of the current joint policy:
//!
//! ```text
//! X'[i, o, a] ∝ X[i, o, a] · exp(α_i · β_i · TD[i, o, a])
//! ```
//!
//! The averaged models come from [`AveragedDynamics`].

use ndarray::{Array1, Array3, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Result,
    dynamics::{AveragedDynamics, DynamicsConfig, Precomputed},
    environments::Environment,
    ports::{Learner, LearningStep},
    types::{AgentParameter, Dimensions},
    utils::{normalize_last_axis, softmax_last_axis, standard_normal},
};

/// Learning rates, choice intensities, and centering of the prediction error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerConfig {
    /// Step size `α` per agent
    pub learning_rates: AgentParameter,
    /// Intensity of choice `β` per agent; scales the prediction error
    pub choice_intensities: AgentParameter,
    /// Subtract the mean over actions from the prediction error
    #[serde(default)]
    pub centered: bool,
}

impl LearnerConfig {
    pub fn new(learning_rates: impl Into<AgentParameter>) -> Self {
        Self {
            learning_rates: learning_rates.into(),
            choice_intensities: AgentParameter::Shared(1.0),
            centered: false,
        }
    }

    pub fn with_choice_intensities(mut self, choice_intensities: impl Into<AgentParameter>) -> Self {
        self.choice_intensities = choice_intensities.into();
        self
    }

    pub fn with_centering(mut self, centered: bool) -> Self {
        self.centered = centered;
        self
    }
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self::new(0.1)
    }
}

/// Independent learners following the strategy-averaged prediction error.
#[derive(Debug, Clone)]
pub struct StrategyLearner {
    dynamics: AveragedDynamics,
    learning_rates: Array1<f64>,
    choice_intensities: Array1<f64>,
    centered: bool,
    use_prefactor: bool,
    env_id: String,
}

impl StrategyLearner {
    pub fn new(
        env: &dyn Environment,
        dynamics: DynamicsConfig,
        learner: LearnerConfig,
    ) -> Result<Self> {
        let use_prefactor = dynamics.use_prefactor;
        let engine = AveragedDynamics::new(env, dynamics)?;
        let agents = engine.dimensions().agents;
        Ok(Self {
            learning_rates: learner.learning_rates.resolve("learning rates", agents)?,
            choice_intensities: learner
                .choice_intensities
                .resolve("choice intensities", agents)?,
            centered: learner.centered,
            use_prefactor,
            env_id: env.id(),
            dynamics: engine,
        })
    }

    pub fn dynamics(&self) -> &AveragedDynamics {
        &self.dynamics
    }

    pub fn dynamics_mut(&mut self) -> &mut AveragedDynamics {
        &mut self.dynamics
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dynamics.dimensions()
    }

    pub fn learning_rates(&self) -> &Array1<f64> {
        &self.learning_rates
    }

    pub fn choice_intensities(&self) -> &Array1<f64> {
        &self.choice_intensities
    }

    /// Prediction error scaled by the choice intensities, centered if configured.
    pub fn temporal_difference(&mut self, x: &Array3<f64>) -> Result<Array3<f64>> {
        let mut td = self.dynamics.td_error(x, Precomputed::none())?;
        td *= &self
            .choice_intensities
            .view()
            .insert_axis(Axis(1))
            .insert_axis(Axis(1));
        if self.centered {
            if let Some(mean) = td.mean_axis(Axis(2)) {
                td -= &mean.insert_axis(Axis(2));
            }
        }
        Ok(td)
    }

    /// One forward learning step.
    pub fn step(&mut self, x: &Array3<f64>) -> Result<LearningStep> {
        self.update(x, 1.0)
    }

    /// One step with the prediction error negated.
    pub fn reverse_step(&mut self, x: &Array3<f64>) -> Result<LearningStep> {
        self.update(x, -1.0)
    }

    fn update(&mut self, x: &Array3<f64>, direction: f64) -> Result<LearningStep> {
        let td = self.temporal_difference(x)?;
        let alpha = self
            .learning_rates
            .view()
            .insert_axis(Axis(1))
            .insert_axis(Axis(1));
        let mut weights = &td * &alpha * direction;
        softmax_last_axis(&mut weights);
        let mut policy = x * &weights;
        normalize_last_axis(&mut policy);
        debug!(direction, "strategy update");
        Ok(LearningStep {
            policy,
            td_error: td,
        })
    }

    /// Uniform joint policy.
    pub fn zero_intelligence_strategy(&self) -> Array3<f64> {
        let [agents, observations, actions] = self.dimensions().policy_shape();
        Array3::from_elem((agents, observations, actions), 1.0 / actions as f64)
    }

    /// Softmax of standard-normal action preferences.
    pub fn random_softmax_strategy<R: Rng + ?Sized>(&self, rng: &mut R) -> Array3<f64> {
        let [agents, observations, actions] = self.dimensions().policy_shape();
        let mut x = Array3::from_shape_fn((agents, observations, actions), |_| standard_normal(rng));
        softmax_last_axis(&mut x);
        x
    }

    /// `<env id>__StrategyLearner_[PartObs_]α<..>_γ<..>_β<..>_pre<bool>`
    pub fn id(&self) -> String {
        let mut id = format!("{}__StrategyLearner_", self.env_id);
        if !self.fully_observable() {
            id.push_str("PartObs_");
        }
        id.push_str(&format!(
            "α{}_γ{}_β{}_pre{}",
            format_vector(&self.learning_rates),
            format_vector(self.dynamics.discount_factors()),
            format_vector(&self.choice_intensities),
            self.use_prefactor
        ));
        id
    }

    fn fully_observable(&self) -> bool {
        let dims = self.dimensions();
        dims.states == dims.observations
            && self
                .dynamics
                .observation_tensor()
                .indexed_iter()
                .all(|((_, s, o), &p)| p == if s == o { 1.0 } else { 0.0 })
    }
}

fn format_vector(values: &Array1<f64>) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

impl Learner for StrategyLearner {
    fn step(&mut self, x: &Array3<f64>) -> Result<LearningStep> {
        StrategyLearner::step(self, x)
    }

    fn reverse_step(&mut self, x: &Array3<f64>) -> Result<LearningStep> {
        StrategyLearner::reverse_step(self, x)
    }

    fn policy_shape(&self) -> [usize; 3] {
        self.dimensions().policy_shape()
    }

    fn id(&self) -> String {
        StrategyLearner::id(self)
    }
}
