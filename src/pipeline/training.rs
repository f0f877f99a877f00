//! Learning pipeline: iterate a learner until its policy settles

use ndarray::Array3;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    Error, Result,
    ports::{Learner, Observer, StepRecord},
};

/// Learning run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Upper bound on the number of updates
    pub max_steps: usize,

    /// The run has converged once no policy entry moves by more than this
    pub tolerance: f64,

    /// Follow the dynamics backwards in time
    #[serde(default)]
    pub reverse: bool,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            max_steps: 10_000,
            tolerance: 1e-6,
            reverse: false,
        }
    }
}

/// Result of a learning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningResult {
    /// Identifier of the learner that ran
    pub learner_id: String,

    /// Updates performed
    pub steps: usize,

    /// Whether the tolerance was reached before the step limit
    pub converged: bool,

    /// Largest policy change of the last update
    pub final_change: Option<f64>,

    /// Policy the run started from
    pub initial_policy: Array3<f64>,

    /// Policy after the last update
    pub final_policy: Array3<f64>,

    /// Prediction error of the last update
    pub final_td_error: Option<Array3<f64>>,
}

impl LearningResult {
    /// Save result to JSON file
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Load result from JSON file
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let result = serde_json::from_reader(file)?;
        Ok(result)
    }
}

/// Learning pipeline for one learner
pub struct LearningPipeline {
    config: LearningConfig,
    observers: Vec<Box<dyn Observer>>,
}

impl LearningPipeline {
    pub fn new(config: LearningConfig) -> Self {
        Self {
            config,
            observers: Vec::new(),
        }
    }

    /// Add an observer to the pipeline
    pub fn with_observer(mut self, observer: Box<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    /// Run the learner from `initial` until convergence or the step limit.
    ///
    /// # Errors
    ///
    /// Fails on a policy of the wrong shape, on any learner or observer
    /// error, and when an update produces non-finite probabilities.
    pub fn run(&mut self, learner: &mut dyn Learner, initial: Array3<f64>) -> Result<LearningResult> {
        let expected = learner.policy_shape();
        if initial.shape() != expected {
            return Err(Error::PolicyShape {
                expected: expected.to_vec(),
                got: initial.shape().to_vec(),
            });
        }

        let learner_id = learner.id();
        info!(
            learner = %learner_id,
            max_steps = self.config.max_steps,
            tolerance = self.config.tolerance,
            reverse = self.config.reverse,
            "starting learning run"
        );

        for observer in &mut self.observers {
            observer.on_run_start(self.config.max_steps, &initial)?;
        }

        let mut policy = initial.clone();
        let mut td_error = None;
        let mut final_change = None;
        let mut steps = 0;
        let mut converged = false;

        while steps < self.config.max_steps {
            let update = if self.config.reverse {
                learner.reverse_step(&policy)?
            } else {
                learner.step(&policy)?
            };
            steps += 1;

            if update.policy.iter().any(|p| !p.is_finite()) {
                return Err(Error::NonFinitePolicy { step: steps });
            }
            let change = (&update.policy - &policy)
                .iter()
                .fold(0.0_f64, |max, d| max.max(d.abs()));

            let record = StepRecord {
                step: steps,
                policy: &update.policy,
                td_error: &update.td_error,
                change,
            };
            for observer in &mut self.observers {
                observer.on_step(&record)?;
            }

            policy = update.policy;
            td_error = Some(update.td_error);
            final_change = Some(change);

            if change < self.config.tolerance {
                converged = true;
                break;
            }
        }

        for observer in &mut self.observers {
            observer.on_run_end(steps, converged)?;
        }

        if converged {
            info!(steps, "learning run converged");
        } else {
            warn!(steps, ?final_change, "learning run hit the step limit before converging");
        }

        Ok(LearningResult {
            learner_id,
            steps,
            converged,
            final_change,
            initial_policy: initial,
            final_policy: policy,
            final_td_error: td_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::LearningStep;

    /// Halves the distance to a fixed target each step.
    struct Halving {
        target: Array3<f64>,
    }

    impl Learner for Halving {
        fn step(&mut self, x: &Array3<f64>) -> Result<LearningStep> {
            Ok(LearningStep {
                policy: (x + &self.target) * 0.5,
                td_error: Array3::zeros(x.raw_dim()),
            })
        }

        fn reverse_step(&mut self, x: &Array3<f64>) -> Result<LearningStep> {
            Ok(LearningStep {
                policy: x * 2.0 - &self.target,
                td_error: Array3::zeros(x.raw_dim()),
            })
        }

        fn policy_shape(&self) -> [usize; 3] {
            [1, 1, 2]
        }

        fn id(&self) -> String {
            "halving".to_string()
        }
    }

    fn halving() -> Halving {
        let mut target = Array3::zeros((1, 1, 2));
        target[[0, 0, 0]] = 1.0;
        Halving { target }
    }

    #[test]
    fn run_stops_at_tolerance() {
        let config = LearningConfig {
            max_steps: 100,
            tolerance: 1e-3,
            reverse: false,
        };
        let mut pipeline = LearningPipeline::new(config);
        let initial = Array3::from_elem((1, 1, 2), 0.5);
        let result = pipeline.run(&mut halving(), initial).unwrap();

        assert!(result.converged);
        // change after step k is 0.5^(k+1)
        assert_eq!(result.steps, 9);
        assert!(result.final_policy[[0, 0, 0]] > 0.999);
    }

    #[test]
    fn run_respects_step_limit() {
        let config = LearningConfig {
            max_steps: 3,
            tolerance: 0.0,
            reverse: false,
        };
        let mut pipeline = LearningPipeline::new(config);
        let result = pipeline
            .run(&mut halving(), Array3::from_elem((1, 1, 2), 0.5))
            .unwrap();
        assert!(!result.converged);
        assert_eq!(result.steps, 3);
    }

    #[test]
    fn run_rejects_policy_of_wrong_shape() {
        let mut pipeline = LearningPipeline::new(LearningConfig::default());
        let err = pipeline
            .run(&mut halving(), Array3::from_elem((1, 2, 2), 0.5))
            .unwrap_err();
        assert!(matches!(err, Error::PolicyShape { .. }));
    }

    #[test]
    fn zero_step_run_returns_initial_policy() {
        let config = LearningConfig {
            max_steps: 0,
            ..LearningConfig::default()
        };
        let initial = Array3::from_elem((1, 1, 2), 0.5);
        let result = LearningPipeline::new(config)
            .run(&mut halving(), initial.clone())
            .unwrap();
        assert_eq!(result.final_policy, initial);
        assert!(result.final_td_error.is_none());
    }
}
