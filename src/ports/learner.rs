//! Learner port - one deterministic policy update at a time

use ndarray::Array3;

use crate::Result;

/// Outcome of one policy update.
#[derive(Debug, Clone)]
pub struct LearningStep {
    /// Updated joint policy `X[i, o, a]`
    pub policy: Array3<f64>,
    /// Prediction error the update followed
    pub td_error: Array3<f64>,
}

/// A policy-update rule driven by the learning pipeline.
///
/// # Examples
///
/// ```no_run
/// use crld::ports::{Learner, LearningStep};
/// use ndarray::Array3;
///
/// struct Frozen;
///
/// impl Learner for Frozen {
///     fn step(&mut self, x: &Array3<f64>) -> crld::Result<LearningStep> {
///         Ok(LearningStep { policy: x.clone(), td_error: Array3::zeros(x.raw_dim()) })
///     }
///
///     fn reverse_step(&mut self, x: &Array3<f64>) -> crld::Result<LearningStep> {
///         self.step(x)
///     }
///
///     fn policy_shape(&self) -> [usize; 3] {
///         [1, 2, 2]
///     }
///
///     fn id(&self) -> String {
///         "frozen".to_string()
///     }
/// }
/// ```
pub trait Learner: Send {
    /// Move the joint policy one step along the learning dynamics.
    fn step(&mut self, x: &Array3<f64>) -> Result<LearningStep>;

    /// Move the joint policy one step against the learning dynamics.
    ///
    /// Running backwards in time traces separatrices between basins of attraction.
    fn reverse_step(&mut self, x: &Array3<f64>) -> Result<LearningStep>;

    /// Shape `[agents, observations, actions]` of the policies this learner accepts.
    fn policy_shape(&self) -> [usize; 3];

    /// Identifier naming the environment and the learner parameters.
    fn id(&self) -> String;
}
