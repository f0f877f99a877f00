//! Observer port - abstraction for learning-run observation
//!
//! Observers collect data during a run without coupling the pipeline to an
//! output format.

use ndarray::Array3;

use crate::Result;

/// One completed update, as seen by observers.
#[derive(Debug, Clone, Copy)]
pub struct StepRecord<'a> {
    /// 1-based step number
    pub step: usize,
    /// Policy after the update
    pub policy: &'a Array3<f64>,
    /// Prediction error that drove the update
    pub td_error: &'a Array3<f64>,
    /// Largest absolute policy change of the update
    pub change: f64,
}

/// Observer trait for monitoring learning runs
///
/// # Event Sequence
///
/// 1. `on_run_start(max_steps, initial_policy)` - once
/// 2. `on_step(record)` - after every update
/// 3. `on_run_end(steps, converged)` - once, also when the run stops early
///
/// # Examples
///
/// ```no_run
/// use crld::ports::{Observer, StepRecord};
///
/// struct ChangeLog(Vec<f64>);
///
/// impl Observer for ChangeLog {
///     fn on_step(&mut self, record: &StepRecord<'_>) -> crld::Result<()> {
///         self.0.push(record.change);
///         Ok(())
///     }
/// }
/// ```
pub trait Observer: Send {
    /// Called before the first update.
    fn on_run_start(&mut self, _max_steps: usize, _initial_policy: &Array3<f64>) -> Result<()> {
        Ok(())
    }

    /// Called after every update.
    fn on_step(&mut self, _record: &StepRecord<'_>) -> Result<()> {
        Ok(())
    }

    /// Called when the run ends. Use this to flush outputs.
    fn on_run_end(&mut self, _steps: usize, _converged: bool) -> Result<()> {
        Ok(())
    }
}
