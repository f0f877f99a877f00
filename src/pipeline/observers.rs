//! Observer pattern for learning pipelines
//!
//! Observers allow composable data collection during a run without coupling
//! the update loop to specific output formats.

use std::{fs::File, path::Path};

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::{
    Result,
    ports::{Observer, StepRecord},
};

/// Progress bar observer - Shows run progress and the latest policy change
pub struct ProgressObserver {
    progress_bar: Option<ProgressBar>,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self { progress_bar: None }
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for ProgressObserver {
    fn on_run_start(&mut self, max_steps: usize, _initial_policy: &Array3<f64>) -> Result<()> {
        let pb = ProgressBar::new(max_steps as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} steps ({msg})")
                .map_err(|e| crate::Error::ProgressBarTemplate {
                    message: e.to_string(),
                })?
                .progress_chars("=>-"),
        );
        self.progress_bar = Some(pb);
        Ok(())
    }

    fn on_step(&mut self, record: &StepRecord<'_>) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.set_position(record.step as u64);
            pb.set_message(format!("Δ={:.2e}", record.change));
        }
        Ok(())
    }

    fn on_run_end(&mut self, steps: usize, converged: bool) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            let status = if converged { "converged" } else { "step limit" };
            pb.finish_with_message(format!("{status} after {steps} steps"));
        }
        Ok(())
    }
}

/// A policy snapshot kept by [`TrajectoryRecorder`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// Step after which the policy was taken; 0 is the initial policy
    pub step: usize,
    pub policy: Array3<f64>,
    /// Largest policy change of that step; `None` for the initial policy
    pub change: Option<f64>,
}

/// In-memory trajectory observer - Keeps every `every`-th policy
///
/// The initial and the final policy are always kept.
pub struct TrajectoryRecorder {
    every: usize,
    points: Vec<TrajectoryPoint>,
    last: Option<TrajectoryPoint>,
}

impl TrajectoryRecorder {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            points: Vec::new(),
            last: None,
        }
    }

    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<TrajectoryPoint> {
        self.points
    }
}

impl Observer for TrajectoryRecorder {
    fn on_run_start(&mut self, _max_steps: usize, initial_policy: &Array3<f64>) -> Result<()> {
        self.points.clear();
        self.last = None;
        self.points.push(TrajectoryPoint {
            step: 0,
            policy: initial_policy.clone(),
            change: None,
        });
        Ok(())
    }

    fn on_step(&mut self, record: &StepRecord<'_>) -> Result<()> {
        let point = TrajectoryPoint {
            step: record.step,
            policy: record.policy.clone(),
            change: Some(record.change),
        };
        if record.step % self.every == 0 {
            self.points.push(point);
            self.last = None;
        } else {
            self.last = Some(point);
        }
        Ok(())
    }

    fn on_run_end(&mut self, _steps: usize, _converged: bool) -> Result<()> {
        if let Some(point) = self.last.take() {
            self.points.push(point);
        }
        Ok(())
    }
}

/// CSV trajectory observer - Writes policies in long format
///
/// Columns: `step, agent, observation, action, probability, td_error`. The
/// initial policy is written as step 0 with an empty `td_error`.
pub struct CsvTrajectoryObserver {
    writer: csv::Writer<File>,
    every: usize,
}

impl CsvTrajectoryObserver {
    /// Create a CSV observer writing every `every`-th step to `path`
    pub fn new<P: AsRef<Path>>(path: P, every: usize) -> Result<Self> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([
            "step",
            "agent",
            "observation",
            "action",
            "probability",
            "td_error",
        ])?;
        Ok(Self {
            writer,
            every: every.max(1),
        })
    }

    fn write_policy(
        &mut self,
        step: usize,
        policy: &Array3<f64>,
        td_error: Option<&Array3<f64>>,
    ) -> Result<()> {
        for ((agent, observation, action), probability) in policy.indexed_iter() {
            let td = td_error
                .map(|td| td[[agent, observation, action]].to_string())
                .unwrap_or_default();
            self.writer.write_record([
                step.to_string(),
                agent.to_string(),
                observation.to_string(),
                action.to_string(),
                probability.to_string(),
                td,
            ])?;
        }
        Ok(())
    }
}

impl Observer for CsvTrajectoryObserver {
    fn on_run_start(&mut self, _max_steps: usize, initial_policy: &Array3<f64>) -> Result<()> {
        self.write_policy(0, initial_policy, None)
    }

    fn on_step(&mut self, record: &StepRecord<'_>) -> Result<()> {
        if record.step % self.every == 0 {
            self.write_policy(record.step, record.policy, Some(record.td_error))?;
        }
        Ok(())
    }

    fn on_run_end(&mut self, _steps: usize, _converged: bool) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record<'a>(step: usize, policy: &'a Array3<f64>, td: &'a Array3<f64>) -> StepRecord<'a> {
        StepRecord {
            step,
            policy,
            td_error: td,
            change: 0.1,
        }
    }

    #[test]
    fn recorder_keeps_initial_sampled_and_final_points() {
        let policy = Array3::from_elem((1, 1, 2), 0.5);
        let td = Array3::zeros((1, 1, 2));
        let mut recorder = TrajectoryRecorder::new(2);

        recorder.on_run_start(10, &policy).unwrap();
        for step in 1..=5 {
            recorder.on_step(&record(step, &policy, &td)).unwrap();
        }
        recorder.on_run_end(5, true).unwrap();

        let steps: Vec<usize> = recorder.points().iter().map(|p| p.step).collect();
        assert_eq!(steps, vec![0, 2, 4, 5]);
        assert_eq!(recorder.points()[0].change, None);
    }

    #[test]
    fn csv_observer_writes_long_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trajectory.csv");
        let policy = Array3::from_elem((1, 2, 2), 0.5);
        let td = Array3::zeros((1, 2, 2));

        let mut observer = CsvTrajectoryObserver::new(&path, 1).unwrap();
        observer.on_run_start(1, &policy).unwrap();
        observer.on_step(&record(1, &policy, &td)).unwrap();
        observer.on_run_end(1, true).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "step,agent,observation,action,probability,td_error");
        assert_eq!(lines.len(), 1 + 4 + 4);
        assert_eq!(lines[1], "0,0,0,0,0.5,");
        assert_eq!(lines[5], "1,0,0,0,0.5,0");
    }
}
