//! Learning pipeline abstractions
//!
//! This module provides:
//! - A pipeline iterating a learner until its policy settles
//! - Observers recording or reporting the run

pub mod observers;
pub mod training;

pub use observers::{CsvTrajectoryObserver, ProgressObserver, TrajectoryPoint, TrajectoryRecorder};
pub use training::{LearningConfig, LearningPipeline, LearningResult};

pub use crate::ports::{Learner, Observer};
