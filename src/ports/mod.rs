//! Ports (trait boundaries) between the learning loop and its collaborators.
//!
//! The pipeline drives any [`Learner`] and reports to any number of
//! [`Observer`]s; concrete learners and observers are adapters.

pub mod learner;
pub mod observer;

pub use learner::{Learner, LearningStep};
pub use observer::{Observer, StepRecord};
