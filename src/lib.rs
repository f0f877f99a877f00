//! Strategy-averaged reinforcement-learning dynamics (CRLD)
//!
//! This crate provides:
//! - A labelled tensor contraction primitive for any number of agents
//! - The averaged-dynamics engine: beliefs, observation-level transition and
//!   reward models, values, and prediction errors of a joint policy under
//!   partial observability
//! - A stationary-distribution solver that stays continuous across
//!   degenerate chains
//! - Deterministic strategy learners and a learning pipeline with observers
//! - Example environments and a CLI

pub mod cli;
pub mod dynamics;
pub mod environments;
pub mod error;
pub mod learning;
pub mod pipeline;
pub mod ports;
pub mod stationary;
pub mod tensor;
pub mod types;
pub mod utils;

pub use dynamics::{AveragedDynamics, DynamicsConfig, Precomputed};
pub use environments::Environment;
pub use error::{Error, Result};
pub use learning::{LearnerConfig, StrategyLearner};
pub use types::{AgentParameter, Dimensions};
