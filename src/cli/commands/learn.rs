//! Learn command - Run the strategy-averaged learning dynamics

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use ndarray::Axis;

use super::ModelArgs;
use crate::{
    cli::output::{print_agent_matrices, print_kv, print_section},
    learning::StrategyLearner,
    pipeline::{CsvTrajectoryObserver, LearningPipeline, ProgressObserver},
    types::AgentParameter,
    utils::shannon_entropy,
};

#[derive(Parser, Debug)]
#[command(about = "Iterate the learning dynamics from an initial policy")]
pub struct LearnArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Learning rate shared by all agents
    #[arg(long, short = 'a')]
    pub learning_rate: Option<f64>,

    /// Intensity of choice shared by all agents
    #[arg(long, short = 'b')]
    pub choice_intensity: Option<f64>,

    /// Center the prediction error over actions
    #[arg(long)]
    pub centered: bool,

    /// Maximum number of steps
    #[arg(long, short = 'n')]
    pub max_steps: Option<usize>,

    /// Convergence tolerance on the largest policy change
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Run the dynamics backwards in time
    #[arg(long)]
    pub reverse: bool,

    /// Write the trajectory to a CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Write every n-th step to the CSV file
    #[arg(long, default_value_t = 1)]
    pub csv_every: usize,

    /// Save the learning result as JSON
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

pub fn execute(args: LearnArgs) -> Result<()> {
    let mut config = args.model.run_config()?;
    if let Some(rate) = args.learning_rate {
        config.learner.learning_rates = AgentParameter::Shared(rate);
    }
    if let Some(intensity) = args.choice_intensity {
        config.learner.choice_intensities = AgentParameter::Shared(intensity);
    }
    config.learner.centered |= args.centered;
    if let Some(max_steps) = args.max_steps {
        config.learning.max_steps = max_steps;
    }
    if let Some(tolerance) = args.tolerance {
        config.learning.tolerance = tolerance;
    }
    config.learning.reverse |= args.reverse;

    let env = config.environment.build()?;
    let mut learner = StrategyLearner::new(&*env, config.dynamics.clone(), config.learner.clone())?;
    let initial = args.model.initial_policy(&learner, config.seed)?;

    let mut pipeline = LearningPipeline::new(config.learning.clone());
    if !args.no_progress {
        pipeline = pipeline.with_observer(Box::new(ProgressObserver::new()));
    }
    if let Some(path) = &args.csv {
        pipeline = pipeline.with_observer(Box::new(CsvTrajectoryObserver::new(path, args.csv_every)?));
    }

    let result = pipeline.run(&mut learner, initial)?;

    print_section("Learning run");
    print_kv("Learner", &result.learner_id);
    print_kv("Steps", &result.steps.to_string());
    print_kv("Converged", &result.converged.to_string());
    if let Some(change) = result.final_change {
        print_kv("Final change", &format!("{change:.3e}"));
    }
    let entropies: Vec<f64> = result
        .final_policy
        .lanes(Axis(2))
        .into_iter()
        .map(|lane| shannon_entropy(lane.iter().copied()))
        .collect();
    let mean_entropy = entropies.iter().sum::<f64>() / entropies.len().max(1) as f64;
    print_kv("Mean entropy", &format!("{mean_entropy:.4}"));

    println!("\nFinal policy:");
    print_agent_matrices(&env.observations(), &env.actions(), &result.final_policy);

    if let Some(path) = &args.csv {
        println!("\nTrajectory written to {}", path.display());
    }
    if let Some(path) = &args.output {
        result.save(path)?;
        println!("Result saved to {}", path.display());
    }

    Ok(())
}
