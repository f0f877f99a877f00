//! Solve command - Averaged models and values for one joint policy

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use ndarray::{Array1, Array2, Array3};
use serde::Serialize;
use tracing::info;

use super::ModelArgs;
use crate::{
    cli::output::{print_agent_matrices, print_agent_rows, print_kv, print_section, print_subsection, print_vector},
    dynamics::Precomputed,
    learning::StrategyLearner,
};

#[derive(Parser, Debug)]
#[command(about = "Evaluate the averaged dynamics of a joint policy")]
pub struct SolveArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Write all computed quantities to a JSON file
    #[arg(long)]
    pub export: Option<PathBuf>,
}

/// Everything `solve` computes
#[derive(Debug, Serialize)]
pub struct SolveReport {
    pub learner_id: String,
    pub policy: Array3<f64>,
    pub state_distribution: Array1<f64>,
    pub observation_distribution: Array2<f64>,
    pub tioo: Array3<f64>,
    pub rio: Array2<f64>,
    pub vio: Array2<f64>,
    pub qioa: Array3<f64>,
    pub td_error: Array3<f64>,
    pub average_reward: Array1<f64>,
}

pub fn execute(args: SolveArgs) -> Result<()> {
    let config = args.model.run_config()?;
    let env = config.environment.build()?;
    let mut learner = StrategyLearner::new(&*env, config.dynamics.clone(), config.learner.clone())?;
    let x = args.model.initial_policy(&learner, config.seed)?;
    info!(learner = %learner.id(), "solving averaged dynamics");

    let engine = learner.dynamics_mut();
    let state_distribution = engine.state_distribution(&x)?;
    let xisa = engine.xisa(&x)?;
    let bios = engine.bios_from(state_distribution.view())?;
    let pre = Precomputed::none().with_xisa(&xisa).with_bios(&bios);

    let tioo = engine.tioo(&x, pre)?;
    let rioa = engine.rioa(&x, pre)?;
    let rio = engine.rio(&x, pre.with_rioa(&rioa))?;
    let vio = engine.vio(&x, pre.with_rio(&rio).with_tioo(&tioo))?;
    let qioa = engine.qioa(&x, pre.with_rioa(&rioa).with_vio(&vio))?;
    let td_error = &qioa - &vio.view().insert_axis(ndarray::Axis(2));
    let observation_distribution = engine.observation_distribution(&x, pre.with_tioo(&tioo))?;
    let average_reward = engine.average_reward(&x, pre.with_tioo(&tioo).with_rio(&rio))?;

    let dims = engine.dimensions();
    let observations = env.observations();
    let actions = env.actions();

    print_section("Averaged dynamics");
    print_kv("Learner", &learner.id());
    print_kv("Dimensions", &dims.to_string());
    print_kv("Solve mode", &config.dynamics.solve_mode.to_string());

    print_subsection("Stationary state distribution");
    print_vector(&env.states(), &state_distribution);

    print_subsection("Observation distribution");
    print_agent_rows(&observations, &observation_distribution);

    print_subsection("Observation values Vio");
    print_agent_rows(&observations, &vio);

    print_subsection("Action values Qioa");
    print_agent_matrices(&observations, &actions, &qioa);

    print_subsection("Prediction error");
    print_agent_matrices(&observations, &actions, &td_error);

    print_subsection("Average reward");
    let agent_labels: Vec<String> = (0..dims.agents).map(|i| format!("agent {i}")).collect();
    print_vector(&agent_labels, &average_reward);

    if let Some(path) = args.export {
        let report = SolveReport {
            learner_id: learner.id(),
            policy: x,
            state_distribution,
            observation_distribution,
            tioo,
            rio,
            vio,
            qioa,
            td_error,
            average_reward,
        };
        let file = std::fs::File::create(&path)?;
        serde_json::to_writer_pretty(file, &report)?;
        println!("\nReport written to {}", path.display());
    }

    Ok(())
}
