//! End-to-end learning runs through the pipeline and its observers

mod common;

use std::sync::{Arc, Mutex};

use crld::{
    AveragedDynamics, DynamicsConfig, Error, LearnerConfig, Precomputed, StrategyLearner,
    environments::{RenewableResources, RiskReward, TabularEnvironment},
    pipeline::{
        CsvTrajectoryObserver, LearningConfig, LearningPipeline, LearningResult,
        TrajectoryRecorder,
    },
    ports::{Observer, StepRecord},
};
use ndarray::{Array3, Axis};
use rand::{SeedableRng, rngs::StdRng};

use common::{random_environment, stay_flip};

/// Shares a recorder with the test after the pipeline takes ownership.
struct Shared(Arc<Mutex<TrajectoryRecorder>>);

impl Observer for Shared {
    fn on_run_start(&mut self, max_steps: usize, initial: &Array3<f64>) -> crld::Result<()> {
        self.0.lock().unwrap().on_run_start(max_steps, initial)
    }

    fn on_step(&mut self, record: &StepRecord<'_>) -> crld::Result<()> {
        self.0.lock().unwrap().on_step(record)
    }

    fn on_run_end(&mut self, steps: usize, converged: bool) -> crld::Result<()> {
        self.0.lock().unwrap().on_run_end(steps, converged)
    }
}

fn risk_reward_learner(learning_rate: f64) -> StrategyLearner {
    StrategyLearner::new(
        &RiskReward::default(),
        DynamicsConfig::new(0.9),
        LearnerConfig::new(learning_rate),
    )
    .unwrap()
}

fn assert_stochastic(policy: &Array3<f64>) {
    for total in policy.sum_axis(Axis(2)).iter() {
        assert!((total - 1.0).abs() < 1e-10, "{policy:?}");
    }
}

#[test]
fn test_patient_agent_learns_to_be_cautious() {
    let mut learner = risk_reward_learner(0.5);
    let initial = learner.zero_intelligence_strategy();
    let recorder = Arc::new(Mutex::new(TrajectoryRecorder::new(100)));

    let config = LearningConfig {
        max_steps: 3000,
        tolerance: 1e-9,
        reverse: false,
    };
    let mut pipeline =
        LearningPipeline::new(config).with_observer(Box::new(Shared(Arc::clone(&recorder))));
    let result = pipeline.run(&mut learner, initial.clone()).unwrap();

    assert!(result.steps > 0);
    assert_stochastic(&result.final_policy);
    // cautious in both the prosperous and the degraded state
    assert!(result.final_policy[[0, 0, 0]] > 0.9);
    assert!(result.final_policy[[0, 1, 0]] > 0.9);
    assert_eq!(result.initial_policy, initial);
    assert_eq!(result.learner_id, learner.id());

    let recorder = recorder.lock().unwrap();
    let points = recorder.points();
    assert_eq!(points[0].step, 0);
    assert_eq!(points[0].policy, initial);
    let last = points.last().unwrap();
    assert_eq!(last.step, result.steps);
    assert_eq!(last.policy, result.final_policy);
    assert!(points.windows(2).all(|pair| pair[0].step < pair[1].step));
}

#[test]
fn test_reverse_run_moves_toward_risk() {
    let mut learner = risk_reward_learner(0.5);
    let initial = learner.zero_intelligence_strategy();
    let config = LearningConfig {
        max_steps: 5,
        tolerance: 0.0,
        reverse: true,
    };
    let result = LearningPipeline::new(config)
        .run(&mut learner, initial)
        .unwrap();

    assert_eq!(result.steps, 5);
    assert!(!result.converged);
    assert!(result.final_policy[[0, 0, 1]] > 0.5);
    assert!(result.final_policy[[0, 1, 1]] > 0.5);
    assert_stochastic(&result.final_policy);
}

#[test]
fn test_csv_trajectory_has_one_row_per_policy_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trajectory.csv");

    let mut learner = risk_reward_learner(0.1);
    let initial = learner.zero_intelligence_strategy();
    let config = LearningConfig {
        max_steps: 3,
        tolerance: 0.0,
        reverse: false,
    };
    let observer = CsvTrajectoryObserver::new(&path, 1).unwrap();
    LearningPipeline::new(config)
        .with_observer(Box::new(observer))
        .run(&mut learner, initial)
        .unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["step", "agent", "observation", "action", "probability", "td_error"]
    );

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    // initial policy plus three updates, four entries each
    assert_eq!(rows.len(), 4 * 4);

    let mut totals = [[0.0_f64; 2]; 4];
    for row in &rows {
        let step: usize = row[0].parse().unwrap();
        let observation: usize = row[2].parse().unwrap();
        let probability: f64 = row[4].parse().unwrap();
        totals[step][observation] += probability;
        assert_eq!(row[5].is_empty(), step == 0);
    }
    for total in totals.iter().flatten() {
        assert!((total - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_result_survives_json_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result.json");

    let mut learner = risk_reward_learner(0.1);
    let initial = learner.zero_intelligence_strategy();
    let config = LearningConfig {
        max_steps: 10,
        ..LearningConfig::default()
    };
    let result = LearningPipeline::new(config)
        .run(&mut learner, initial)
        .unwrap();
    result.save(&path).unwrap();

    let loaded = LearningResult::load(&path).unwrap();
    assert_eq!(loaded.learner_id, result.learner_id);
    assert_eq!(loaded.steps, result.steps);
    assert_eq!(loaded.converged, result.converged);
    for (a, b) in loaded.final_policy.iter().zip(result.final_policy.iter()) {
        assert!((a - b).abs() < 1e-15);
    }
    assert!(loaded.final_td_error.is_some());
}

#[test]
fn test_pipeline_rejects_mismatched_policy() {
    let mut learner = risk_reward_learner(0.1);
    let err = LearningPipeline::new(LearningConfig::default())
        .run(&mut learner, Array3::from_elem((1, 3, 2), 0.5))
        .unwrap_err();
    assert!(matches!(err, Error::PolicyShape { .. }));
}

#[test]
fn test_coarse_renewable_resources_learning_stays_stochastic() {
    let env = RenewableResources::new(0.8, 4.0)
        .unwrap()
        .with_agents(2)
        .unwrap()
        .with_observation_groups(vec![vec![0, 1], vec![2, 3]])
        .unwrap();
    let mut learner =
        StrategyLearner::new(&env, DynamicsConfig::new(0.8), LearnerConfig::new(0.2)).unwrap();
    assert!(learner.id().contains("PartObs_"));
    assert_eq!(learner.dimensions().policy_shape(), [2, 2, 3]);

    let initial = learner.zero_intelligence_strategy();
    let tioo = learner
        .dynamics_mut()
        .tioo(&initial, Precomputed::none())
        .unwrap();
    assert_stochastic(&tioo);

    let config = LearningConfig {
        max_steps: 20,
        tolerance: 0.0,
        reverse: false,
    };
    let result = LearningPipeline::new(config)
        .run(&mut learner, initial)
        .unwrap();
    assert_eq!(result.steps, 20);
    assert_stochastic(&result.final_policy);
}

#[test]
fn test_fast_beliefs_track_exact_beliefs_over_a_run() {
    let mut rng = StdRng::seed_from_u64(31);
    let env = random_environment(1, 2, 3, 2, &mut rng);
    let learner = |fast: bool| {
        StrategyLearner::new(
            &env,
            DynamicsConfig::new(0.9).with_fast_beliefs(fast),
            LearnerConfig::new(0.5),
        )
        .unwrap()
    };
    let mut exact = learner(false);
    let mut fast = learner(true);

    let mut x_exact = exact.zero_intelligence_strategy();
    let mut x_fast = x_exact.clone();
    for _ in 0..50 {
        x_exact = exact.step(&x_exact).unwrap().policy;
        x_fast = fast.step(&x_fast).unwrap().policy;
    }
    for (a, b) in x_exact.iter().zip(x_fast.iter()) {
        assert!((a - b).abs() < 1e-10, "{x_exact:?} != {x_fast:?}");
    }

    let cached = fast.dynamics().continuity_cache().state_distribution();
    let reference = exact.dynamics().continuity_cache().state_distribution();
    for (a, b) in cached.iter().zip(reference.iter()) {
        assert!((a - b).abs() < 1e-10, "{cached} != {reference}");
    }
    assert!(cached.iter().any(|p| (p - 1.0 / 3.0).abs() > 1e-6));

    let b_exact = exact.dynamics_mut().bios(&x_exact).unwrap();
    let b_fast = fast.dynamics_mut().fast_bios(&x_fast).unwrap();
    for (a, b) in b_exact.iter().zip(b_fast.iter()) {
        assert!((a - b).abs() < 1e-10);
    }
}

#[test]
fn test_tabular_environment_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stay_flip.json");
    let env = stay_flip();
    env.save(&path).unwrap();
    let loaded = TabularEnvironment::load(&path).unwrap();

    let x = Array3::from_shape_vec((1, 2, 2), vec![0.7, 0.3, 0.2, 0.8]).unwrap();
    let mut original = AveragedDynamics::new(&env, DynamicsConfig::new(0.9)).unwrap();
    let mut reloaded = AveragedDynamics::new(&loaded, DynamicsConfig::new(0.9)).unwrap();
    let a = original.vio(&x, Precomputed::none()).unwrap();
    let b = reloaded.vio(&x, Precomputed::none()).unwrap();
    for (a, b) in a.iter().zip(b.iter()) {
        assert!((a - b).abs() < 1e-12);
    }
}
