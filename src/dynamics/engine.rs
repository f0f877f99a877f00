//! Engine construction, index bookkeeping, and the continuity cache.

use ndarray::{Array, Array1, Array2, Array3, ArrayD, ArrayViewD, Axis, Dimension, IxDyn};
use tracing::debug;

use super::config::DynamicsConfig;
use crate::{
    Error, Result,
    environments::Environment,
    stationary::StationarySolver,
    tensor::{Label, LabelAllocator, Omega, Operand, contract},
    types::Dimensions,
};

/// Rows of `T` and `O` must sum to one within this tolerance.
const STOCHASTIC_TOLERANCE: f64 = 1e-6;

/// Index labels shared by all contractions of one engine.
///
/// Built once from the agent count; the per-agent label lists are what lets
/// a single contraction routine serve any number of agents.
#[derive(Debug, Clone)]
pub(super) struct IndexLabels {
    pub(super) agent: Label,
    pub(super) action: Label,
    pub(super) state: Label,
    pub(super) next_state: Label,
    pub(super) obs: Label,
    pub(super) next_obs: Label,
    /// Joint action `b_1..b_N`
    pub(super) joint: Vec<Label>,
    /// Other-agent slots `j_1..j_{N-1}`
    pub(super) others: Vec<Label>,
    /// Other-agent actions `e_1..e_{N-1}`
    pub(super) other_actions: Vec<Label>,
}

impl IndexLabels {
    fn new(agents: usize) -> Self {
        let mut alloc = LabelAllocator::new();
        Self {
            agent: alloc.one(),
            action: alloc.one(),
            state: alloc.one(),
            next_state: alloc.one(),
            obs: alloc.one(),
            next_obs: alloc.one(),
            joint: alloc.many(agents),
            others: alloc.many(agents - 1),
            other_actions: alloc.many(agents - 1),
        }
    }
}

/// Concatenate label groups.
pub(super) fn labels(parts: &[&[Label]]) -> Vec<Label> {
    parts.iter().flat_map(|part| part.iter().copied()).collect()
}

/// Distributions remembered between solves.
///
/// Both start uniform and are overwritten after every successful
/// stationary-distribution solve. A degenerate solve picks the candidate
/// closest to the remembered distribution, so the order of calls matters.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuityCache {
    pub(super) state_distribution: Array1<f64>,
    pub(super) observation_distribution: Array2<f64>,
}

impl ContinuityCache {
    fn uniform(dims: &Dimensions) -> Self {
        Self {
            state_distribution: Array1::from_elem(dims.states, 1.0 / dims.states as f64),
            observation_distribution: Array2::from_elem(
                (dims.agents, dims.observations),
                1.0 / dims.observations as f64,
            ),
        }
    }

    /// Last stationary state distribution `p(s)`.
    pub fn state_distribution(&self) -> &Array1<f64> {
        &self.state_distribution
    }

    /// Last stationary observation distribution `p(i, o)`.
    pub fn observation_distribution(&self) -> &Array2<f64> {
        &self.observation_distribution
    }
}

/// Strategy-averaged dynamics of independent learners under partial observability.
///
/// Holds the environment tensors, the other-agents marginalizer, the index
/// labels of every contraction, and the continuity cache. The cache makes the
/// engine stateful: operations that solve a stationary distribution take
/// `&mut self`. Use one engine per independent trajectory.
#[derive(Debug, Clone)]
pub struct AveragedDynamics {
    pub(super) dims: Dimensions,
    pub(super) transitions: ArrayD<f64>,
    pub(super) rewards: ArrayD<f64>,
    pub(super) observations: Array3<f64>,
    pub(super) gamma: Array1<f64>,
    pub(super) prefactor: Array1<f64>,
    pub(super) optimize: bool,
    pub(super) fast_beliefs: bool,
    pub(super) omega: Omega,
    pub(super) labels: IndexLabels,
    pub(super) solver: StationarySolver,
    pub(super) cache: ContinuityCache,
}

impl AveragedDynamics {
    /// Build an engine from an environment's models.
    pub fn new(env: &dyn Environment, config: DynamicsConfig) -> Result<Self> {
        Self::from_tensors(
            env.transition_tensor(),
            env.reward_tensor(),
            env.observation_tensor(),
            config,
        )
    }

    /// Build an engine from raw tensors `T[s, a.., s']`, `R[i, s, a.., s']`, `O[i, s, o]`.
    ///
    /// # Errors
    ///
    /// Rejects inconsistent dimensions, non-stochastic `T` or `O`, and discount
    /// factors outside `[0, 1)`.
    pub fn from_tensors(
        transitions: ArrayD<f64>,
        rewards: ArrayD<f64>,
        observations: Array3<f64>,
        config: DynamicsConfig,
    ) -> Result<Self> {
        let dims = validate_dimensions(&transitions, &rewards, &observations)?;
        check_stochastic("transition tensor", transitions.view())?;
        check_stochastic("observation tensor", observations.view().into_dyn())?;

        let gamma = config
            .discount_factors
            .resolve("discount factors", dims.agents)?;
        if let Some((agent, &value)) = gamma
            .iter()
            .enumerate()
            .find(|(_, value)| !(0.0..1.0).contains(*value))
        {
            return Err(Error::InvalidDiscountFactor { agent, value });
        }
        let prefactor = if config.use_prefactor {
            gamma.mapv(|g| 1.0 - g)
        } else {
            Array1::ones(dims.agents)
        };

        debug!(%dims, opteinsum = config.opteinsum, mode = %config.solve_mode, "building averaged dynamics");

        Ok(Self {
            dims,
            transitions,
            rewards,
            observations,
            gamma,
            prefactor,
            optimize: config.opteinsum,
            fast_beliefs: config.fast_beliefs,
            omega: Omega::new(dims.agents, dims.actions),
            labels: IndexLabels::new(dims.agents),
            solver: StationarySolver::new(config.solve_mode, config.tolerance),
            cache: ContinuityCache::uniform(&dims),
        })
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn discount_factors(&self) -> &Array1<f64> {
        &self.gamma
    }

    /// `1 - γ` when the prefactor is enabled, ones otherwise.
    pub fn prefactor(&self) -> &Array1<f64> {
        &self.prefactor
    }

    pub fn omega(&self) -> &Omega {
        &self.omega
    }

    pub fn continuity_cache(&self) -> &ContinuityCache {
        &self.cache
    }

    pub fn transition_tensor(&self) -> &ArrayD<f64> {
        &self.transitions
    }

    pub fn reward_tensor(&self) -> &ArrayD<f64> {
        &self.rewards
    }

    pub fn observation_tensor(&self) -> &Array3<f64> {
        &self.observations
    }

    pub(super) fn check_policy(&self, x: &Array3<f64>) -> Result<()> {
        let expected = self.dims.policy_shape();
        if x.shape() != expected {
            return Err(Error::PolicyShape {
                expected: expected.to_vec(),
                got: x.shape().to_vec(),
            });
        }
        Ok(())
    }

    pub(super) fn contract_into<D: Dimension>(
        &self,
        operands: &[Operand<'_>],
        output: &[Label],
    ) -> Result<Array<f64, D>> {
        Ok(contract(operands, output, self.optimize)?.into_dimensionality::<D>()?)
    }

    /// `Xisa[k](s, b_k)` for every agent `k`.
    pub(super) fn own_policy_operands<'x>(&self, xisa: &'x Array3<f64>) -> Vec<Operand<'x>> {
        (0..self.dims.agents)
            .map(|k| {
                Operand::new(
                    xisa.index_axis(Axis(0), k),
                    &[self.labels.state, self.labels.joint[k]],
                )
            })
            .collect()
    }

    /// `Xisa(j_l, s, e_l)` for every other-agent slot `l`.
    pub(super) fn other_policy_operands<'x>(&self, xisa: &'x Array3<f64>) -> Vec<Operand<'x>> {
        self.labels
            .others
            .iter()
            .zip(&self.labels.other_actions)
            .map(|(&slot, &action)| Operand::new(xisa.view(), &[slot, self.labels.state, action]))
            .collect()
    }

    /// `Omega(i, j.., a, b.., e..)`.
    pub(super) fn omega_operand(&self) -> Operand<'_> {
        let l = &self.labels;
        Operand::new(
            self.omega.view(),
            &labels(&[&[l.agent], &l.others, &[l.action], &l.joint, &l.other_actions]),
        )
    }

    /// `T(s, b.., s')`.
    pub(super) fn transition_operand(&self) -> Operand<'_> {
        let l = &self.labels;
        Operand::new(
            self.transitions.view(),
            &labels(&[&[l.state], &l.joint, &[l.next_state]]),
        )
    }

    /// `R(i, s, b.., s')`.
    pub(super) fn reward_operand(&self) -> Operand<'_> {
        let l = &self.labels;
        Operand::new(
            self.rewards.view(),
            &labels(&[&[l.agent, l.state], &l.joint, &[l.next_state]]),
        )
    }

    /// `O(i, s', o')`.
    pub(super) fn next_observation_operand(&self) -> Operand<'_> {
        let l = &self.labels;
        Operand::new(self.observations.view(), &[l.agent, l.next_state, l.next_obs])
    }

    /// State-action policy `Xisa[i, s, a] = Σ_o O[i, s, o] · X[i, o, a]`.
    ///
    /// Row-stochastic in `a` whenever `O` and `X` are; this is not re-checked.
    pub fn xisa(&self, x: &Array3<f64>) -> Result<Array3<f64>> {
        self.check_policy(x)?;
        let l = &self.labels;
        self.contract_into(
            &[
                Operand::new(self.observations.view(), &[l.agent, l.state, l.obs]),
                Operand::new(x.view(), &[l.agent, l.obs, l.action]),
            ],
            &[l.agent, l.state, l.action],
        )
    }

    /// Policy-averaged state transitions `Tss[s, s'] = Σ_b Π_k Xisa[k, s, b_k] · T[s, b, s']`.
    pub fn tss(&self, x: &Array3<f64>) -> Result<Array2<f64>> {
        let xisa = self.xisa(x)?;
        self.tss_from(&xisa)
    }

    pub(super) fn tss_from(&self, xisa: &Array3<f64>) -> Result<Array2<f64>> {
        let mut operands = self.own_policy_operands(xisa);
        operands.push(self.transition_operand());
        self.contract_into(&operands, &[self.labels.state, self.labels.next_state])
    }

    /// Stationary state distribution of [`tss`](Self::tss).
    ///
    /// Updates the cached state distribution.
    pub fn state_distribution(&mut self, x: &Array3<f64>) -> Result<Array1<f64>> {
        let xisa = self.xisa(x)?;
        self.solve_state_distribution(&xisa)
    }

    pub(super) fn solve_state_distribution(&mut self, xisa: &Array3<f64>) -> Result<Array1<f64>> {
        let tss = self.tss_from(xisa)?;
        let p = self.solver.solve(
            tss.view(),
            self.cache.state_distribution.view(),
            "state distribution",
        )?;
        self.cache.state_distribution = p.clone();
        Ok(p)
    }
}

fn validate_dimensions(
    transitions: &ArrayD<f64>,
    rewards: &ArrayD<f64>,
    observations: &Array3<f64>,
) -> Result<Dimensions> {
    let mismatch = |what: &str, context: String| Error::DimensionMismatch {
        what: what.to_string(),
        context,
    };

    if rewards.ndim() < 4 {
        return Err(mismatch(
            "agents",
            format!("reward tensor has {} axes, expected at least 4", rewards.ndim()),
        ));
    }
    let agents = rewards.shape()[0];
    if agents == 0 {
        return Err(mismatch("agents", "reward tensor declares no agents".to_string()));
    }
    if rewards.ndim() != agents + 3 {
        return Err(mismatch(
            "agents",
            format!(
                "reward tensor declares {agents} agents but has {} action axes",
                rewards.ndim() - 3
            ),
        ));
    }
    if transitions.ndim() != agents + 2 {
        return Err(mismatch(
            "agents",
            format!(
                "transition tensor has {} action axes, reward tensor declares {agents} agents",
                transitions.ndim().saturating_sub(2)
            ),
        ));
    }
    if observations.shape()[0] != agents {
        return Err(mismatch(
            "agents",
            format!(
                "observation tensor covers {} agents, reward tensor declares {agents}",
                observations.shape()[0]
            ),
        ));
    }

    let t_shape = transitions.shape();
    let r_shape = rewards.shape();
    let actions = t_shape[1];
    if actions == 0
        || t_shape[1..=agents].iter().any(|&m| m != actions)
        || r_shape[2..2 + agents].iter().any(|&m| m != actions)
    {
        return Err(mismatch(
            "actions",
            format!("transition action axes {:?}, reward action axes {:?}", &t_shape[1..=agents], &r_shape[2..2 + agents]),
        ));
    }

    let states = t_shape[0];
    let state_axes = [
        ("transition next-state", t_shape[agents + 1]),
        ("reward state", r_shape[1]),
        ("reward next-state", r_shape[agents + 2]),
        ("observation state", observations.shape()[1]),
    ];
    if states == 0 {
        return Err(mismatch("states", "transition tensor has no states".to_string()));
    }
    if let Some((axis, len)) = state_axes.iter().find(|(_, len)| *len != states) {
        return Err(mismatch(
            "states",
            format!("{axis} axis has {len} entries, transition tensor has {states} states"),
        ));
    }

    let observation_count = observations.shape()[2];
    if observation_count == 0 {
        return Err(mismatch(
            "observations",
            "observation tensor has no observations".to_string(),
        ));
    }

    Ok(Dimensions {
        agents,
        actions,
        states,
        observations: observation_count,
    })
}

fn check_stochastic(tensor: &str, values: ArrayViewD<'_, f64>) -> Result<()> {
    let last = Axis(values.ndim() - 1);
    let sums = values.sum_axis(last);
    let not_stochastic = |row: &[usize], sum: f64| Error::NotStochastic {
        tensor: tensor.to_string(),
        row: format!("{row:?}"),
        sum,
    };
    // negative or NaN entries
    if let Some((index, _)) = values.indexed_iter().find(|(_, v)| !(**v >= 0.0)) {
        let row = &index.slice()[..last.index()];
        return Err(not_stochastic(row, sums[IxDyn(row)]));
    }
    for (index, &sum) in sums.indexed_iter() {
        if !((sum - 1.0).abs() <= STOCHASTIC_TOLERANCE) {
            return Err(not_stochastic(index.slice(), sum));
        }
    }
    Ok(())
}
