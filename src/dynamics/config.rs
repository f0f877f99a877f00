//! Configuration of the averaged-dynamics engine.

use serde::{Deserialize, Serialize};

use crate::{
    stationary::{DEFAULT_TOLERANCE, SolveMode},
    types::AgentParameter,
};

/// Construction-time settings of an [`AveragedDynamics`](super::AveragedDynamics) engine.
///
/// # Examples
///
/// ```
/// use crld::dynamics::DynamicsConfig;
/// use crld::stationary::SolveMode;
///
/// let config = DynamicsConfig::new(0.9)
///     .with_prefactor(true)
///     .with_solve_mode(SolveMode::Vectorized);
/// assert!(config.use_prefactor);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicsConfig {
    /// Discount factor per agent, each in `[0, 1)`
    pub discount_factors: AgentParameter,
    /// Scale values by `1 - γ` so they live on the scale of rewards
    pub use_prefactor: bool,
    /// Greedy contraction-path selection (performance only)
    pub opteinsum: bool,
    /// Stationary-distribution solver mode
    pub solve_mode: SolveMode,
    /// Edge tolerance of the stationary-distribution solver
    pub tolerance: f64,
    /// Compute beliefs through the diagnostics-free state-distribution solve
    #[serde(default)]
    pub fast_beliefs: bool,
}

impl DynamicsConfig {
    /// Defaults for everything but the discount factors:
    /// - no prefactor
    /// - optimized contractions
    /// - reference solver mode
    /// - beliefs from a fresh stationary solve
    pub fn new(discount_factors: impl Into<AgentParameter>) -> Self {
        Self {
            discount_factors: discount_factors.into(),
            use_prefactor: false,
            opteinsum: true,
            solve_mode: SolveMode::default(),
            tolerance: DEFAULT_TOLERANCE,
            fast_beliefs: false,
        }
    }

    pub fn with_prefactor(mut self, use_prefactor: bool) -> Self {
        self.use_prefactor = use_prefactor;
        self
    }

    pub fn with_opteinsum(mut self, opteinsum: bool) -> Self {
        self.opteinsum = opteinsum;
        self
    }

    pub fn with_solve_mode(mut self, mode: SolveMode) -> Self {
        self.solve_mode = mode;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Compute beliefs through the diagnostics-free state-distribution solve.
    ///
    /// The cached distribution only breaks ties, so near-deterministic
    /// policies with several stationary distributions may land on a
    /// different one than a fresh run would.
    pub fn with_fast_beliefs(mut self, fast_beliefs: bool) -> Self {
        self.fast_beliefs = fast_beliefs;
        self
    }
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self::new(0.9)
    }
}
