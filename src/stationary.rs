//! Stationary distributions of finite Markov chains.
//!
//! The stationary distributions of a row-stochastic matrix `T` are the
//! probability vectors `p` with `p = p·T`, i.e. the normalized eigenvectors of
//! `Tᵀ` for eigenvalue 1. Their extreme points correspond one to one to the
//! closed communicating classes of the chain: each closed class carries a
//! unique stationary distribution supported on it. The solver enumerates
//! those candidates and then
//!
//! - returns the single candidate of an ergodic (unichain) chain,
//! - picks the candidate closest to a prior distribution when the chain is
//!   reducible, so that successive solves along a slowly changing policy stay
//!   on the same branch, and
//! - fails when no candidate exists, which only happens for matrices that are
//!   not stochastic.
//!
//! The prior-based choice makes results depend on call history. It is a
//! heuristic for continuity, not a guarantee.

use std::{fmt, str::FromStr};

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Transition probabilities at or below this value count as absent edges.
///
/// Zero keeps every positive edge, however small. A positive value cuts
/// weak edges and with them the stationary mass they carry.
pub const DEFAULT_TOLERANCE: f64 = 0.0;

/// Rows of a closed class must sum to one within this tolerance.
const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Largest admissible violation of `p = p·T` for an accepted candidate.
const RESIDUAL_TOLERANCE: f64 = 1e-8;

/// How the candidate count is turned into a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolveMode {
    /// Branch on the number of candidates and log diagnostics.
    #[default]
    Reference,
    /// Solve all agents as one batch; the branch is a data-dependent select.
    Vectorized,
}

impl fmt::Display for SolveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SolveMode::Reference => "reference",
            SolveMode::Vectorized => "vectorized",
        };
        f.write_str(label)
    }
}

impl FromStr for SolveMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reference" | "ref" => Ok(SolveMode::Reference),
            "vectorized" | "vectorised" | "batch" => Ok(SolveMode::Vectorized),
            _ => Err(Error::ParseSolveMode {
                input: s.to_string(),
                expected: "reference, vectorized".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StationarySolver {
    mode: SolveMode,
    tolerance: f64,
}

impl Default for StationarySolver {
    fn default() -> Self {
        Self::new(SolveMode::default(), DEFAULT_TOLERANCE)
    }
}

impl StationarySolver {
    pub fn new(mode: SolveMode, tolerance: f64) -> Self {
        Self { mode, tolerance }
    }

    pub fn mode(&self) -> SolveMode {
        self.mode
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// All extremal stationary distributions, one per column.
    ///
    /// Closed classes whose rows do not sum to one (e.g. an all-zero row) are
    /// skipped, as are solutions that fail the fixed-point check.
    pub fn candidates(&self, transitions: ArrayView2<'_, f64>) -> Array2<f64> {
        let n = transitions.nrows();
        let columns: Vec<Array1<f64>> = closed_classes(transitions, self.tolerance)
            .into_iter()
            .filter(|class| {
                class.iter().all(|&state| {
                    (transitions.row(state).sum() - 1.0).abs() <= ROW_SUM_TOLERANCE
                })
            })
            .filter_map(|class| class_distribution(transitions, &class))
            .filter(|p| fixed_point_residual(transitions, p.view()) <= RESIDUAL_TOLERANCE)
            .collect();

        let mut candidates = Array2::zeros((n, columns.len()));
        for (column, p) in columns.iter().enumerate() {
            candidates.column_mut(column).assign(p);
        }
        candidates
    }

    /// Stationary distribution of one chain, disambiguated against `prior`.
    pub fn solve(
        &self,
        transitions: ArrayView2<'_, f64>,
        prior: ArrayView1<'_, f64>,
        context: &str,
    ) -> Result<Array1<f64>> {
        match self.mode {
            SolveMode::Reference => {
                reference_choice(&self.candidates(transitions), prior, context)
            }
            SolveMode::Vectorized => self.select(transitions, prior, context),
        }
    }

    /// As [`solve`](Self::solve) in vectorized mode, whatever the configured mode.
    ///
    /// Emits no diagnostics.
    pub fn select(
        &self,
        transitions: ArrayView2<'_, f64>,
        prior: ArrayView1<'_, f64>,
        context: &str,
    ) -> Result<Array1<f64>> {
        let candidates = self.candidates(transitions);
        let index = select_index(&candidates, prior, context)?;
        Ok(candidates.column(index).to_owned())
    }

    /// Stationary distributions of a stack of chains `transitions[k]`, each
    /// disambiguated against `priors[k]`.
    pub fn solve_batch(
        &self,
        transitions: ArrayView3<'_, f64>,
        priors: ArrayView2<'_, f64>,
        context: &str,
    ) -> Result<Array2<f64>> {
        let (batch, n) = (transitions.len_of(Axis(0)), transitions.len_of(Axis(1)));
        let mut solutions = Array2::zeros((batch, n));
        match self.mode {
            SolveMode::Reference => {
                for k in 0..batch {
                    let label = format!("{context}[{k}]");
                    let p = reference_choice(
                        &self.candidates(transitions.index_axis(Axis(0), k)),
                        priors.row(k),
                        &label,
                    )?;
                    solutions.row_mut(k).assign(&p);
                }
            }
            SolveMode::Vectorized => {
                let all: Vec<Array2<f64>> = transitions
                    .outer_iter()
                    .map(|chain| self.candidates(chain))
                    .collect();
                for (k, candidates) in all.iter().enumerate() {
                    let index = select_index(candidates, priors.row(k), context)?;
                    solutions.row_mut(k).assign(&candidates.column(index));
                }
            }
        }
        Ok(solutions)
    }
}

fn reference_choice(
    candidates: &Array2<f64>,
    prior: ArrayView1<'_, f64>,
    context: &str,
) -> Result<Array1<f64>> {
    match candidates.ncols() {
        0 => Err(Error::NoStationaryDistribution {
            context: context.to_string(),
            size: candidates.nrows(),
        }),
        1 => {
            debug!(context, "unique stationary distribution");
            Ok(candidates.column(0).to_owned())
        }
        count => {
            let index = closest_column(candidates, prior);
            warn!(
                context,
                candidates = count,
                chosen = index,
                "more than one stationary distribution, taking the one closest to the previous solution"
            );
            debug!(context, ?candidates, ?prior, "stationary candidates");
            Ok(candidates.column(index).to_owned())
        }
    }
}

/// Branch-free choice between the unique and the closest candidate.
fn select_index(candidates: &Array2<f64>, prior: ArrayView1<'_, f64>, context: &str) -> Result<usize> {
    let count = candidates.ncols();
    if count == 0 {
        return Err(Error::NoStationaryDistribution {
            context: context.to_string(),
            size: candidates.nrows(),
        });
    }
    let single = count - 1;
    let multi = closest_column(candidates, prior);
    let unique = usize::from(count == 1);
    Ok(unique * single + (1 - unique) * multi)
}

/// Index of the column with the smallest Euclidean distance to `prior`; ties go to the first.
fn closest_column(candidates: &Array2<f64>, prior: ArrayView1<'_, f64>) -> usize {
    candidates
        .columns()
        .into_iter()
        .map(|column| {
            column
                .iter()
                .zip(prior.iter())
                .map(|(c, p)| (c - p).powi(2))
                .sum::<f64>()
        })
        .enumerate()
        .fold((0, f64::INFINITY), |best, (index, distance)| {
            if distance < best.1 {
                (index, distance)
            } else {
                best
            }
        })
        .0
}

/// Closed communicating classes, ordered by their smallest state.
fn closed_classes(transitions: ArrayView2<'_, f64>, tolerance: f64) -> Vec<Vec<usize>> {
    let n = transitions.nrows();
    let reach: Vec<Vec<bool>> = (0..n)
        .map(|start| {
            let mut seen = vec![false; n];
            seen[start] = true;
            let mut stack = vec![start];
            while let Some(state) = stack.pop() {
                for next in 0..n {
                    if !seen[next] && transitions[[state, next]] > tolerance {
                        seen[next] = true;
                        stack.push(next);
                    }
                }
            }
            seen
        })
        .collect();

    let mut assigned = vec![false; n];
    let mut classes = Vec::new();
    for state in 0..n {
        if assigned[state] {
            continue;
        }
        let class: Vec<usize> = (0..n)
            .filter(|&other| reach[state][other] && reach[other][state])
            .collect();
        for &member in &class {
            assigned[member] = true;
        }
        let closed = (0..n).all(|other| !reach[state][other] || class.contains(&other));
        if closed {
            classes.push(class);
        }
    }
    classes
}

/// Stationary distribution of the chain restricted to `class`, embedded in the full state space.
///
/// Grassmann-Taksar-Heyman state reduction. It never subtracts, so states
/// reached only through tiny transition probabilities keep a tiny positive
/// mass instead of rounding to zero.
fn class_distribution(transitions: ArrayView2<'_, f64>, class: &[usize]) -> Option<Array1<f64>> {
    let k = class.len();
    let mut reduced = DMatrix::from_fn(k, k, |row, col| transitions[[class[row], class[col]]]);

    for n in (1..k).rev() {
        let exit: f64 = (0..n).map(|j| reduced[(n, j)]).sum();
        if exit <= 0.0 || !exit.is_finite() {
            return None;
        }
        for i in 0..n {
            reduced[(i, n)] /= exit;
        }
        for i in 0..n {
            let via = reduced[(i, n)];
            if via == 0.0 {
                continue;
            }
            for j in 0..n {
                reduced[(i, j)] += via * reduced[(n, j)];
            }
        }
    }

    let mut weights = DVector::<f64>::zeros(k);
    weights[0] = 1.0;
    for j in 1..k {
        weights[j] = (0..j).map(|i| weights[i] * reduced[(i, j)]).sum();
    }
    let total = weights.sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }

    let mut p = Array1::zeros(transitions.nrows());
    for (&state, &weight) in class.iter().zip(weights.iter()) {
        p[state] = weight / total;
    }
    Some(p)
}

/// `max_j |(p·T)_j - p_j|`.
pub fn fixed_point_residual(transitions: ArrayView2<'_, f64>, p: ArrayView1<'_, f64>) -> f64 {
    let next = p.dot(&transitions);
    next.iter()
        .zip(p.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max)
}
