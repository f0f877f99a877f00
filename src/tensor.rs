//! Dense tensor algebra for the averaged dynamics
//!
//! The averaged models are all products of a handful of dense tensors summed
//! over shared indices. This module provides the two primitives they are
//! built from:
//!
//! - [`contraction`]: a labelled-index contraction (Einstein summation) over
//!   any number of operands, with greedy pairwise path selection
//! - [`omega`]: the precomputed indicator tensor that marginalizes the
//!   actions of all agents other than a focal one

pub mod contraction;
pub mod omega;

pub use contraction::{Label, LabelAllocator, Operand, contract};
pub use omega::Omega;
