//! Strategy-averaged reinforcement-learning dynamics.
//!
//! [`AveragedDynamics`] turns a joint policy `X[i, o, a]` into the averaged
//! models an independent learner would estimate in the limit of infinite
//! experience:
//!
//! | quantity | meaning |
//! |----------|---------|
//! | `Xisa[i, s, a]` | state-action policy through the observation model |
//! | `Bios[i, o, s]` | belief over states given an observation |
//! | `Tioo[i, o, o']` | observation-to-observation transitions |
//! | `Tioao[i, o, a, o']` | the same, conditioned on the focal action |
//! | `Rio[i, o]`, `Rioa[i, o, a]` | expected rewards |
//! | `Vio[i, o]`, `Qioa[i, o, a]` | discounted values |
//!
//! Every operation takes a [`Precomputed`] set of intermediates and computes
//! only what is missing, so a caller evaluating several quantities for the
//! same policy can share the expensive ones.
//!
//! ```
//! use crld::dynamics::{AveragedDynamics, DynamicsConfig, Precomputed};
//! use crld::environments::RiskReward;
//! use ndarray::Array3;
//!
//! let mut engine = AveragedDynamics::new(&RiskReward::default(), DynamicsConfig::new(0.9))?;
//! let x = Array3::from_elem((1, 2, 2), 0.5);
//! let rioa = engine.rioa(&x, Precomputed::none())?;
//! let qioa = engine.qioa(&x, Precomputed::none().with_rioa(&rioa))?;
//! assert_eq!(qioa.shape(), &[1, 2, 2]);
//! # Ok::<(), crld::Error>(())
//! ```

mod averaged;
mod beliefs;
mod config;
mod engine;
mod precomputed;
mod values;

pub use config::DynamicsConfig;
pub use engine::{AveragedDynamics, ContinuityCache};
pub use precomputed::Precomputed;
