//! # shot-locator
//!
//! Acoustic shot localization by multilateration.
//!
//! Given the time a wavefront reached each of N microphones at known positions,
//! estimate where and when the sound was emitted. The solver runs normalized
//! gradient descent on the mean squared residual between observed and predicted
//! arrival times.
//!
//! ```
//! use shot_locator::{find_shot_source, SolverConfig};
//! use shot_types::Point3;
//!
//! let mics = [
//!     Point3::new(10.0, 0.0, 0.0),
//!     Point3::new(-10.0, 0.0, 0.0),
//!     Point3::new(0.0, 10.0, 0.0),
//!     Point3::new(0.0, -10.0, 0.0),
//! ];
//! let times = [10.0 / 343.0; 4];
//! let cfg = SolverConfig::default()
//!     .with_tolerance(1e-3)
//!     .with_step_scales(0.01, 0.01)
//!     .with_max_iterations(1000);
//!
//! let solution = find_shot_source(&times, &mics, &cfg).unwrap();
//! assert!(solution.estimate.position.norm() < 1e-3);
//! assert!(solution.estimate.time.abs() < 1e-3);
//! ```
//!
//! ## Errors
//! - [`InputError`] (wrapped in [`SolveError::InvalidInput`]): caller bug, raised
//!   before any iteration
//! - [`ConvergenceFailure`] (wrapped in [`SolveError::NotConverged`]): budget ran
//!   out or the iterate diverged; carries the best estimate seen

pub mod config;
pub mod error;
pub mod geometry;
pub mod residual;
pub mod solver;

pub use config::{ResidualKind, SolverConfig};
pub use error::{ConvergenceFailure, FailureReason, InputError, SolveError, SolveResult};
pub use solver::{find_shot_source, locate};

pub use shot_types::{Point3, SensorArray, ShotEstimate, Solution};
