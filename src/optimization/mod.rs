//! optimization — projected restoration loop, Argmin solvers, error surface.
//!
//! Purpose
//! -------
//! Provide a cohesive optimization layer for restoring images: a projected
//! step loop over a differentiable latent estimate (`restore_optimizer`),
//! Argmin-backed solvers selected by configuration (`solvers`), and a single
//! error/result surface (`errors`).
//!
//! Key behaviors
//! -------------
//! - Expose a high-level API (`ImageRestorer`) that minimizes
//!   `fidelity + prior_weight * prior` with a projection after every step.
//! - Adapt Argmin's gradient descent, steepest descent and L-BFGS solvers to
//!   a step-at-a-time contract that re-evaluates the objective through a
//!   closure.
//! - Normalize configuration issues, numerical failures, and backend solver
//!   errors into `errors::OptError` with the `OptResult<T>` alias.
//!
//! Conventions
//! -----------
//! - Public entrypoints that can fail return `OptResult<T>`; callers never
//!   see raw Argmin errors.
//! - Progress is reported through the `log` facade only; installing a
//!   logger is left to the application.
//!
//! Downstream usage
//! ----------------
//! - Front-ends typically import the curated surface via
//!   `optimization::prelude::*`.

pub mod errors;
pub mod restore_optimizer;
pub mod solvers;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::restore_optimizer::prelude::*;
    pub use super::solvers::prelude::*;
}
