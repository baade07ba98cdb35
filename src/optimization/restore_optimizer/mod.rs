//! restore_optimizer — projected, optimization-based image restoration.
//!
//! Purpose
//! -------
//! Restore a degraded observation by minimizing
//! `L(x) = fidelity(x, y) + prior_weight * prior(x)` over a latent estimate
//! `x`, applying a projection onto the feasible domain after every optimizer
//! step. Callers implement the collaborators ([`Degradation`], [`Prior`],
//! [`Projection`]), pick an optimizer, and call [`ImageRestorer::restore`].
//!
//! Key behaviors
//! -------------
//! - [`objective::Objective`] evaluates `L(x)` and assembles `∇L(x)` from
//!   whichever collaborators supply analytic gradients; non-differentiable
//!   terms are detached, with an optional finite-difference fallback.
//! - [`parameter::LatentParam`] is the single differentiable latent whose
//!   content is updated in place by the optimizer and by the projection.
//! - [`closure::RestoreClosure`] is the recomputable objective handed to
//!   optimizers; [`closure::perform_step`] runs one step.
//! - [`run::run_restore`] is the step/project loop behind
//!   [`ImageRestorer::restore_with_outcome`].
//!
//! Invariants & assumptions
//! ------------------------
//! - The observation is never mutated.
//! - The optimizer is bound once per restore call to the one latent
//!   parameter; projections never replace that parameter.
//! - Exactly `num_steps` steps and projections run; `num_steps == 0` returns
//!   the initial estimate unprojected.
//! - Every failure propagates as [`OptError`](crate::optimization::errors::OptError);
//!   no partial estimate is returned.
//!
//! Conventions
//! -----------
//! - Images are `[B, C, H, W]` `ndarray` batches of `f64` ([`Image`]).
//! - The restorer minimizes; priors are penalties, not log-densities.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each submodule; end-to-end behavior (step
//!   counts, projection idempotence, determinism, monotonic descent) is
//!   covered by the integration tests under `tests/`.

pub mod api;
pub mod closure;
pub mod finite_diff;
pub mod objective;
pub mod parameter;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::ImageRestorer;
pub use self::closure::{ObjectiveClosure, RestoreClosure, perform_step};
pub use self::objective::{Loss, Objective};
pub use self::parameter::{LatentParam, ParamId};
pub use self::run::run_restore;
pub use self::traits::{
    Degradation, GradMode, GradientFallback, Optimizer, Prior, Projection, RestoreOptions,
    RestoreOutcome, StepOptimizer,
};
pub use self::types::{Cost, Flat, Grad, Image};

pub mod prelude {
    pub use super::api::ImageRestorer;
    pub use super::closure::ObjectiveClosure;
    pub use super::parameter::{LatentParam, ParamId};
    pub use super::traits::{
        Degradation, GradMode, GradientFallback, Optimizer, Prior, Projection, RestoreOptions,
        RestoreOutcome, StepOptimizer,
    };
    pub use super::types::{Cost, Grad, Image};
}
