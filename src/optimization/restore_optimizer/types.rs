//! restore_optimizer::types — shared numeric aliases and solver wiring.
//!
//! Purpose
//! -------
//! Centralize the array and scalar types used by the restoration loop and
//! the Argmin-backed solvers, so the rest of the code stays agnostic to
//! `ndarray` dimensionality and Argmin generics.
//!
//! Key behaviors
//! -------------
//! - Define canonical aliases for image batches, gradients, flat parameter
//!   vectors and scalar costs (`Image`, `Grad`, `Flat`, `Cost`).
//! - Fix the Argmin iteration state used at the solver boundary
//!   (`LatentState`).
//! - Expose pre-wired solver aliases for each supported line search.
//!
//! Invariants & assumptions
//! ------------------------
//! - Images are 4-D batches `[B, C, H, W]` of `f64`.
//! - A `Flat` vector is the logical (row-major) flattening of an `Image`;
//!   its length equals the number of latent elements.
//! - Argmin only ever sees `Flat` parameters and gradients.
//!
//! Testing notes
//! -------------
//! - This module only defines type aliases and constants; correctness is
//!   exercised by the modules that instantiate them.
use argmin::{
    core::IterState,
    solver::{
        gradientdescent::SteepestDescent,
        landweber::Landweber,
        linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
        quasinewton::LBFGS,
    },
};
use ndarray::{Array1, Array4};

/// Batch of images `[B, C, H, W]`; used for observations and latent estimates.
pub type Image = Array4<f64>;

/// Gradient of the objective with respect to a latent estimate.
///
/// Always has the shape of the latent it was computed for.
pub type Grad = Array4<f64>;

/// Row-major flattening of an [`Image`], used at the Argmin boundary and by
/// finite differences.
pub type Flat = Array1<f64>;

/// Scalar objective value `fidelity + prior_weight * prior`.
pub type Cost = f64;

/// Argmin iteration state for first-order and quasi-Newton solvers.
pub type LatentState = IterState<Flat, Flat, (), (), (), Cost>;

/// Default history size (`m`) for L-BFGS.
pub const DEFAULT_LBFGS_MEM: usize = 7;

/// Default number of inner L-BFGS iterations per restore step.
pub const DEFAULT_LBFGS_INNER_ITERS: usize = 20;

/// Default learning rate for plain gradient descent.
pub const DEFAULT_LEARNING_RATE: f64 = 1e-3;

/// Default number of restore steps.
pub const DEFAULT_NUM_STEPS: usize = 100;

/// Hager–Zhang line search specialized to flat latent vectors.
pub type HagerZhangLS = HagerZhangLineSearch<Flat, Flat, Cost>;

/// More–Thuente line search specialized to flat latent vectors.
pub type MoreThuenteLS = MoreThuenteLineSearch<Flat, Flat, Cost>;

/// L-BFGS solver wired to the Hager–Zhang line search.
pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Flat, Flat, Cost>;

/// L-BFGS solver wired to the More–Thuente line search.
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Flat, Flat, Cost>;

/// Steepest descent wired to the Hager–Zhang line search.
pub type SteepestHagerZhang = SteepestDescent<HagerZhangLS>;

/// Steepest descent wired to the More–Thuente line search.
pub type SteepestMoreThuente = SteepestDescent<MoreThuenteLS>;

/// Fixed-step gradient descent `x ← x - lr · ∇L(x)`.
pub type GradientDescent = Landweber<Cost>;
