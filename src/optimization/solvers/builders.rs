//! solvers::builders — Argmin solver construction helpers.
//!
//! Purpose
//! -------
//! Build configured Argmin solvers from validated settings, hiding Argmin's
//! generic wiring from the stepper. Each builder is side-effect free: the
//! starting point and the inner iteration limit are applied by the stepper
//! at every restore step.
//!
//! Key behaviors
//! -------------
//! - [`build_gradient_descent`] wires a fixed-step `Landweber` solver.
//! - [`build_steepest_hager_zhang`] / [`build_steepest_more_thuente`] pair
//!   steepest descent with a line search.
//! - [`build_lbfgs_hager_zhang`] / [`build_lbfgs_more_thuente`] build L-BFGS
//!   with the configured history size, then [`configure_lbfgs`] applies the
//!   optional tolerances.
//!
//! Invariants & assumptions
//! ------------------------
//! - All solvers operate on flat latent vectors ([`Flat`]) and scalar
//!   [`Cost`].
//! - Tolerance errors raised by Argmin surface as [`OptError`] via
//!   `From<argmin::core::Error>`.
//!
//! [`OptError`]: crate::optimization::errors::OptError
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    restore_optimizer::types::{
        Cost, Flat, GradientDescent, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
        MoreThuenteLS, SteepestHagerZhang, SteepestMoreThuente,
    },
    solvers::config::{GradientDescentConfig, LbfgsConfig},
};

/// Fixed-step descent `x ← x - lr · ∇L(x)`.
pub fn build_gradient_descent(config: &GradientDescentConfig) -> GradientDescent {
    GradientDescent::new(config.lr)
}

pub fn build_steepest_hager_zhang() -> SteepestHagerZhang {
    SteepestHagerZhang::new(HagerZhangLS::new())
}

pub fn build_steepest_more_thuente() -> SteepestMoreThuente {
    SteepestMoreThuente::new(MoreThuenteLS::new())
}

/// L-BFGS with Hager–Zhang line search and the configured history size.
///
/// # Errors
/// Argmin rejections of `tol_grad` / `tol_cost`.
pub fn build_lbfgs_hager_zhang(config: &LbfgsConfig) -> OptResult<LbfgsHagerZhang> {
    let lbfgs = LbfgsHagerZhang::new(HagerZhangLS::new(), config.history_size);
    configure_lbfgs(lbfgs, config)
}

/// L-BFGS with More–Thuente line search and the configured history size.
///
/// # Errors
/// Argmin rejections of `tol_grad` / `tol_cost`.
pub fn build_lbfgs_more_thuente(config: &LbfgsConfig) -> OptResult<LbfgsMoreThuente> {
    let lbfgs = LbfgsMoreThuente::new(MoreThuenteLS::new(), config.history_size);
    configure_lbfgs(lbfgs, config)
}

/// Apply the optional tolerances to an L-BFGS solver.
///
/// When a tolerance is `None` the corresponding `with_tolerance_*` method is
/// not called and Argmin's default stays in effect.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Flat, Flat, Cost>, config: &LbfgsConfig,
) -> OptResult<LBFGS<L, Flat, Flat, Cost>> {
    if let Some(g) = config.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = config.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}
