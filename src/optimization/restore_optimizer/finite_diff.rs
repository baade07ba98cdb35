//! restore_optimizer::finite_diff — finite-difference objective gradients.
//!
//! Purpose
//! -------
//! Approximate the gradient of the restoration objective with respect to a
//! latent image batch when neither collaborator provides an analytic
//! gradient, so that `GradientFallback::FiniteDifference` can still feed a
//! first-order optimizer.
//!
//! Key behaviors
//! -------------
//! - Flatten the latent, difference a scalar closure with `finitediff`, and
//!   reshape the result back to the latent shape ([`fd_gradient`]).
//! - Prefer central differences; retry with forward differences when an
//!   objective evaluation failed or the central gradient is not finite
//!   ([`run_fd_diff`]).
//! - Capture objective errors through a `RefCell`, because the
//!   finite-difference closure must return a bare `f64`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Returned gradients have the latent shape and finite entries.
//! - An error captured on the forward-difference path is a hard failure.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the quadratic happy path, error propagation and the
//!   non-finite rejection path.
use std::cell::RefCell;

use finitediff::FiniteDiff;

use crate::optimization::{
    errors::{OptError, OptResult},
    restore_optimizer::{
        parameter::{flatten, unflatten},
        types::{Cost, Flat, Grad, Image},
        validation::validate_grad,
    },
};

/// fd_gradient — finite-difference gradient of `func` at `latent`.
///
/// Parameters
/// ----------
/// - `latent`: `&Image`
///   Point at which the gradient is approximated; defines the output shape.
/// - `func`: `F: Fn(&Image) -> OptResult<Cost>`
///   Scalar objective. Errors are captured and surfaced after differencing.
///
/// Returns
/// -------
/// `OptResult<Grad>` with the shape of `latent`.
///
/// Errors
/// ------
/// - Any error raised by `func` on the forward-difference path.
/// - [`OptError::InvalidGradient`] if the forward-difference gradient still
///   contains non-finite entries.
pub fn fd_gradient<F>(latent: &Image, func: F) -> OptResult<Grad>
where
    F: Fn(&Image) -> OptResult<Cost>,
{
    let dim = latent.raw_dim();
    let x0 = flatten(latent);
    let closure_err: RefCell<Option<OptError>> = RefCell::new(None);
    let cost_func = |x: &Flat| -> f64 {
        let outcome = unflatten(x, dim).and_then(|candidate| func(&candidate));
        match outcome {
            Ok(val) => val,
            Err(e) => {
                let mut slot = closure_err.borrow_mut();
                if slot.is_none() {
                    *slot = Some(e);
                }
                f64::NAN
            }
        }
    };

    let central = x0.central_diff(&cost_func);
    let central_ok = closure_err.borrow().is_none() && central.iter().all(|v| v.is_finite());
    let fd_flat = if central_ok { central } else { run_fd_diff(&x0, &cost_func, &closure_err)? };

    let grad = unflatten(&fd_flat, dim)?;
    validate_grad(&grad, latent.shape())?;
    Ok(grad)
}

/// Forward-difference gradient of `func` at `x0`, with error capture.
///
/// Clears `closure_err`, differences, and returns the first captured error
/// if any. Non-finite entries are reported as [`OptError::InvalidGradient`].
pub fn run_fd_diff<G: Fn(&Flat) -> f64>(
    x0: &Flat, func: &G, closure_err: &RefCell<Option<OptError>>,
) -> OptResult<Flat> {
    closure_err.replace(None);
    let fd_grad = x0.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    for (index, &value) in fd_grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(fd_grad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Finite-difference gradients of a smooth objective over an image batch.
    // - Propagation of objective errors captured inside the FD closure.
    // - Rejection of non-finite gradients.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Verify that `fd_gradient` approximates the analytic gradient of a
    // squared error and keeps the latent shape.
    //
    // Given
    // -----
    // - A 1×1×2×2 latent `x` and target `y = 0`.
    // - Objective `Σ x²`, whose gradient is `2x`.
    //
    // Expect
    // ------
    // - Shape [1, 1, 2, 2]; every entry within 1e-5 of `2x`.
    fn fd_gradient_matches_quadratic_gradient() {
        // Arrange
        let latent = Array4::from_shape_vec((1, 1, 2, 2), vec![0.5, -1.0, 2.0, 0.0]).unwrap();
        let f = |x: &Image| -> OptResult<Cost> { Ok(x.iter().map(|v| v * v).sum()) };

        // Act
        let grad = fd_gradient(&latent, f).expect("Quadratic FD gradient should succeed");

        // Assert
        assert_eq!(grad.shape(), &[1, 1, 2, 2]);
        for (g, x) in grad.iter().zip(latent.iter()) {
            assert!((g - 2.0 * x).abs() < 1e-5, "fd {g} vs analytic {}", 2.0 * x);
        }
    }

    #[test]
    // Purpose
    // -------
    // An objective error raised during differencing is returned, not hidden
    // behind a NaN gradient.
    //
    // Given
    // -----
    // - An objective that always fails with `OptError::Collaborator`.
    //
    // Expect
    // ------
    // - `fd_gradient` returns that same error.
    fn fd_gradient_propagates_objective_errors() {
        // Arrange
        let latent: Image = Array4::zeros((1, 1, 1, 2));
        let failure = OptError::Collaborator { stage: "prior", text: "boom".to_string() };
        let f = |_: &Image| -> OptResult<Cost> { Err(failure.clone()) };

        // Act
        let err = fd_gradient(&latent, f).expect_err("Objective failure should surface");

        // Assert
        assert_eq!(err, failure);
    }

    #[test]
    // Purpose
    // -------
    // `run_fd_diff` rejects gradients with non-finite entries.
    //
    // Given
    // -----
    // - An objective that always returns NaN.
    //
    // Expect
    // ------
    // - `OptError::InvalidGradient`.
    fn run_fd_diff_non_finite_gradient_yields_invalidgradient_error() {
        // Arrange
        let x0: Flat = ndarray::array![0.0, 1.0];
        let closure_err: RefCell<Option<OptError>> = RefCell::new(None);
        let f = |_x: &Flat| f64::NAN;

        // Act
        let result = run_fd_diff(&x0, &f, &closure_err);

        // Assert
        match result {
            Err(OptError::InvalidGradient { .. }) => {}
            other => panic!("Expected InvalidGradient, got {other:?}"),
        }
    }
}
