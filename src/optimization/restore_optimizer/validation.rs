//! Validation helpers for the restoration loop.
//!
//! This module centralizes the consistency checks used across the
//! restorer:
//!
//! - **Option checks**: [`verify_tol_grad`], [`verify_tol_cost`],
//!   [`verify_learning_rate`], [`verify_prior_weight`] ensure numeric
//!   settings are finite (and strictly positive where required).
//! - **Gradient validation**: [`validate_grad`] enforces the latent shape and
//!   finite entries.
//! - **Shapes and identity**: [`validate_latent_shape`] and
//!   [`validate_binding`] guard in-place writes and optimizer binding.
//! - **Outputs**: [`validate_value`] rejects non-finite objective values.
//!
//! These helpers standardize error reporting by returning domain-specific
//! [`OptError`] variants.
use crate::optimization::{
    errors::{OptError, OptResult},
    restore_optimizer::{
        parameter::{LatentParam, ParamId},
        types::Grad,
    },
};

/// Validate the optional gradient‐norm tolerance.
///
/// - Accepts `None` (solver default).
/// - If `Some`, the value must be **finite** and **strictly positive**.
///
/// # Errors
/// Returns [`OptError::InvalidTolGrad`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate the optional cost‐change tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidTolCost`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate a gradient-descent learning rate (finite, strictly positive).
///
/// # Errors
/// Returns [`OptError::InvalidLearningRate`] otherwise.
pub fn verify_learning_rate(lr: f64) -> OptResult<()> {
    if !lr.is_finite() {
        return Err(OptError::InvalidLearningRate { lr, reason: "Learning rate must be finite." });
    }
    if lr <= 0.0 {
        return Err(OptError::InvalidLearningRate {
            lr,
            reason: "Learning rate must be positive.",
        });
    }
    Ok(())
}

/// Validate the prior weight. Any finite value is accepted, including zero
/// and negative weights.
///
/// # Errors
/// Returns [`OptError::InvalidPriorWeight`] for `NaN` or `±∞`.
pub fn verify_prior_weight(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::InvalidPriorWeight {
            value,
            reason: "Prior weight must be finite.",
        });
    }
    Ok(())
}

/// Validate a gradient against the latent shape and finiteness.
///
/// # Errors
/// - [`OptError::GradientShapeMismatch`] if the shapes differ.
/// - [`OptError::InvalidGradient`] with the flat index/value of the first
///   offending element.
pub fn validate_grad(grad: &Grad, expected: &[usize]) -> OptResult<()> {
    if grad.shape() != expected {
        return Err(OptError::GradientShapeMismatch {
            expected: expected.to_vec(),
            found: grad.shape().to_vec(),
        });
    }
    for (index, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

/// Validate that replacement content matches the latent shape.
///
/// # Errors
/// Returns [`OptError::LatentShapeMismatch`] if the shapes differ.
pub fn validate_latent_shape(expected: &[usize], found: &[usize]) -> OptResult<()> {
    if expected != found {
        return Err(OptError::LatentShapeMismatch {
            expected: expected.to_vec(),
            found: found.to_vec(),
        });
    }
    Ok(())
}

/// Validate that `param` is the parameter an optimizer was bound to.
///
/// # Errors
/// Returns [`OptError::ParameterNotBound`] on an identity mismatch.
pub fn validate_binding(bound: ParamId, param: &LatentParam) -> OptResult<()> {
    if bound != param.id() {
        return Err(OptError::ParameterNotBound { expected: bound.get(), found: param.id().get() });
    }
    Ok(())
}

/// Validate that a scalar objective value is finite.
///
/// # Errors
/// Returns [`OptError::NonFiniteCost`] if the value is `NaN` or infinite.
pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    #[test]
    // Purpose
    // -------
    // `validate_grad` must reject gradients whose shape differs from the
    // latent shape before any arithmetic can broadcast or panic.
    //
    // Given
    // -----
    // - A 1×1×2×2 gradient checked against a 1×1×2×3 latent shape.
    //
    // Expect
    // ------
    // - `OptError::GradientShapeMismatch` with both shapes reported.
    fn validate_grad_rejects_shape_mismatch() {
        // Arrange
        let grad: Grad = Array4::zeros((1, 1, 2, 2));

        // Act
        let err = validate_grad(&grad, &[1, 1, 2, 3]).expect_err("Shapes differ");

        // Assert
        assert_eq!(
            err,
            OptError::GradientShapeMismatch { expected: vec![1, 1, 2, 3], found: vec![1, 1, 2, 2] }
        );
    }

    #[test]
    // Purpose
    // -------
    // Non-finite gradient entries are reported with their flat index.
    //
    // Given
    // -----
    // - A zero gradient with `NaN` at logical position [0, 0, 1, 0].
    //
    // Expect
    // ------
    // - `OptError::InvalidGradient` with `index == 2`.
    fn validate_grad_reports_first_non_finite_entry() {
        // Arrange
        let mut grad: Grad = Array4::zeros((1, 1, 2, 2));
        grad[[0, 0, 1, 0]] = f64::NAN;

        // Act
        let err = validate_grad(&grad, &[1, 1, 2, 2]).expect_err("NaN entry");

        // Assert
        match err {
            OptError::InvalidGradient { index, .. } => assert_eq!(index, 2),
            other => panic!("Expected InvalidGradient, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Option checks accept absent values and reject non-positive ones.
    //
    // Given
    // -----
    // - `None`, a positive tolerance, zero, and a negative learning rate.
    //
    // Expect
    // ------
    // - `Ok` for the first two, typed errors for the rest.
    fn option_checks_accept_valid_and_reject_invalid_values() {
        assert!(verify_tol_grad(None).is_ok());
        assert!(verify_tol_cost(Some(1e-9)).is_ok());
        assert!(matches!(verify_tol_grad(Some(0.0)), Err(OptError::InvalidTolGrad { .. })));
        assert!(matches!(verify_learning_rate(-0.1), Err(OptError::InvalidLearningRate { .. })));
        assert!(verify_prior_weight(0.0).is_ok());
        assert!(matches!(
            verify_prior_weight(f64::NAN),
            Err(OptError::InvalidPriorWeight { .. })
        ));
    }
}
