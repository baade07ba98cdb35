//! restore_optimizer::objective — fidelity + weighted prior.
//!
//! [`Objective`] evaluates `L(x) = fidelity(x, y) + prior_weight * prior(x)`
//! and, when gradients are enabled, attaches `∇L(x)` assembled from whichever
//! collaborators provide analytic gradients. A collaborator returning
//! `OptError::GradientNotImplemented` contributes a detached term; if every
//! term is detached the resulting [`Loss`] carries no gradient unless a
//! finite-difference fallback was requested.
use crate::optimization::{
    errors::{OptError, OptResult},
    restore_optimizer::{
        finite_diff::fd_gradient,
        parameter::LatentParam,
        traits::{Degradation, GradMode, GradientFallback, Prior},
        types::{Cost, Grad, Image},
        validation::{validate_grad, validate_value},
    },
};

/// Scalar objective value with an optional gradient attached.
///
/// A loss without a gradient is "detached": it is a valid value but cannot
/// be backpropagated.
#[derive(Debug, Clone, PartialEq)]
pub struct Loss {
    value: Cost,
    grad: Option<Grad>,
}

impl Loss {
    pub fn detached(value: Cost) -> Self {
        Self { value, grad: None }
    }

    pub fn with_grad(value: Cost, grad: Grad) -> Self {
        Self { value, grad: Some(grad) }
    }

    pub fn value(&self) -> Cost {
        self.value
    }

    pub fn requires_grad(&self) -> bool {
        self.grad.is_some()
    }

    /// Accumulate the attached gradient into `param`.
    ///
    /// # Errors
    /// - [`OptError::DetachedLoss`] if no gradient is attached.
    /// - Shape/finiteness errors from [`LatentParam::accumulate_grad`].
    pub fn backward(self, param: &mut LatentParam) -> OptResult<()> {
        match self.grad {
            Some(grad) => param.accumulate_grad(grad),
            None => Err(OptError::DetachedLoss),
        }
    }
}

/// Restoration objective over borrowed collaborators.
#[derive(Debug)]
pub struct Objective<'a, D, P> {
    degradation: &'a D,
    prior: &'a P,
    prior_weight: f64,
    fallback: GradientFallback,
}

impl<'a, D, P> Objective<'a, D, P>
where
    D: Degradation,
    P: Prior,
{
    pub fn new(
        degradation: &'a D, prior: &'a P, prior_weight: f64, fallback: GradientFallback,
    ) -> Self {
        Self { degradation, prior, prior_weight, fallback }
    }

    pub fn prior_weight(&self) -> f64 {
        self.prior_weight
    }

    /// Objective value without gradients.
    ///
    /// # Errors
    /// - Collaborator errors.
    /// - [`OptError::NonFiniteCost`] if the total is `NaN` or infinite.
    pub fn value(&self, latent: &Image, observation: &Image) -> OptResult<Cost> {
        let fidelity = self.degradation.fidelity(latent, observation)?;
        let prior = self.prior.value(latent)?;
        let value = fidelity + self.prior_weight * prior;
        validate_value(value)?;
        Ok(value)
    }

    /// Objective value, with a gradient attached when `mode` is enabled and
    /// at least one term is differentiable (or the fallback applies).
    ///
    /// # Errors
    /// - Everything [`Objective::value`] returns.
    /// - Collaborator gradient errors other than `GradientNotImplemented`.
    /// - [`OptError::GradientShapeMismatch`] / [`OptError::InvalidGradient`]
    ///   for malformed term gradients.
    pub fn evaluate(&self, latent: &Image, observation: &Image, mode: GradMode) -> OptResult<Loss> {
        let value = self.value(latent, observation)?;
        if !mode.is_enabled() {
            return Ok(Loss::detached(value));
        }

        let fidelity_grad = attached(self.degradation.fidelity_grad(latent, observation))?;
        let prior_grad = attached(self.prior.grad(latent))?;
        if let Some(g) = &fidelity_grad {
            validate_grad(g, latent.shape())?;
        }
        if let Some(g) = &prior_grad {
            validate_grad(g, latent.shape())?;
        }

        let grad = match (fidelity_grad, prior_grad) {
            (Some(mut f), Some(p)) => {
                f.scaled_add(self.prior_weight, &p);
                Some(f)
            }
            (Some(f), None) => Some(f),
            (None, Some(p)) => Some(p * self.prior_weight),
            (None, None) => match self.fallback {
                GradientFallback::Skip => None,
                GradientFallback::FiniteDifference => {
                    Some(fd_gradient(latent, |x| self.value(x, observation))?)
                }
            },
        };

        Ok(match grad {
            Some(g) => Loss::with_grad(value, g),
            None => Loss::detached(value),
        })
    }
}

/// Turn `GradientNotImplemented` into "no gradient"; keep other errors.
fn attached(result: OptResult<Grad>) -> OptResult<Option<Grad>> {
    match result {
        Ok(g) => Ok(Some(g)),
        Err(OptError::GradientNotImplemented) => Ok(None),
        Err(e) => Err(e),
    }
}
