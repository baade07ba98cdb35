//! High-level entry point for restoring an observation by optimization.
//!
//! [`ImageRestorer`] bundles a degradation model, a prior, a projection and
//! an optimizer with construction-time [`RestoreOptions`]. Each call to
//! [`ImageRestorer::restore`] is independent: it starts from the
//! degradation's initial estimate, binds a fresh optimizer and delegates the
//! loop to [`run_restore`].
use crate::optimization::{
    errors::OptResult,
    restore_optimizer::{
        objective::Objective,
        run::run_restore,
        traits::{Degradation, Optimizer, Prior, Projection, RestoreOptions, RestoreOutcome},
        types::Image,
    },
    solvers::OptimizerKind,
};

/// Restoration by projected optimization of
/// `fidelity(x, y) + prior_weight * prior(x)`.
///
/// The optimizer defaults to [`OptimizerKind`]; any [`Optimizer`] can be
/// injected instead.
#[derive(Debug, Clone)]
pub struct ImageRestorer<D, P, J, O = OptimizerKind> {
    degradation: D,
    prior: P,
    projection: J,
    optimizer: O,
    options: RestoreOptions,
}

impl<D, P, J, O> ImageRestorer<D, P, J, O>
where
    D: Degradation,
    P: Prior,
    J: Projection,
    O: Optimizer,
{
    pub fn new(
        degradation: D, prior: P, projection: J, optimizer: O, options: RestoreOptions,
    ) -> Self {
        Self { degradation, prior, projection, optimizer, options }
    }

    /// Restore `observation` and return the final latent estimate.
    ///
    /// # Errors
    /// Everything [`run_restore`] returns.
    pub fn restore(&self, observation: &Image) -> OptResult<Image> {
        Ok(self.restore_with_outcome(observation)?.restored)
    }

    /// Restore `observation` and return the estimate with run diagnostics.
    pub fn restore_with_outcome(&self, observation: &Image) -> OptResult<RestoreOutcome> {
        run_restore(
            &self.degradation,
            &self.prior,
            &self.projection,
            &self.optimizer,
            &self.options,
            observation,
        )
    }

    /// The objective this restorer minimizes, for inspection and tests.
    pub fn objective(&self) -> Objective<'_, D, P> {
        Objective::new(
            &self.degradation,
            &self.prior,
            self.options.prior_weight,
            self.options.gradient_fallback,
        )
    }

    /// Apply the configured projection once.
    pub fn project(&self, raw: Image) -> OptResult<Image> {
        self.projection.project(raw)
    }

    pub fn options(&self) -> &RestoreOptions {
        &self.options
    }
}
