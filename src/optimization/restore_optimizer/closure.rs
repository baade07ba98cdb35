//! restore_optimizer::closure — the re-evaluable objective and one step.
//!
//! Purpose
//! -------
//! Give optimizers a "recomputable objective": a callable that, every time
//! it is invoked, clears stale gradients, evaluates the objective on the
//! *current* latent content, backpropagates when possible, and returns the
//! scalar loss. Line-search and quasi-Newton optimizers call it several
//! times per step.
//!
//! Key behaviors
//! -------------
//! - [`ObjectiveClosure`] is the contract optimizers see; it is implemented
//!   by [`RestoreClosure`] and by any
//!   `FnMut(&mut LatentParam, GradMode) -> OptResult<Cost>`.
//! - [`RestoreClosure::evaluate`] zeroes the gradient only when gradients are
//!   enabled, so repeated calls never accumulate gradients from earlier calls.
//! - A detached loss skips backpropagation instead of failing.
//! - [`perform_step`] checks the optimizer/parameter binding and runs one
//!   optimizer step.
//!
//! Invariants & assumptions
//! ------------------------
//! - The observation is never mutated; the latent is only mutated through
//!   its gradient here (content updates belong to the optimizer).
//! - After an enabled call, `param.grad()` reflects only that call.
use crate::optimization::{
    errors::OptResult,
    restore_optimizer::{
        objective::Objective,
        parameter::LatentParam,
        traits::{Degradation, GradMode, Prior, StepOptimizer},
        types::{Cost, Image},
        validation::validate_binding,
    },
};

/// Recomputable objective handed to [`StepOptimizer::step`].
pub trait ObjectiveClosure {
    fn evaluate(&mut self, param: &mut LatentParam, mode: GradMode) -> OptResult<Cost>;
}

impl<F> ObjectiveClosure for F
where
    F: FnMut(&mut LatentParam, GradMode) -> OptResult<Cost>,
{
    fn evaluate(&mut self, param: &mut LatentParam, mode: GradMode) -> OptResult<Cost> {
        self(param, mode)
    }
}

/// Objective closure over a fixed observation.
///
/// Counts its invocations and remembers the last loss, which the restore
/// loop reports in its outcome.
#[derive(Debug)]
pub struct RestoreClosure<'a, D, P> {
    objective: &'a Objective<'a, D, P>,
    observation: &'a Image,
    evals: usize,
    last_loss: Option<Cost>,
}

impl<'a, D, P> RestoreClosure<'a, D, P>
where
    D: Degradation,
    P: Prior,
{
    pub fn new(objective: &'a Objective<'a, D, P>, observation: &'a Image) -> Self {
        Self { objective, observation, evals: 0, last_loss: None }
    }

    /// Number of completed evaluations so far.
    pub fn evals(&self) -> usize {
        self.evals
    }

    pub fn last_loss(&self) -> Option<Cost> {
        self.last_loss
    }
}

impl<D, P> ObjectiveClosure for RestoreClosure<'_, D, P>
where
    D: Degradation,
    P: Prior,
{
    fn evaluate(&mut self, param: &mut LatentParam, mode: GradMode) -> OptResult<Cost> {
        if mode.is_enabled() {
            param.zero_grad();
        }
        let loss = self.objective.evaluate(param.data(), self.observation, mode)?;
        let value = loss.value();
        if loss.requires_grad() {
            loss.backward(param)?;
        } else if mode.is_enabled() {
            log::debug!("objective carries no gradient; skipping backpropagation");
        }
        self.evals += 1;
        self.last_loss = Some(value);
        Ok(value)
    }
}

/// Run one logical optimizer step on `param`.
///
/// # Errors
/// - [`OptError::ParameterNotBound`](crate::optimization::errors::OptError::ParameterNotBound)
///   if `optimizer` was bound to another parameter.
/// - Anything raised by the optimizer or by the closure it invokes.
pub fn perform_step<O>(
    optimizer: &mut O, param: &mut LatentParam, closure: &mut dyn ObjectiveClosure,
) -> OptResult<Option<Cost>>
where
    O: StepOptimizer + ?Sized,
{
    validate_binding(optimizer.param_id(), param)?;
    optimizer.step(param, closure)
}
