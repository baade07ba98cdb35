//! Adapter that exposes one restore step as an `argmin` problem.
//!
//! Argmin solvers work on flat vectors and pure `cost`/`gradient` calls. The
//! adapter bridges that to the restoration closure: every evaluation writes
//! the candidate point into the latent parameter, runs the closure with
//! gradients enabled, and reads the accumulated gradient back as a flat
//! vector.
//!
//! Evaluations are recorded in a [`StepRecord`] owned by the caller rather
//! than by the problem. Argmin may drop the problem (an L-BFGS line search
//! that fails is turned into a solver exit), and the record still holds the
//! last evaluation and the first evaluation error. The last evaluation also
//! serves as a cache, so a `cost` followed by a `gradient` at the same point
//! costs a single closure call.
use std::cell::RefCell;

use argmin::core::{CostFunction, Error, Gradient};

use crate::optimization::{
    errors::{OptError, OptResult},
    restore_optimizer::{
        closure::ObjectiveClosure,
        parameter::LatentParam,
        traits::GradMode,
        types::{Cost, Flat},
        validation::validate_value,
    },
};

/// Result of one closure call at `point`.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub point: Flat,
    pub cost: Cost,
    pub grad: Flat,
    /// `false` when the loss was detached and no gradient was accumulated.
    pub attached: bool,
}

impl Evaluation {
    /// No usable descent direction: detached loss or an exactly zero gradient.
    pub fn is_stationary(&self) -> bool {
        !self.attached || self.grad.iter().all(|g| *g == 0.0)
    }
}

/// Evaluations made during one restore step.
#[derive(Debug, Default)]
pub struct StepRecord {
    last: RefCell<Option<Evaluation>>,
    error: RefCell<Option<OptError>>,
}

impl StepRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cost of the most recent successful closure call, if any.
    pub fn last_cost(&self) -> Option<Cost> {
        self.last.borrow().as_ref().map(|e| e.cost)
    }

    /// First error raised while evaluating the objective, if any.
    pub fn take_error(&self) -> Option<OptError> {
        self.error.borrow_mut().take()
    }

    fn cached(&self, x: &Flat) -> Option<Evaluation> {
        self.last.borrow().as_ref().filter(|e| &e.point == x).cloned()
    }

    fn store(&self, result: &OptResult<Evaluation>) {
        match result {
            Ok(evaluation) => *self.last.borrow_mut() = Some(evaluation.clone()),
            Err(err) => {
                self.error.borrow_mut().get_or_insert_with(|| err.clone());
            }
        }
    }
}

pub struct LatentProblem<'a, 'c> {
    param: RefCell<&'a mut LatentParam>,
    closure: RefCell<&'a mut (dyn ObjectiveClosure + 'c)>,
    record: &'a StepRecord,
}

impl<'a, 'c> LatentProblem<'a, 'c> {
    pub fn new(
        param: &'a mut LatentParam, closure: &'a mut (dyn ObjectiveClosure + 'c),
        record: &'a StepRecord,
    ) -> Self {
        Self { param: RefCell::new(param), closure: RefCell::new(closure), record }
    }

    /// Evaluate the closure at `x`, reusing the recorded evaluation when `x`
    /// is the last evaluated point. Failures are recorded before they are
    /// returned.
    ///
    /// # Errors
    /// - `OptError::FlatLengthMismatch` if `x` does not match the latent size.
    /// - Closure errors and [`validate_value`] failures.
    pub fn evaluate_at(&self, x: &Flat) -> OptResult<Evaluation> {
        if let Some(hit) = self.record.cached(x) {
            return Ok(hit);
        }
        let result = self.evaluate_fresh(x);
        self.record.store(&result);
        result
    }

    fn evaluate_fresh(&self, x: &Flat) -> OptResult<Evaluation> {
        let mut param = self.param.borrow_mut();
        param.write_flat(x)?;
        let cost = self.closure.borrow_mut().evaluate(&mut **param, GradMode::Enabled)?;
        validate_value(cost)?;
        Ok(Evaluation {
            point: x.clone(),
            cost,
            grad: param.flat_grad(),
            attached: param.grad().is_some(),
        })
    }
}

impl CostFunction for LatentProblem<'_, '_> {
    type Param = Flat;
    type Output = Cost;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.evaluate_at(x)?.cost)
    }
}

impl Gradient for LatentProblem<'_, '_> {
    type Param = Flat;
    type Gradient = Flat;

    fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, Error> {
        Ok(self.evaluate_at(x)?.grad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{errors::OptError, restore_optimizer::types::Image};
    use ndarray::{Array4, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Writing candidate points into the latent before each closure call.
    // - Caching of repeated evaluations at the same point.
    // - Detached losses reported as stationary.
    // - Round-tripping closure errors through `argmin::core::Error`.
    // - The step record keeping the first error beyond the problem's life.
    // -------------------------------------------------------------------------

    fn latent() -> LatentParam {
        let raw: Image = Array4::zeros((1, 1, 1, 2));
        LatentParam::wrap(raw)
    }

    /// `Σ x²` with gradient `2x`, counting calls.
    fn quadratic(
        calls: &mut usize,
    ) -> impl FnMut(&mut LatentParam, GradMode) -> OptResult<Cost> + '_ {
        move |param: &mut LatentParam, _mode: GradMode| {
            *calls += 1;
            let x = param.read_raw();
            param.zero_grad();
            param.accumulate_grad(&x * 2.0)?;
            Ok(x.iter().map(|v| v * v).sum())
        }
    }

    #[test]
    // Purpose
    // -------
    // `cost` and `gradient` at the same point share one closure call, and
    // the candidate point is written into the latent.
    //
    // Given
    // -----
    // - Quadratic closure; point [1, -2].
    //
    // Expect
    // ------
    // - cost 5, gradient [2, -4], latent content [1, -2], one closure call.
    fn cost_and_gradient_share_one_closure_call() {
        // Arrange
        let mut calls = 0;
        let mut param = latent();
        let x: Flat = array![1.0, -2.0];
        {
            let mut closure = quadratic(&mut calls);
            let record = StepRecord::new();
            let problem = LatentProblem::new(&mut param, &mut closure, &record);

            // Act
            let cost = problem.cost(&x).unwrap();
            let grad = problem.gradient(&x).unwrap();

            // Assert
            assert_eq!(cost, 5.0);
            assert_eq!(grad, array![2.0, -4.0]);
            assert_eq!(record.last_cost(), Some(5.0));
        }
        assert_eq!(param.to_flat(), x);
        assert_eq!(calls, 1);
    }

    #[test]
    // Purpose
    // -------
    // A closure that never backpropagates yields a stationary evaluation.
    //
    // Given
    // -----
    // - Closure returning 3.0 without touching the gradient.
    //
    // Expect
    // ------
    // - `attached == false`, zero gradient, `is_stationary()`.
    fn detached_closure_is_stationary() {
        // Arrange
        let mut param = latent();
        let mut closure = |_: &mut LatentParam, _: GradMode| -> OptResult<Cost> { Ok(3.0) };
        let record = StepRecord::new();
        let problem = LatentProblem::new(&mut param, &mut closure, &record);

        // Act
        let eval = problem.evaluate_at(&array![0.5, 0.5]).unwrap();

        // Assert
        assert!(!eval.attached);
        assert!(eval.is_stationary());
        assert_eq!(eval.grad, array![0.0, 0.0]);
    }

    #[test]
    // Purpose
    // -------
    // Closure errors cross the Argmin boundary and come back unchanged.
    //
    // Given
    // -----
    // - Closure failing with `OptError::Collaborator`.
    //
    // Expect
    // ------
    // - Converting the Argmin error back yields the original `OptError`.
    fn closure_errors_round_trip_through_argmin() {
        // Arrange
        let failure = OptError::Collaborator { stage: "degradation", text: "bad".to_string() };
        let expected = failure.clone();
        let mut param = latent();
        let mut closure = move |_: &mut LatentParam, _: GradMode| -> OptResult<Cost> {
            Err(failure.clone())
        };
        let record = StepRecord::new();
        let problem = LatentProblem::new(&mut param, &mut closure, &record);

        // Act
        let err = problem.cost(&array![0.0, 0.0]).unwrap_err();

        // Assert
        assert_eq!(OptError::from(err), expected);
    }

    #[test]
    // Purpose
    // -------
    // The record outlives the problem and keeps the first evaluation error
    // next to the last successful evaluation.
    //
    // Given
    // -----
    // - Closure that succeeds once, then fails with `Collaborator` and
    //   afterwards with `NonFiniteCost`; the problem is dropped after use.
    //
    // Expect
    // ------
    // - `last_cost` is the successful cost; `take_error` yields the
    //   `Collaborator` error once, then `None`.
    fn record_keeps_first_error_after_problem_is_dropped() {
        // Arrange
        let mut param = latent();
        let mut calls = 0usize;
        let mut closure = move |_: &mut LatentParam, _: GradMode| -> OptResult<Cost> {
            calls += 1;
            match calls {
                1 => Ok(1.5),
                2 => Err(OptError::Collaborator { stage: "prior", text: "boom".to_string() }),
                _ => Err(OptError::NonFiniteCost { value: f64::NAN }),
            }
        };
        let record = StepRecord::new();

        // Act
        {
            let problem = LatentProblem::new(&mut param, &mut closure, &record);
            problem.evaluate_at(&array![0.0, 0.0]).unwrap();
            assert!(problem.evaluate_at(&array![1.0, 0.0]).is_err());
            assert!(problem.evaluate_at(&array![2.0, 0.0]).is_err());
        }

        // Assert
        assert_eq!(record.last_cost(), Some(1.5));
        assert!(matches!(record.take_error(), Some(OptError::Collaborator { stage: "prior", .. })));
        assert!(record.take_error().is_none());
    }
}
