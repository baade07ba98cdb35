//! solvers::stepper — Argmin solvers driven one restore step at a time.
//!
//! Purpose
//! -------
//! Implement [`StepOptimizer`] on top of Argmin. A restore step runs a
//! bounded number of solver iterations from the current latent content and
//! leaves the final iterate in the latent parameter. The solver object is
//! kept between steps, so quasi-Newton history survives projections.
//!
//! Key behaviors
//! -------------
//! - The solver is driven manually (`init`, then `next_iter` until
//!   `terminate_internal` or the state reports termination), instead of
//!   through `Executor`, because the problem borrows the latent parameter
//!   and the closure only for the duration of one step.
//! - Before any solver iteration the closure is evaluated once at the
//!   current point. A stationary point (detached loss or zero gradient)
//!   ends the step without moving the latent.
//! - The solver state is seeded with the point and its gradient only; the
//!   cost is recovered by the solver's own `init` from the evaluation cache.
//! - The iteration counter runs on across steps, so solvers that bound
//!   their memory by iteration count (L-BFGS keeps `history_size` pairs)
//!   see one continuous run.
//! - The first error raised while evaluating the objective ends the step
//!   and is returned as is, even when Argmin swallowed it (an L-BFGS line
//!   search failure becomes a solver exit). A solver exit without such an
//!   error keeps the best iterate reached, or the starting point.
//! - With the `obs_slog` feature and verbose mode, inner iteration states
//!   are forwarded to an `argmin_observer_slog::SlogLogger`.
//!
//! Invariants & assumptions
//! ------------------------
//! - A stepper only ever steps the parameter it was bound to.
//! - The returned loss is the cost of the last closure call in the step.
use argmin::core::{KV, Problem, Solver, State, TerminationReason};

use crate::optimization::{
    errors::OptResult,
    restore_optimizer::{
        closure::ObjectiveClosure,
        parameter::{LatentParam, ParamId},
        traits::StepOptimizer,
        types::{
            Cost, GradientDescent, LatentState, LbfgsHagerZhang, LbfgsMoreThuente,
            SteepestHagerZhang, SteepestMoreThuente,
        },
        validation::validate_binding,
    },
    solvers::adapter::{LatentProblem, StepRecord},
};

/// Concrete Argmin solver held by a bound stepper.
pub enum ArgminSolver {
    GradientDescent(GradientDescent),
    SteepestHagerZhang(SteepestHagerZhang),
    SteepestMoreThuente(SteepestMoreThuente),
    LbfgsHagerZhang(LbfgsHagerZhang),
    LbfgsMoreThuente(LbfgsMoreThuente),
}

impl ArgminSolver {
    pub fn name(&self) -> &'static str {
        match self {
            ArgminSolver::GradientDescent(_) => "Landweber",
            ArgminSolver::SteepestHagerZhang(_) | ArgminSolver::SteepestMoreThuente(_) => {
                "Steepest Descent"
            }
            ArgminSolver::LbfgsHagerZhang(_) | ArgminSolver::LbfgsMoreThuente(_) => "L-BFGS",
        }
    }
}

/// Argmin solver bound to one latent parameter.
pub struct ArgminStepper {
    id: ParamId,
    solver: ArgminSolver,
    max_iter: usize,
    /// Solver iterations run so far, across all steps.
    iterations: u64,
    trace: StepTrace,
}

impl ArgminStepper {
    pub fn new(param: &LatentParam, solver: ArgminSolver, max_iter: usize) -> Self {
        Self { id: param.id(), solver, max_iter, iterations: 0, trace: StepTrace::default() }
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn solver(&self) -> &ArgminSolver {
        &self.solver
    }

    pub fn max_iter(&self) -> usize {
        self.max_iter
    }
}

impl StepOptimizer for ArgminStepper {
    fn param_id(&self) -> ParamId {
        self.id
    }

    fn set_verbose(&mut self, verbose: bool) {
        self.trace.set_verbose(verbose);
    }

    fn step(
        &mut self, param: &mut LatentParam, closure: &mut dyn ObjectiveClosure,
    ) -> OptResult<Option<Cost>> {
        validate_binding(self.id, param)?;
        let x0 = param.to_flat();
        let record = StepRecord::new();
        let adapter = LatentProblem::new(&mut *param, closure, &record);
        let start = adapter.evaluate_at(&x0)?;
        if start.is_stationary() {
            log::debug!("{}: stationary point, latent left unchanged", self.solver.name());
            return Ok(Some(start.cost));
        }

        let mut problem = Problem::new(adapter);
        let mut state = LatentState::new()
            .param(x0.clone())
            .gradient(start.grad)
            .max_iters(self.iterations + self.max_iter as u64);
        state.iter = self.iterations;
        let trace = &mut self.trace;
        let driven = match &mut self.solver {
            ArgminSolver::GradientDescent(s) => drive(s, &mut problem, state, trace),
            ArgminSolver::SteepestHagerZhang(s) => drive(s, &mut problem, state, trace),
            ArgminSolver::SteepestMoreThuente(s) => drive(s, &mut problem, state, trace),
            ArgminSolver::LbfgsHagerZhang(s) => drive(s, &mut problem, state, trace),
            ArgminSolver::LbfgsMoreThuente(s) => drive(s, &mut problem, state, trace),
        };
        drop(problem);
        if let Some(err) = record.take_error() {
            return Err(err);
        }

        let mut state = driven?;
        self.iterations = state.get_iter();
        if let Some(TerminationReason::SolverExit(reason)) = state.get_termination_reason() {
            log::debug!("{}: solver exit ({reason}), keeping best iterate", self.solver.name());
        }
        let x = state.take_param().or_else(|| state.take_best_param()).unwrap_or(x0);
        param.write_flat(&x)?;
        Ok(record.last_cost())
    }
}

/// Run `solver` from `state` until it terminates or `max_iters` is reached.
fn drive<'a, 'c, S>(
    solver: &mut S, problem: &mut Problem<LatentProblem<'a, 'c>>, state: LatentState,
    trace: &mut StepTrace,
) -> OptResult<LatentState>
where
    S: Solver<LatentProblem<'a, 'c>, LatentState>,
{
    let (mut state, kv) = solver.init(problem, state)?;
    state.update();
    trace.init(S::NAME, &state, kv)?;
    while !state.terminated() && !solver.terminate_internal(&state).terminated() {
        let (next, kv) = solver.next_iter(problem, state)?;
        state = next;
        state.update();
        log::trace!("{} iter {}: cost {:.6e}", S::NAME, state.get_iter(), state.get_cost());
        trace.iter(&state, kv)?;
        state.increment_iter();
    }
    Ok(state)
}

/// Optional observer of inner solver iterations.
#[derive(Default)]
struct StepTrace {
    #[cfg(feature = "obs_slog")]
    logger: Option<argmin_observer_slog::SlogLogger>,
}

impl StepTrace {
    #[cfg(feature = "obs_slog")]
    fn set_verbose(&mut self, verbose: bool) {
        self.logger = verbose.then(argmin_observer_slog::SlogLogger::term_noblock);
    }

    #[cfg(not(feature = "obs_slog"))]
    fn set_verbose(&mut self, _verbose: bool) {}

    #[cfg(feature = "obs_slog")]
    fn init(&mut self, name: &str, state: &LatentState, kv: Option<KV>) -> OptResult<()> {
        use argmin::core::observers::Observe;
        if let Some(logger) = self.logger.as_mut() {
            logger.observe_init(name, state, &kv.unwrap_or_else(KV::new))?;
        }
        Ok(())
    }

    #[cfg(not(feature = "obs_slog"))]
    fn init(&mut self, _name: &str, _state: &LatentState, _kv: Option<KV>) -> OptResult<()> {
        Ok(())
    }

    #[cfg(feature = "obs_slog")]
    fn iter(&mut self, state: &LatentState, kv: Option<KV>) -> OptResult<()> {
        use argmin::core::observers::Observe;
        if let Some(logger) = self.logger.as_mut() {
            logger.observe_iter(state, &kv.unwrap_or_else(KV::new))?;
        }
        Ok(())
    }

    #[cfg(not(feature = "obs_slog"))]
    fn iter(&mut self, _state: &LatentState, _kv: Option<KV>) -> OptResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{
        errors::OptError,
        restore_optimizer::{traits::{GradMode, Optimizer}, types::Image},
        solvers::{config::OptimizerKind, hyperparams::Hyperparams},
    };
    use approx::assert_abs_diff_eq;
    use ndarray::Array4;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - One fixed-step gradient-descent step.
    // - L-BFGS convergence on a separable quadratic within one step.
    // - Steepest descent moving the latent with either line search.
    // - L-BFGS history bounded by `history_size` across many steps.
    // - Objective errors raised inside line searches returned unchanged.
    // - Stationary points leaving the latent unchanged.
    // - Binding checks.
    // -------------------------------------------------------------------------

    /// Closure for `Σ (x - t)²` with gradient `2 (x - t)`.
    fn squared_distance(
        target: Image, calls: &mut usize,
    ) -> impl FnMut(&mut LatentParam, GradMode) -> OptResult<Cost> + '_ {
        move |param: &mut LatentParam, mode: GradMode| {
            *calls += 1;
            let diff = param.data() - &target;
            if mode.is_enabled() {
                param.zero_grad();
                param.accumulate_grad(&diff * 2.0)?;
            }
            Ok(diff.iter().map(|v| v * v).sum())
        }
    }

    fn image(values: Vec<f64>) -> Image {
        Array4::from_shape_vec((1, 1, 1, values.len()), values).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // A gradient-descent step moves the latent to `x - lr ∇L(x)` with a
    // single closure call, and reports the loss at the starting point.
    //
    // Given
    // -----
    // - x = [1, 3], target [0, 1], lr 0.25.
    //
    // Expect
    // ------
    // - Gradient [2, 4]; new x = [0.5, 2]; loss 5; one call.
    fn gradient_descent_step_applies_fixed_learning_rate() {
        // Arrange
        let mut calls = 0;
        let mut param = LatentParam::wrap(image(vec![1.0, 3.0]));
        let hp = Hyperparams::new().with("lr", 0.25);
        let mut stepper = OptimizerKind::GradientDescent.bind(&param, &hp).unwrap();
        let mut closure = squared_distance(image(vec![0.0, 1.0]), &mut calls);

        // Act
        let loss = stepper.step(&mut param, &mut closure).unwrap();
        drop(closure);

        // Assert
        assert_eq!(loss, Some(5.0));
        assert_abs_diff_eq!(param.data()[[0, 0, 0, 0]], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(param.data()[[0, 0, 0, 1]], 2.0, epsilon = 1e-12);
        assert_eq!(calls, 1);
    }

    #[test]
    // Purpose
    // -------
    // L-BFGS reaches the minimizer of a separable quadratic within one step.
    //
    // Given
    // -----
    // - x = [4, -2, 0.5], target [1, 1, 1], default L-BFGS settings.
    //
    // Expect
    // ------
    // - Latent within 1e-4 of the target.
    fn lbfgs_step_converges_on_quadratic() {
        // Arrange
        let mut calls = 0;
        let target = image(vec![1.0, 1.0, 1.0]);
        let mut param = LatentParam::wrap(image(vec![4.0, -2.0, 0.5]));
        let mut stepper = OptimizerKind::Lbfgs.bind(&param, &Hyperparams::new()).unwrap();
        let mut closure = squared_distance(target.clone(), &mut calls);

        // Act
        stepper.step(&mut param, &mut closure).unwrap();
        drop(closure);

        // Assert
        for (x, t) in param.data().iter().zip(target.iter()) {
            assert_abs_diff_eq!(*x, *t, epsilon = 1e-4);
        }
        assert!(calls > 1);
        assert!(stepper.iterations() >= 1);
    }

    #[test]
    // Purpose
    // -------
    // Steepest descent reaches the minimizer of an isotropic quadratic in one
    // step with either line search.
    //
    // Given
    // -----
    // - x = [0, 0, 0], target [1, 1, 1], one step per line search.
    //
    // Expect
    // ------
    // - Latent within 1e-6 of the target; the line search calls the closure
    //   beyond the starting point.
    fn steepest_descent_step_moves_latent() {
        for line_search in ["MoreThuente", "HagerZhang"] {
            // Arrange
            let mut calls = 0;
            let target = image(vec![1.0, 1.0, 1.0]);
            let mut param = LatentParam::wrap(image(vec![0.0, 0.0, 0.0]));
            let hp = Hyperparams::new().with("line_search", line_search);
            let mut stepper = OptimizerKind::SteepestDescent.bind(&param, &hp).unwrap();
            let mut closure = squared_distance(target.clone(), &mut calls);

            // Act
            let loss = stepper.step(&mut param, &mut closure).unwrap();
            drop(closure);

            // Assert
            for (x, t) in param.data().iter().zip(target.iter()) {
                assert_abs_diff_eq!(*x, *t, epsilon = 1e-6);
            }
            assert!(loss.is_some());
            assert!(calls > 1, "{line_search}: {calls} closure calls");
        }
    }

    #[test]
    // Purpose
    // -------
    // The iteration counter runs on across steps, so the L-BFGS history never
    // holds more than `history_size` pairs however many steps are taken.
    //
    // Given
    // -----
    // - `history_size = 3`, `max_iter = 3`, target [1, 1, 1]; 30 steps, the
    //   latent halved between steps so every step starts away from the
    //   minimizer.
    //
    // Expect
    // ------
    // - At most 3 stored `s` and `y` pairs after every step; the iteration
    //   counter grows by at most `max_iter` per step.
    fn lbfgs_history_stays_within_history_size() {
        // Arrange
        let mut calls = 0;
        let target = image(vec![1.0, 1.0, 1.0]);
        let mut param = LatentParam::wrap(image(vec![4.0, -2.0, 0.5]));
        let hp = Hyperparams::new().with("history_size", 3usize).with("max_iter", 3usize);
        let mut stepper = OptimizerKind::Lbfgs.bind(&param, &hp).unwrap();
        let mut closure = squared_distance(target, &mut calls);

        for _ in 0..30 {
            // Act
            let before = stepper.iterations();
            stepper.step(&mut param, &mut closure).unwrap();
            let shrunk = param.read_raw() * 0.5;
            param.write_raw(shrunk).unwrap();

            // Assert
            assert!(stepper.iterations() - before <= 3);
            let ArgminSolver::LbfgsMoreThuente(lbfgs) = stepper.solver() else {
                panic!("expected L-BFGS with More-Thuente");
            };
            let json = serde_json::to_value(lbfgs).unwrap();
            assert!(json["s"].as_array().unwrap().len() <= 3);
            assert!(json["y"].as_array().unwrap().len() <= 3);
        }
        assert!(stepper.iterations() >= 30);
    }

    #[test]
    // Purpose
    // -------
    // An objective error raised inside a line search is returned unchanged,
    // also when the solver itself turns line-search failures into an exit.
    //
    // Given
    // -----
    // - Closure succeeding at the starting point and failing with
    //   `Collaborator` on every later call; L-BFGS and steepest descent.
    //
    // Expect
    // ------
    // - `step` returns the `Collaborator` error for both solvers.
    fn line_search_errors_are_returned_unchanged() {
        for kind in [OptimizerKind::Lbfgs, OptimizerKind::SteepestDescent] {
            // Arrange
            let mut param = LatentParam::wrap(image(vec![4.0, -2.0]));
            let mut stepper = kind.bind(&param, &Hyperparams::new()).unwrap();
            let mut calls = 0usize;
            let mut closure = |param: &mut LatentParam, _: GradMode| -> OptResult<Cost> {
                calls += 1;
                if calls > 1 {
                    return Err(OptError::Collaborator {
                        stage: "prior",
                        text: "boom".to_string(),
                    });
                }
                let x = param.read_raw();
                param.zero_grad();
                param.accumulate_grad(&x * 2.0)?;
                Ok(x.iter().map(|v| v * v).sum())
            };

            // Act
            let err = stepper.step(&mut param, &mut closure).unwrap_err();

            // Assert
            assert_eq!(
                err,
                OptError::Collaborator { stage: "prior", text: "boom".to_string() },
                "{kind:?}"
            );
        }
    }

    #[test]
    // Purpose
    // -------
    // At a stationary point no solver iteration runs and the latent keeps
    // its content.
    //
    // Given
    // -----
    // - x equal to the target, so the gradient is exactly zero; then a
    //   closure that never produces a gradient.
    //
    // Expect
    // ------
    // - Latent unchanged; losses 0 and 2.5 respectively.
    fn stationary_points_leave_latent_unchanged() {
        // Arrange
        let start = image(vec![1.0, 2.0]);
        let mut calls = 0;
        let mut param = LatentParam::wrap(start.clone());
        let hp = Hyperparams::new().with("line_search", "HagerZhang");
        let mut stepper = OptimizerKind::SteepestDescent.bind(&param, &hp).unwrap();
        let mut closure = squared_distance(start.clone(), &mut calls);
        let mut detached = |_: &mut LatentParam, _: GradMode| -> OptResult<Cost> { Ok(2.5) };

        // Act
        let zero_grad_loss = stepper.step(&mut param, &mut closure).unwrap();
        let detached_loss = stepper.step(&mut param, &mut detached).unwrap();

        // Assert
        assert_eq!(zero_grad_loss, Some(0.0));
        assert_eq!(detached_loss, Some(2.5));
        assert_eq!(param.read_raw(), start);
    }

    #[test]
    // Purpose
    // -------
    // A stepper refuses to step a parameter other than its own.
    //
    // Given
    // -----
    // - A stepper bound to one parameter and a second parameter.
    //
    // Expect
    // ------
    // - `OptError::ParameterNotBound`.
    fn stepper_rejects_foreign_parameter() {
        // Arrange
        let bound = LatentParam::wrap(image(vec![0.0]));
        let mut other = LatentParam::wrap(image(vec![0.0]));
        let mut stepper = OptimizerKind::GradientDescent.bind(&bound, &Hyperparams::new()).unwrap();
        let mut closure = |_: &mut LatentParam, _: GradMode| -> OptResult<Cost> { Ok(0.0) };

        // Act
        let err = stepper.step(&mut other, &mut closure).unwrap_err();

        // Assert
        assert!(matches!(err, OptError::ParameterNotBound { .. }));
    }
}
