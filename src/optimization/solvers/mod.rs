//! solvers — Argmin-backed optimizers for the restore loop.
//!
//! Purpose
//! -------
//! Provide the concrete optimizers behind [`OptimizerKind`]: fixed-step
//! gradient descent, steepest descent with a line search, and L-BFGS. The
//! crate defines no update rules of its own; every update comes from an
//! Argmin solver driven one restore step at a time.
//!
//! Key behaviors
//! -------------
//! - [`hyperparams`] holds the opaque key/value map forwarded by the
//!   restorer.
//! - [`config`] parses it into validated per-solver settings.
//! - [`builders`] construct configured Argmin solvers.
//! - [`adapter`] exposes the latent parameter and the objective closure as
//!   an Argmin problem.
//! - [`stepper`] implements `StepOptimizer` by driving a solver for a bounded
//!   number of inner iterations per step.
//!
//! Conventions
//! -----------
//! - `OptimizerKind::bind` is the only place hyperparameters are read; any
//!   misconfiguration fails there, before the first step.
//! - Line search defaults to More–Thuente.
pub mod adapter;
pub mod builders;
pub mod config;
pub mod hyperparams;
pub mod stepper;

pub use self::{
    config::{
        GradientDescentConfig, LbfgsConfig, LineSearcher, OptimizerKind, SteepestDescentConfig,
    },
    hyperparams::{HyperValue, Hyperparams},
    stepper::{ArgminSolver, ArgminStepper},
};

use crate::optimization::{
    errors::OptResult,
    restore_optimizer::{parameter::LatentParam, traits::Optimizer},
    solvers::builders::{
        build_gradient_descent, build_lbfgs_hager_zhang, build_lbfgs_more_thuente,
        build_steepest_hager_zhang, build_steepest_more_thuente,
    },
};

impl Optimizer for OptimizerKind {
    type Bound = ArgminStepper;

    fn bind(&self, param: &LatentParam, hyperparams: &Hyperparams) -> OptResult<ArgminStepper> {
        let (solver, max_iter) = match self {
            OptimizerKind::GradientDescent => {
                let config = GradientDescentConfig::from_hyperparams(hyperparams)?;
                (ArgminSolver::GradientDescent(build_gradient_descent(&config)), config.max_iter)
            }
            OptimizerKind::SteepestDescent => {
                let config = SteepestDescentConfig::from_hyperparams(hyperparams)?;
                let solver = match config.line_search {
                    LineSearcher::HagerZhang => {
                        ArgminSolver::SteepestHagerZhang(build_steepest_hager_zhang())
                    }
                    LineSearcher::MoreThuente => {
                        ArgminSolver::SteepestMoreThuente(build_steepest_more_thuente())
                    }
                };
                (solver, config.max_iter)
            }
            OptimizerKind::Lbfgs => {
                let config = LbfgsConfig::from_hyperparams(hyperparams)?;
                let solver = match config.line_search {
                    LineSearcher::HagerZhang => {
                        ArgminSolver::LbfgsHagerZhang(build_lbfgs_hager_zhang(&config)?)
                    }
                    LineSearcher::MoreThuente => {
                        ArgminSolver::LbfgsMoreThuente(build_lbfgs_more_thuente(&config)?)
                    }
                };
                (solver, config.max_iter)
            }
        };
        Ok(ArgminStepper::new(param, solver, max_iter))
    }
}

pub mod prelude {
    pub use super::{
        ArgminStepper, HyperValue, Hyperparams, LineSearcher, OptimizerKind,
    };
}
