//! solvers::config — optimizer selection and per-solver settings.
//!
//! Purpose
//! -------
//! Turn the opaque [`Hyperparams`] map into validated, typed settings for
//! each Argmin-backed solver, so that every misconfiguration is reported at
//! bind time and the step loop never sees an invalid value.
//!
//! Key behaviors
//! -------------
//! - [`OptimizerKind`] and [`LineSearcher`] parse case-insensitively.
//! - `*Config::from_hyperparams` rejects unknown keys, mistyped values and
//!   out-of-range numbers, filling in defaults for absent keys.
//!
//! Invariants & assumptions
//! ------------------------
//! - `max_iter >= 1` for every solver.
//! - Gradient-descent learning rates are finite and strictly positive.
//! - L-BFGS tolerances, when present, are finite and strictly positive;
//!   `history_size >= 1`.
use std::str::FromStr;

use crate::optimization::{
    errors::{OptError, OptResult},
    restore_optimizer::{
        types::{DEFAULT_LBFGS_INNER_ITERS, DEFAULT_LBFGS_MEM, DEFAULT_LEARNING_RATE},
        validation::{verify_learning_rate, verify_tol_cost, verify_tol_grad},
    },
    solvers::hyperparams::Hyperparams,
};

/// Argmin-backed optimizer family.
///
/// - `GradientDescent`: fixed-step descent (Argmin `Landweber`).
/// - `SteepestDescent`: descent along `-∇L` with a line search.
/// - `Lbfgs`: limited-memory BFGS with a line search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizerKind {
    #[default]
    GradientDescent,
    SteepestDescent,
    Lbfgs,
}

impl FromStr for OptimizerKind {
    type Err = OptError;

    /// Parse an optimizer name (case-insensitive, `_`/`-` ignored).
    ///
    /// Accepts `"GradientDescent"` (also `"gd"`, `"sgd"`, `"landweber"`),
    /// `"SteepestDescent"` and `"LBFGS"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s.chars().filter(|c| *c != '_' && *c != '-').collect();
        match key.to_lowercase().as_str() {
            "gradientdescent" | "gd" | "sgd" | "landweber" => Ok(OptimizerKind::GradientDescent),
            "steepestdescent" => Ok(OptimizerKind::SteepestDescent),
            "lbfgs" => Ok(OptimizerKind::Lbfgs),
            _ => Err(OptError::InvalidOptimizer {
                name: s.to_string(),
                reason: "Valid options are 'GradientDescent', 'SteepestDescent' or 'LBFGS'.",
            }),
        }
    }
}

/// Line search used by steepest descent and L-BFGS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineSearcher {
    #[default]
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    /// Parse a line-search choice from a string (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Fixed-step gradient descent settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientDescentConfig {
    pub lr: f64,
    pub max_iter: usize,
}

impl GradientDescentConfig {
    pub const KEYS: [&'static str; 2] = ["lr", "max_iter"];

    /// # Errors
    /// - [`OptError::UnknownHyperparameter`] for keys other than `lr`, `max_iter`.
    /// - [`OptError::InvalidLearningRate`] / [`OptError::InvalidMaxIter`].
    pub fn from_hyperparams(hp: &Hyperparams) -> OptResult<Self> {
        hp.ensure_known("gradient_descent", &Self::KEYS)?;
        let lr = hp.get_f64("lr")?.unwrap_or(DEFAULT_LEARNING_RATE);
        verify_learning_rate(lr)?;
        let max_iter = parse_max_iter(hp, 1)?;
        Ok(Self { lr, max_iter })
    }
}

/// Steepest descent settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteepestDescentConfig {
    pub line_search: LineSearcher,
    pub max_iter: usize,
}

impl SteepestDescentConfig {
    pub const KEYS: [&'static str; 2] = ["line_search", "max_iter"];

    pub fn from_hyperparams(hp: &Hyperparams) -> OptResult<Self> {
        hp.ensure_known("steepest_descent", &Self::KEYS)?;
        let line_search = parse_line_search(hp)?;
        let max_iter = parse_max_iter(hp, 1)?;
        Ok(Self { line_search, max_iter })
    }
}

/// L-BFGS settings.
///
/// `tol_grad` / `tol_cost` are forwarded to Argmin only when present;
/// otherwise Argmin's defaults apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LbfgsConfig {
    pub line_search: LineSearcher,
    pub history_size: usize,
    pub max_iter: usize,
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
}

impl LbfgsConfig {
    pub const KEYS: [&'static str; 5] =
        ["line_search", "history_size", "max_iter", "tol_grad", "tol_cost"];

    /// # Errors
    /// - [`OptError::UnknownHyperparameter`] for unsupported keys.
    /// - [`OptError::InvalidLineSearch`], [`OptError::InvalidLBFGSMem`],
    ///   [`OptError::InvalidMaxIter`], [`OptError::InvalidTolGrad`],
    ///   [`OptError::InvalidTolCost`].
    pub fn from_hyperparams(hp: &Hyperparams) -> OptResult<Self> {
        hp.ensure_known("lbfgs", &Self::KEYS)?;
        let line_search = parse_line_search(hp)?;
        let history_size = hp.get_usize("history_size")?.unwrap_or(DEFAULT_LBFGS_MEM);
        if history_size == 0 {
            return Err(OptError::InvalidLBFGSMem {
                mem: history_size,
                reason: "History size must be at least 1.",
            });
        }
        let max_iter = parse_max_iter(hp, DEFAULT_LBFGS_INNER_ITERS)?;
        let tol_grad = hp.get_f64("tol_grad")?;
        verify_tol_grad(tol_grad)?;
        let tol_cost = hp.get_f64("tol_cost")?;
        verify_tol_cost(tol_cost)?;
        Ok(Self { line_search, history_size, max_iter, tol_grad, tol_cost })
    }
}

fn parse_line_search(hp: &Hyperparams) -> OptResult<LineSearcher> {
    match hp.get_str("line_search")? {
        Some(name) => name.parse(),
        None => Ok(LineSearcher::default()),
    }
}

fn parse_max_iter(hp: &Hyperparams, default: usize) -> OptResult<usize> {
    let max_iter = hp.get_usize("max_iter")?.unwrap_or(default);
    if max_iter == 0 {
        return Err(OptError::InvalidMaxIter {
            max_iter,
            reason: "At least one inner iteration is required per step.",
        });
    }
    Ok(max_iter)
}
