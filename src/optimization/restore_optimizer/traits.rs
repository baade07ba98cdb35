//! Public API surface for optimization-based restoration.
//!
//! - [`Degradation`], [`Prior`], [`Projection`]: collaborators users implement.
//! - [`Optimizer`] and [`StepOptimizer`]: the bind/step contract a numeric
//!   optimizer satisfies.
//! - [`RestoreOptions`]: construction-time configuration.
//! - [`RestoreOutcome`]: normalized result of a restore call.
//!
//! Convention: the restorer *minimizes*
//! `L(x) = fidelity(x, y) + prior_weight * prior(x)`. Analytic gradients are
//! optional; a collaborator that does not provide one contributes a detached
//! term.
use crate::optimization::{
    errors::{OptError, OptResult},
    restore_optimizer::{
        closure::ObjectiveClosure,
        parameter::{LatentParam, ParamId},
        types::{Cost, DEFAULT_NUM_STEPS, Grad, Image},
        validation::verify_prior_weight,
    },
    solvers::hyperparams::Hyperparams,
};

/// Degradation / likelihood model.
///
/// Required:
/// - `init_latent_images(&Image) -> OptResult<Image>`: initial latent guess
///   for an observation. The latent shape may differ from the observation's.
/// - `fidelity(&Image, &Image) -> OptResult<Cost>`: data-consistency score of
///   a latent estimate against the observation.
///
/// Optional:
/// - `fidelity_grad(&Image, &Image) -> OptResult<Grad>`: gradient of the
///   fidelity with respect to the latent. The default returns
///   `OptError::GradientNotImplemented`, which detaches the term.
pub trait Degradation {
    fn init_latent_images(&self, observation: &Image) -> OptResult<Image>;
    fn fidelity(&self, latent: &Image, observation: &Image) -> OptResult<Cost>;

    fn fidelity_grad(&self, _latent: &Image, _observation: &Image) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Scalar regularizer over a latent estimate.
///
/// `grad` defaults to `OptError::GradientNotImplemented` (detached term).
pub trait Prior {
    fn value(&self, latent: &Image) -> OptResult<Cost>;

    fn grad(&self, _latent: &Image) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Map a latent estimate back into its feasible domain. Need not be
/// differentiable; the output must keep the input shape.
pub trait Projection {
    fn project(&self, raw: Image) -> OptResult<Image>;
}

impl<F> Projection for F
where
    F: Fn(Image) -> OptResult<Image>,
{
    fn project(&self, raw: Image) -> OptResult<Image> {
        self(raw)
    }
}

/// A numeric optimizer before it is bound to a parameter.
///
/// `bind` is called exactly once per restore call. Any hyperparameter problem
/// must surface here, not inside the loop.
pub trait Optimizer {
    type Bound: StepOptimizer;

    fn bind(&self, param: &LatentParam, hyperparams: &Hyperparams) -> OptResult<Self::Bound>;
}

/// An optimizer bound to one latent parameter.
///
/// `step` performs one logical update, calling `closure` as many times as the
/// algorithm needs, and updates `param` in place. It returns the loss of the
/// last closure call, or `None` if the closure was never called.
///
/// `set_verbose` is a hook for optimizers that can report their inner
/// iterations; the default ignores it.
pub trait StepOptimizer {
    fn param_id(&self) -> ParamId;

    fn set_verbose(&mut self, _verbose: bool) {}

    fn step(
        &mut self, param: &mut LatentParam, closure: &mut dyn ObjectiveClosure,
    ) -> OptResult<Option<Cost>>;
}

/// Whether a closure call should produce gradients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradMode {
    Enabled,
    Disabled,
}

impl GradMode {
    pub fn is_enabled(self) -> bool {
        matches!(self, GradMode::Enabled)
    }
}

/// What to do when neither objective term provides an analytic gradient.
///
/// - `Skip`: the loss is detached; backpropagation is skipped and the
///   optimizer sees a zero gradient.
/// - `FiniteDifference`: attach a finite-difference gradient of the whole
///   objective. Costs `O(n)` objective evaluations per gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradientFallback {
    #[default]
    Skip,
    FiniteDifference,
}

/// Restorer configuration.
///
/// Fields:
/// - `num_steps` — number of optimizer steps (each followed by a projection).
/// - `prior_weight` — scale of the prior term; any finite value.
/// - `hyperparams` — passed unmodified to [`Optimizer::bind`].
/// - `gradient_fallback` — see [`GradientFallback`].
/// - `track_objective` — record the objective on the projected estimate after
///   every step (one extra, gradient-free evaluation per step).
/// - `verbose` — log the initial objective at `info` level and, with the
///   `obs_slog` feature, attach a slog observer to Argmin-backed solvers.
///
/// Default: 100 steps, prior weight 1.0, no hyperparameters, `Skip`, no
/// tracking, quiet.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreOptions {
    pub num_steps: usize,
    pub prior_weight: f64,
    pub hyperparams: Hyperparams,
    pub gradient_fallback: GradientFallback,
    pub track_objective: bool,
    pub verbose: bool,
}

impl RestoreOptions {
    /// Create validated options.
    ///
    /// # Errors
    /// - [`OptError::InvalidPriorWeight`] if `prior_weight` is not finite.
    pub fn new(num_steps: usize, prior_weight: f64, hyperparams: Hyperparams) -> OptResult<Self> {
        verify_prior_weight(prior_weight)?;
        Ok(Self {
            num_steps,
            prior_weight,
            hyperparams,
            gradient_fallback: GradientFallback::Skip,
            track_objective: false,
            verbose: false,
        })
    }

    pub fn with_gradient_fallback(mut self, fallback: GradientFallback) -> Self {
        self.gradient_fallback = fallback;
        self
    }

    pub fn with_objective_tracking(mut self, track: bool) -> Self {
        self.track_objective = track;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            num_steps: DEFAULT_NUM_STEPS,
            prior_weight: 1.0,
            hyperparams: Hyperparams::new(),
            gradient_fallback: GradientFallback::Skip,
            track_objective: false,
            verbose: false,
        }
    }
}

/// Canonical result returned by `restore_with_outcome`.
///
/// - `restored`: final latent content (projected after the last step).
/// - `steps`: number of optimizer steps performed.
/// - `closure_evals`: total objective closure calls across all steps.
/// - `step_losses`: loss of the last closure call in each step (`None` when a
///   step never called the closure).
/// - `objective_trace`: objective on the projected estimate after each step;
///   empty unless objective tracking was enabled.
/// - `grad_norm`: L2 norm of the last accumulated gradient, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreOutcome {
    pub restored: Image,
    pub steps: usize,
    pub closure_evals: usize,
    pub step_losses: Vec<Option<Cost>>,
    pub objective_trace: Vec<Cost>,
    pub grad_norm: Option<f64>,
}

impl RestoreOutcome {
    /// Build an outcome from the final latent parameter. The restored content
    /// is returned as is, non-finite elements included.
    pub fn new(
        latent: LatentParam, steps: usize, closure_evals: usize, step_losses: Vec<Option<Cost>>,
        objective_trace: Vec<Cost>,
    ) -> Self {
        let grad_norm = latent.grad().map(|g| g.iter().map(|v| v * v).sum::<f64>().sqrt());
        let restored = latent.into_raw();
        Self { restored, steps, closure_evals, step_losses, objective_trace, grad_norm }
    }
}
