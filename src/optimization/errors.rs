use argmin::core::{ArgminError, Error};
use ndarray::ShapeError;

/// Crate-wide result alias for restoration operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Gradient ----
    /// The collaborator has no analytic gradient; its term is detached.
    GradientNotImplemented,

    /// Gradient shape does not match the latent shape.
    GradientShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// Gradient elements need to be finite.
    InvalidGradient {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    /// `backward` was called on a loss that carries no gradient.
    DetachedLoss,

    // ---- Latent parameter ----
    /// Replacement content does not match the latent shape.
    LatentShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// Flat parameter vector length does not match the latent size.
    FlatLengthMismatch {
        expected: usize,
        found: usize,
    },

    /// The optimizer was handed a parameter it was not bound to.
    ParameterNotBound {
        expected: u64,
        found: u64,
    },

    /// Wrapper for ndarray shape errors.
    InvalidShape {
        text: String,
    },

    // ---- RestoreOptions ----
    /// Prior weight needs to be finite.
    InvalidPriorWeight {
        value: f64,
        reason: &'static str,
    },

    /// Unknown optimizer name.
    InvalidOptimizer {
        name: String,
        reason: &'static str,
    },

    /// Hyperparameter key not understood by the selected optimizer.
    UnknownHyperparameter {
        optimizer: &'static str,
        name: String,
    },

    /// Hyperparameter present but unusable.
    InvalidHyperparameter {
        name: String,
        value: String,
        reason: &'static str,
    },

    /// Gradient tolerance needs to be positive and finite.
    InvalidTolGrad {
        tol: f64,
        reason: &'static str,
    },
    /// Cost change tolerance needs to be positive and finite.
    InvalidTolCost {
        tol: f64,
        reason: &'static str,
    },
    /// Inner iteration count needs to be positive.
    InvalidMaxIter {
        max_iter: usize,
        reason: &'static str,
    },
    /// Learning rate needs to be positive and finite.
    InvalidLearningRate {
        lr: f64,
        reason: &'static str,
    },

    /// Invalid line searcher name.
    InvalidLineSearch {
        name: String,
        reason: &'static str,
    },

    /// history_size needs to be at least 1.
    InvalidLBFGSMem {
        mem: usize,
        reason: &'static str,
    },

    // ---- Objective ----
    /// Objective returned a non-finite value.
    NonFiniteCost {
        value: f64,
    },

    /// Failure reported by a degradation, prior or projection collaborator.
    Collaborator {
        stage: &'static str,
        text: String,
    },

    // ---- Argmin ----
    /// Wrapper for argmin::InvalidParameter
    InvalidParameter {
        text: String,
    },
    /// Wrapper for argmin::NotImplemented
    NotImplemented {
        text: String,
    },
    /// Wrapper for argmin::NotInitialized
    NotInitialized {
        text: String,
    },
    /// Wrapper for argmin::ConditionViolated
    ConditionViolated {
        text: String,
    },
    /// Wrapper for argmin::CheckpointNotFound
    CheckPointNotFound {
        text: String,
    },
    /// Wrapper for argmin::PotentialBug
    PotentialBug {
        text: String,
    },
    /// Wrapper for argmin::ImpossibleError
    ImpossibleError {
        text: String,
    },
    /// Wrapper for other argmin::Error types
    BackendError {
        text: String,
    },

    // ---- Fallback ----
    UnknownError,
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Gradient ----
            OptError::GradientNotImplemented => {
                write!(f, "Gradient not implemented")
            }
            OptError::GradientShapeMismatch { expected, found } => {
                write!(f, "Gradient shape mismatch: expected {expected:?}, found {found:?}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Invalid gradient at index {index}: {value}: {reason}")
            }
            OptError::DetachedLoss => {
                write!(f, "Loss carries no gradient; backward is not possible")
            }

            // ---- Latent parameter ----
            OptError::LatentShapeMismatch { expected, found } => {
                write!(f, "Latent shape mismatch: expected {expected:?}, found {found:?}")
            }
            OptError::FlatLengthMismatch { expected, found } => {
                write!(f, "Flat parameter length mismatch: expected {expected}, found {found}")
            }
            OptError::ParameterNotBound { expected, found } => {
                write!(
                    f,
                    "Optimizer is bound to parameter #{expected}, but was handed parameter #{found}"
                )
            }
            OptError::InvalidShape { text } => {
                write!(f, "Invalid shape: {text}")
            }

            // ---- RestoreOptions ----
            OptError::InvalidPriorWeight { value, reason } => {
                write!(f, "Invalid prior weight {value}: {reason}")
            }
            OptError::InvalidOptimizer { name, reason } => {
                write!(f, "Invalid optimizer '{name}': {reason}")
            }
            OptError::UnknownHyperparameter { optimizer, name } => {
                write!(f, "Unknown hyperparameter '{name}' for optimizer {optimizer}")
            }
            OptError::InvalidHyperparameter { name, value, reason } => {
                write!(f, "Invalid hyperparameter {name} = {value}: {reason}")
            }
            OptError::InvalidTolGrad { tol, reason } => {
                write!(f, "Invalid gradient tolerance {tol}: {reason}")
            }
            OptError::InvalidTolCost { tol, reason } => {
                write!(f, "Invalid cost function change tolerance {tol}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OptError::InvalidLearningRate { lr, reason } => {
                write!(f, "Invalid learning rate {lr}: {reason}")
            }
            OptError::InvalidLineSearch { name, reason } => {
                write!(f, "Invalid line searcher '{name}': {reason}")
            }
            OptError::InvalidLBFGSMem { mem, reason } => {
                write!(f, "Invalid L-BFGS memory {mem}: {reason}")
            }

            // ---- Objective ----
            OptError::NonFiniteCost { value } => {
                write!(f, "Non-finite cost value: {value}")
            }
            OptError::Collaborator { stage, text } => {
                write!(f, "{stage} failed: {text}")
            }

            // ---- Argmin ----
            OptError::InvalidParameter { text } => {
                write!(f, "Invalid parameter: {text}")
            }
            OptError::NotImplemented { text } => {
                write!(f, "Not implemented: {text}")
            }
            OptError::NotInitialized { text } => {
                write!(f, "Not initialized: {text}")
            }
            OptError::ConditionViolated { text } => {
                write!(f, "Condition violated: {text}")
            }
            OptError::CheckPointNotFound { text } => {
                write!(f, "Checkpoint not found: {text}")
            }
            OptError::PotentialBug { text } => {
                write!(f, "Potential bug: {text}")
            }
            OptError::ImpossibleError { text } => {
                write!(f, "Impossible error: {text}")
            }
            OptError::BackendError { text } => {
                write!(f, "Backend error: {text}")
            }

            // ---- Fallback ----
            OptError::UnknownError => {
                write!(f, "Unknown error")
            }
        }
    }
}

/// Map Argmin errors to `OptError`. An `OptError` raised inside the
/// objective closure is recovered unchanged.
impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        let original_err = match original_err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(argmin_err) => match argmin_err {
                ArgminError::InvalidParameter { text } => OptError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => OptError::NotImplemented { text },
                ArgminError::NotInitialized { text } => OptError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => OptError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => OptError::CheckPointNotFound { text },
                ArgminError::PotentialBug { text } => OptError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => OptError::ImpossibleError { text },
                _ => OptError::UnknownError,
            },
            Err(err) => OptError::BackendError { text: err.to_string() },
        }
    }
}

impl From<ShapeError> for OptError {
    fn from(err: ShapeError) -> Self {
        OptError::InvalidShape { text: err.to_string() }
    }
}
