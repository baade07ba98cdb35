//! latent_restore — image restoration by projected optimization.
//!
//! Purpose
//! -------
//! Recover a latent image batch from a degraded observation by minimizing a
//! data-fidelity term plus a weighted prior with an off-the-shelf numeric
//! optimizer, projecting the estimate back onto its feasible domain after
//! every optimizer step.
//!
//! Key behaviors
//! -------------
//! - Re-export the optimization layer (`optimization`) as the public crate
//!   surface.
//! - Collaborators (degradation model, prior, projection) are user traits;
//!   the crate owns only the loop, the objective assembly and the optimizer
//!   plumbing.
//!
//! Invariants & assumptions
//! ------------------------
//! - Images are 4-D `ndarray` batches `[B, C, H, W]` of `f64`.
//! - Runs are sequential and deterministic given deterministic collaborators.
//!
//! Downstream usage
//! ----------------
//! ```ignore
//! use latent_restore::optimization::prelude::*;
//!
//! let options = RestoreOptions::new(50, 0.1, Hyperparams::new().with("lr", 0.05))?;
//! let gd = OptimizerKind::GradientDescent;
//! let restorer = ImageRestorer::new(blur, tv_prior, clip01, gd, options);
//! let restored = restorer.restore(&observation)?;
//! ```

pub mod optimization;
