//! restore_optimizer::run — the projected optimization loop.
//!
//! `UNINITIALIZED → (STEP i → PROJECT i) × num_steps → DONE`
//!
//! [`run_restore`] builds the initial estimate, wraps it as the single
//! latent parameter, binds the optimizer once, then alternates one optimizer
//! step with one projection. The projection runs on raw content, outside
//! gradient tracking, and its output is written back in place so the bound
//! optimizer keeps referring to the same parameter.
use crate::optimization::{
    errors::OptResult,
    restore_optimizer::{
        closure::{RestoreClosure, perform_step},
        objective::Objective,
        parameter::LatentParam,
        traits::{
            Degradation, Optimizer, Prior, Projection, RestoreOptions, RestoreOutcome,
            StepOptimizer,
        },
        types::Image,
    },
};

/// Run `opts.num_steps` projected optimizer steps from the degradation's
/// initial estimate and return the final estimate with diagnostics.
///
/// With `num_steps == 0` the initial estimate is returned as is; the
/// projection is never applied.
///
/// # Errors
/// Any error from initialization, binding, a step, or a projection aborts
/// the run; no partial estimate is returned.
pub fn run_restore<D, P, J, O>(
    degradation: &D, prior: &P, projection: &J, optimizer: &O, opts: &RestoreOptions,
    observation: &Image,
) -> OptResult<RestoreOutcome>
where
    D: Degradation,
    P: Prior,
    J: Projection + ?Sized,
    O: Optimizer + ?Sized,
{
    let init = degradation.init_latent_images(observation)?;
    let mut latent = LatentParam::wrap(init);
    let mut bound = optimizer.bind(&latent, &opts.hyperparams)?;
    bound.set_verbose(opts.verbose);

    let objective = Objective::new(degradation, prior, opts.prior_weight, opts.gradient_fallback);
    if opts.verbose {
        log_initial_state(&objective, &latent, observation)?;
    }
    let mut closure = RestoreClosure::new(&objective, observation);

    let mut step_losses = Vec::with_capacity(opts.num_steps);
    let mut objective_trace = Vec::new();
    for step in 0..opts.num_steps {
        let loss = perform_step(&mut bound, &mut latent, &mut closure)?;
        let projected = projection.project(latent.read_raw())?;
        latent.write_raw(projected)?;
        step_losses.push(loss);

        if opts.track_objective {
            let value = objective.value(latent.data(), observation)?;
            objective_trace.push(value);
            log::debug!(
                "step {}/{}: loss {:?}, objective {:.6e}",
                step + 1,
                opts.num_steps,
                loss,
                value
            );
        } else {
            log::debug!("step {}/{}: loss {:?}", step + 1, opts.num_steps, loss);
        }
    }

    Ok(RestoreOutcome::new(latent, opts.num_steps, closure.evals(), step_losses, objective_trace))
}

fn log_initial_state<D, P>(
    objective: &Objective<'_, D, P>, latent: &LatentParam, observation: &Image,
) -> OptResult<()>
where
    D: Degradation,
    P: Prior,
{
    let value = objective.value(latent.data(), observation)?;
    log::info!(
        "init: objective = {:.6}, latent shape = {:?}, prior weight = {}",
        value,
        latent.shape(),
        objective.prior_weight()
    );
    Ok(())
}
