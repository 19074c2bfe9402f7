use crate::prelude::*;
use crate::routines::settings::Settings;

use eyre::{Result, WrapErr};
use ndarray::{Array1, Array2, ArrayView1};
use std::path::Path;
use std::time::Instant;

/// Probability of observing `observed` when the true titre is `believed`
pub fn evaluate_observation_probability(
    believed: i64,
    observed: i64,
    s: f64,
    ea: f64,
    max_titre: i64,
) -> f64 {
    obs_error(believed, observed, s, ea, max_titre)
}

/// Log-likelihood of one observed titre vector given believed titres
///
/// `params` holds the observation error parameters as `[S, EA, MAX_TITRE]`. They are used as
/// given, without validation. `believed` and `observed` must have the same length.
pub fn evaluate_sequence_log_likelihood(believed: &[f64], observed: &[f64], params: [f64; 3]) -> f64 {
    let error = ObservationError {
        s: params[0],
        ea: params[1],
        max_titre: params[2] as i64,
    };
    obs_likelihood(ArrayView1::from(believed), ArrayView1::from(observed), &error)
}

/// Log-likelihood of the full dataset for the parameter vector `pars`
///
/// The design is resolved on every call; samplers evaluating many parameter vectors should
/// build a [PosteriorEvaluator] once instead.
pub fn evaluate_posterior<T: Trajectory>(
    pars: &[f64],
    times: &Array1<f64>,
    design: &FlatDesign,
    data: &Array2<f64>,
    error: ObservationError,
    solver: T,
) -> Result<f64> {
    let design = Design::resolve(design, pars.len())?;
    let evaluator = PosteriorEvaluator::new(design, times.clone(), data.clone(), error, solver)?;
    evaluator.evaluate(pars)
}

/// Evaluate the log-likelihood of the data referred to by a settings file
///
/// Sets up logging, reads the titre matrix and evaluates `pars`. When `paths.output` is
/// configured, the simulated trajectories are written there together with a `settings.json`
/// in the same folder.
pub fn evaluate<T: Trajectory>(
    settings: Settings,
    design: &FlatDesign,
    times: Array1<f64>,
    pars: &[f64],
    solver: T,
) -> Result<f64> {
    let now = Instant::now();
    logger::setup_log(&settings)?;
    tracing::info!("Starting likelihood evaluation");

    let data = datafile::read_titres(&settings.paths.data)?;
    let design = Design::resolve(design, pars.len()).wrap_err("Unable to resolve the design")?;
    tracing::info!(
        "Design contains {} groups measured against {} strains",
        design.groups().len(),
        design.strains().len()
    );

    let evaluator = PosteriorEvaluator::new(design, times, data, settings.error, solver)?
        .with_parallel(settings.config.parallel)
        .with_cache(settings.config.cache);
    let ln = evaluator.evaluate(pars)?;
    tracing::info!("Log-likelihood: {:.4}", ln);

    if let Some(output) = &settings.paths.output {
        let results = evaluator.trajectories(pars)?;
        output::write_trajectories(output, evaluator.design(), evaluator.times(), &results)?;
        let folder = Path::new(output).parent().unwrap_or_else(|| Path::new(""));
        settings.write(folder.join("settings.json"))?;
    }

    tracing::info!("Evaluation complete after {:.2?}", now.elapsed());
    Ok(ln)
}
