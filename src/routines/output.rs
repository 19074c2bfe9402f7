use crate::routines::design::Design;
use csv::WriterBuilder;
use eyre::{ensure, Result, WrapErr};
use ndarray::{Array1, Array2};
use serde_derive::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct TrajectoryRow {
    group: usize,
    strain: usize,
    time: f64,
    titre: f64,
}

/// Write the simulated trajectories, one line per (group, strain, time)
///
/// `results` is the matrix returned by
/// [PosteriorEvaluator::trajectories](crate::routines::evaluation::posterior::PosteriorEvaluator::trajectories).
pub fn write_trajectories(
    path: impl AsRef<Path>,
    design: &Design,
    times: &Array1<f64>,
    results: &Array2<f64>,
) -> Result<()> {
    let path = path.as_ref();
    ensure!(
        results.dim() == (design.cells().len(), times.len()),
        "Expected a {}x{} results matrix, found {:?}",
        design.cells().len(),
        times.len(),
        results.dim()
    );
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .wrap_err_with(|| format!("Unable to create {}", path.display()))?;

    for (cell, row) in design.cells().iter().zip(results.rows()) {
        let group = design.groups()[cell.group].id;
        for (&time, &titre) in times.iter().zip(row.iter()) {
            writer.serialize(TrajectoryRow {
                group,
                strain: cell.strain.id(),
                time,
                titre,
            })?;
        }
    }
    writer.flush()?;
    tracing::info!("Trajectories written to {}", path.display());
    Ok(())
}
