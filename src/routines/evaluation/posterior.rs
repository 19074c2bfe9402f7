use crate::routines::design::{Cell, Design};
use crate::routines::evaluation::obs_error::{obs_likelihood, ObservationError};
use crate::routines::simulation::kinetics::KineticsEngine;
use crate::routines::simulation::solver::Trajectory;
use eyre::{ensure, Result};
use rayon::prelude::*;
use ndarray::{Array1, Array2};

/// Log-likelihood of a titre panel under the multi-exposure kinetics model
///
/// Every (group, measured strain) cell is simulated once and scored against the observed data
/// rows of each individual in the group. The data matrix must be laid out group by group, and
/// within a group strain by strain, with one row per individual.
#[derive(Debug)]
pub struct PosteriorEvaluator<T: Trajectory> {
    design: Design,
    times: Array1<f64>,
    data: Array2<f64>,
    error: ObservationError,
    engine: KineticsEngine<T>,
    parallel: bool,
}

impl<T: Trajectory> PosteriorEvaluator<T> {
    pub fn new(
        design: Design,
        times: Array1<f64>,
        data: Array2<f64>,
        error: ObservationError,
        solver: T,
    ) -> Result<Self> {
        ensure!(
            data.nrows() == design.n_rows(),
            "The data matrix has {} rows, but the design expects {} (one per individual and measured strain)",
            data.nrows(),
            design.n_rows()
        );
        ensure!(
            data.ncols() == times.len(),
            "The data matrix has {} columns, but {} time points were given",
            data.ncols(),
            times.len()
        );
        Ok(Self {
            design,
            times,
            data,
            error,
            engine: KineticsEngine::new(solver, false),
            parallel: true,
        })
    }

    /// Simulate cells in parallel (default `true`)
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Memoize solver output across evaluations (default `false`)
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.engine.set_cache(cache);
        self
    }

    pub fn design(&self) -> &Design {
        &self.design
    }

    pub fn times(&self) -> &Array1<f64> {
        &self.times
    }

    /// Total log-likelihood of the data for the parameter vector `pars`
    ///
    /// Only a parameter vector of the wrong length is an error. Infeasible parameters give a
    /// non-finite value.
    pub fn evaluate(&self, pars: &[f64]) -> Result<f64> {
        self.check_parameters(pars)?;
        let cells = self.design.cells();
        let lls: Vec<f64> = if self.parallel {
            cells
                .par_iter()
                .map(|cell| self.cell_log_likelihood(pars, cell))
                .collect()
        } else {
            cells
                .iter()
                .map(|cell| self.cell_log_likelihood(pars, cell))
                .collect()
        };
        // Summed in cell order so the result does not depend on scheduling
        let ln: f64 = lls.iter().sum();
        if !ln.is_finite() {
            tracing::debug!("Non-finite log-likelihood ({}) for parameters {:?}", ln, pars);
        }
        Ok(ln)
    }

    /// The results matrix: one simulated trajectory per cell, in [Design::cells] order
    pub fn trajectories(&self, pars: &[f64]) -> Result<Array2<f64>> {
        self.check_parameters(pars)?;
        Ok(self
            .engine
            .simulate(pars, &self.design, &self.times, self.parallel))
    }

    fn cell_log_likelihood(&self, pars: &[f64], cell: &Cell) -> f64 {
        let y = self
            .engine
            .simulate_cell(pars, &self.design, cell, &self.times);
        cell.rows(&self.design)
            .map(|row| obs_likelihood(y.view(), self.data.row(row), &self.error))
            .sum()
    }

    fn check_parameters(&self, pars: &[f64]) -> Result<()> {
        ensure!(
            pars.len() == self.design.n_parameters(),
            "Expected {} parameters, found {}",
            self.design.n_parameters(),
            pars.len()
        );
        Ok(())
    }
}
