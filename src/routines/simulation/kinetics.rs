use crate::routines::design::{Cell, Design, Exposure};
use crate::routines::simulation::solver::{ExposureParameters, Trajectory};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lazy_static::lazy_static;
use ndarray::parallel::prelude::*;
use ndarray::{Array1, Array2, Axis};
use std::hash::{Hash, Hasher};

const CACHE_SIZE: usize = 1000000;

#[derive(Clone, Debug)]
struct CacheKey {
    parameters: Vec<f64>,
    times: Vec<f64>,
}

// Compared bitwise, like the hash, so keys holding NaN still find themselves
impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        fn same_bits(a: &[f64], b: &[f64]) -> bool {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
        }
        same_bits(&self.parameters, &other.parameters) && same_bits(&self.times, &other.times)
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for value in self.parameters.iter().chain(&self.times) {
            value.to_bits().hash(state);
        }
        self.parameters.len().hash(state);
    }
}

lazy_static! {
    static ref TRAJECTORY_CACHE: DashMap<CacheKey, Array1<f64>> =
        DashMap::with_capacity(CACHE_SIZE);
}

/// Remove every cached trajectory
pub fn clear_cache() {
    TRAJECTORY_CACHE.clear();
}

/// Simulates exposures and superimposes their trajectories per (group, strain) cell
#[derive(Debug, Clone)]
pub struct KineticsEngine<T: Trajectory> {
    solver: T,
    cache: bool,
}

impl<T: Trajectory> KineticsEngine<T> {
    /// Create an engine around `solver`
    ///
    /// The trajectory cache is shared by the whole process and keyed only on the solver inputs,
    /// so it must not be enabled for two different solvers at once.
    pub fn new(solver: T, cache: bool) -> Self {
        Self { solver, cache }
    }

    pub fn set_cache(&mut self, cache: bool) {
        self.cache = cache;
    }

    pub fn solver(&self) -> &T {
        &self.solver
    }

    /// Assemble the solver input for one exposure measured against one strain
    pub fn assemble(
        pars: &[f64],
        design: &Design,
        exposure: &Exposure,
        cross_reactivity: usize,
    ) -> ExposureParameters {
        let kinetics: Vec<f64> = design
            .kinetics(exposure.kind)
            .iter()
            .map(|&i| pars[i])
            .collect();
        ExposureParameters::new(
            &kinetics,
            exposure.primed,
            pars[exposure.modifier_index],
            pars[cross_reactivity],
            pars[exposure.time_index],
        )
    }

    /// Solve a single exposure, going through the cache when enabled
    pub fn trajectory(&self, parameters: &ExposureParameters, times: &Array1<f64>) -> Array1<f64> {
        if !self.cache {
            return self.solve(parameters, times);
        }
        let key = CacheKey {
            parameters: parameters.values().to_vec(),
            times: times.to_vec(),
        };
        if TRAJECTORY_CACHE.len() >= CACHE_SIZE {
            if let Some(hit) = TRAJECTORY_CACHE.get(&key) {
                return hit.clone();
            }
            return self.solve(parameters, times);
        }
        match TRAJECTORY_CACHE.entry(key) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let y = self.solve(parameters, times);
                entry.insert(y.clone());
                y
            }
        }
    }

    fn solve(&self, parameters: &ExposureParameters, times: &Array1<f64>) -> Array1<f64> {
        let y = self.solver.solve(parameters, times);
        assert_eq!(
            y.len(),
            times.len(),
            "The trajectory solver returned {} values for {} time points",
            y.len(),
            times.len()
        );
        y
    }

    /// Sum of the trajectories of every exposure in the cell's group, against the cell's strain
    pub fn simulate_cell(
        &self,
        pars: &[f64],
        design: &Design,
        cell: &Cell,
        times: &Array1<f64>,
    ) -> Array1<f64> {
        let group = &design.groups()[cell.group];
        let mut y = Array1::<f64>::zeros(times.len());
        for (exposure, &cr) in group.exposures.iter().zip(&cell.cross_reactivity) {
            let parameters = Self::assemble(pars, design, exposure, cr);
            y += &self.trajectory(&parameters, times);
        }
        y
    }

    /// The results matrix, one row per cell in [Design::cells] order
    pub fn simulate(
        &self,
        pars: &[f64],
        design: &Design,
        times: &Array1<f64>,
        parallel: bool,
    ) -> Array2<f64> {
        let mut results = Array2::<f64>::zeros((design.cells().len(), times.len()));
        if parallel {
            results
                .axis_iter_mut(Axis(0))
                .into_par_iter()
                .zip(design.cells().par_iter())
                .for_each(|(mut row, cell)| {
                    row.assign(&self.simulate_cell(pars, design, cell, times));
                });
        } else {
            for (mut row, cell) in results.axis_iter_mut(Axis(0)).zip(design.cells()) {
                row.assign(&self.simulate_cell(pars, design, cell, times));
            }
        }
        results
    }
}
