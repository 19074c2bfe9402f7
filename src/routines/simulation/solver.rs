use ndarray::Array1;

/// Number of exposure-specific scalars appended after the kinetics parameters
pub const N_EXPOSURE_TERMS: usize = 4;

/// Parameters for simulating a single exposure against a single measured strain
///
/// The values are stored as one flat vector: the kinetics parameters of the exposure type,
/// followed by the primed flag, the order modifier, the cross-reactivity and the infection time.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureParameters {
    values: Vec<f64>,
}

impl ExposureParameters {
    pub fn new(
        kinetics: &[f64],
        primed: f64,
        modifier: f64,
        cross_reactivity: f64,
        infection_time: f64,
    ) -> Self {
        let mut values = Vec::with_capacity(kinetics.len() + N_EXPOSURE_TERMS);
        values.extend_from_slice(kinetics);
        values.extend_from_slice(&[primed, modifier, cross_reactivity, infection_time]);
        ExposureParameters { values }
    }

    /// The full assembled vector
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn kinetics(&self) -> &[f64] {
        &self.values[..self.values.len() - N_EXPOSURE_TERMS]
    }

    pub fn primed(&self) -> f64 {
        self.tail(0)
    }

    pub fn modifier(&self) -> f64 {
        self.tail(1)
    }

    pub fn cross_reactivity(&self) -> f64 {
        self.tail(2)
    }

    pub fn infection_time(&self) -> f64 {
        self.tail(3)
    }

    #[inline(always)]
    fn tail(&self, i: usize) -> f64 {
        self.values[self.values.len() - N_EXPOSURE_TERMS + i]
    }
}

/// A single-exposure antibody trajectory solver
///
/// Implementations must be pure: identical inputs give identical outputs, and the returned
/// trajectory has one value per entry of `times`.
pub trait Trajectory: Sync {
    fn solve(&self, parameters: &ExposureParameters, times: &Array1<f64>) -> Array1<f64>;
}

/// Signature of a closure-based solver
pub type SolveFn = dyn Fn(&ExposureParameters, &Array1<f64>) -> Array1<f64> + Send + Sync;

/// A [Trajectory] backed by a closure
///
/// ```ignore
/// let model = Model::new(|p: &ExposureParameters, t: &Array1<f64>| {
///     t.mapv(|t| if t >= p.infection_time() { p.kinetics()[0] * p.cross_reactivity() } else { 0.0 })
/// });
/// ```
pub struct Model {
    solve: Box<SolveFn>,
}

impl Model {
    pub fn new<F>(solve: F) -> Self
    where
        F: Fn(&ExposureParameters, &Array1<f64>) -> Array1<f64> + Send + Sync + 'static,
    {
        Model {
            solve: Box::new(solve),
        }
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model").finish_non_exhaustive()
    }
}

impl Trajectory for Model {
    fn solve(&self, parameters: &ExposureParameters, times: &Array1<f64>) -> Array1<f64> {
        (self.solve)(parameters, times)
    }
}

impl<T: Trajectory + ?Sized> Trajectory for &T {
    fn solve(&self, parameters: &ExposureParameters, times: &Array1<f64>) -> Array1<f64> {
        (**self).solve(parameters, times)
    }
}
