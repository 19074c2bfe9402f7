pub mod entrypoints;
pub mod logger;
pub mod routines {
    pub mod datafile;
    pub mod design;
    pub mod output;
    pub mod settings;
    pub mod evaluation {
        pub mod obs_error;
        pub mod posterior;
    }
    pub mod simulation {
        pub mod kinetics;
        pub mod solver;
    }
}

pub mod prelude {
    pub use crate::entrypoints::*;
    pub use crate::logger;
    pub use crate::routines::design::*;
    pub use crate::routines::evaluation::obs_error::*;
    pub use crate::routines::evaluation::posterior::PosteriorEvaluator;
    pub use crate::routines::simulation::kinetics::{clear_cache, KineticsEngine};
    pub use crate::routines::simulation::solver::*;
    pub use crate::routines::*;
}

//Tests
#[cfg(test)]
mod tests;
