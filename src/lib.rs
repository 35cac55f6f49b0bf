pub mod error;
pub mod models;
pub mod parse;
pub mod problem;
pub mod solver;
pub mod sweep;
pub mod utils;

pub use error::{Error, Result};
pub use models::{AllocationSolver, RoutingSolver};
pub use parse::CostMatrix;
pub use problem::{ReliefProblem, Scenario};
pub use solver::{Solver, SolverConfig};
pub use sweep::SweepRunner;
