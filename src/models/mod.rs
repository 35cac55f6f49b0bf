pub mod allocation;
pub mod milp;
pub mod routing;
pub mod utils;

pub use allocation::AllocationSolver;
pub use routing::RoutingSolver;
