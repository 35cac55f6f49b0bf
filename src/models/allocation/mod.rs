//! The relief allocation model: which carrier flies which resources to which zone on which flight.

pub mod model;
pub mod results;
pub mod sets_and_parameters;

pub use model::{AllocationSolver, Variables};
pub use results::{AllocationResult, Ambiguity, FlightKey, ShipmentRow};
pub use sets_and_parameters::{CarrierIndex, FlightIndex, Parameters, ResourceIndex, Sets, ZoneIndex};
