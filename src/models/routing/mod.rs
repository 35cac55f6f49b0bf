//! Multi-vehicle routing from a shared depot (mTSP) with Miller-Tucker-Zemlin subtour elimination.

pub mod model;
pub mod results;
pub mod sets_and_parameters;

pub use model::{RoutingSolver, Variables};
pub use results::{reconstruct_route, RouteArc, RoutingResult};
pub use sets_and_parameters::{CityIndex, Parameters, Sets, VehicleIndex, DEPOT};
