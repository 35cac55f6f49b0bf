use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use log::{trace, warn};
use serde::Serialize;
use typed_index_collections::{TiSlice, TiVec};

use super::model::Variables;
use super::sets_and_parameters::{CityIndex, Parameters, Sets, VehicleIndex, DEPOT};
use crate::{
    models::{
        allocation::Ambiguity,
        milp::{Assignment, Indicator, Model},
        utils::ConvertVars,
    },
    utils::{ARC_THRESHOLD, EPSILON},
};

/// Colours cycled through when plotting the routes of several vehicles
pub const PALETTE: [&str; 10] = [
    "tab:blue",
    "tab:orange",
    "tab:green",
    "tab:red",
    "tab:purple",
    "tab:brown",
    "tab:pink",
    "tab:gray",
    "tab:olive",
    "tab:cyan",
];

/// A travelled arc
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RouteArc {
    pub from: CityIndex,
    pub to: CityIndex,
    pub vehicle: VehicleIndex,
}

/// Walks the arcs of a single vehicle from the depot.
///
/// At every city the arc with the smallest destination among those valued above
/// [`ARC_THRESHOLD`] that lead to an unvisited city or back to the depot is taken. Once
/// `cities` distinct cities have been visited only the depot is left as a destination.
/// The walk ends when it is back at the depot, in which case the route ends with the
/// depot, or when no such arc leaves the current city, in which case the route is left open.
pub fn reconstruct_route(
    values: &BTreeMap<(CityIndex, CityIndex), f64>,
    cities: usize,
) -> Vec<CityIndex> {
    let mut route = vec![DEPOT];
    let mut visited = BTreeSet::from([DEPOT]);
    let mut current = DEPOT;

    loop {
        let complete = visited.len() >= cities;
        let next = values
            .range((current, CityIndex::from(0))..)
            .take_while(|((i, _), _)| *i == current)
            .find(|((_, j), value)| {
                **value > ARC_THRESHOLD
                    && *j != current
                    && (*j == DEPOT || (!complete && !visited.contains(j)))
            })
            .map(|((_, j), _)| *j);

        match next {
            Some(city) if city == DEPOT => {
                route.push(DEPOT);
                break;
            }
            Some(city) => {
                trace!("{:?} -> {:?}", current, city);
                visited.insert(city);
                route.push(city);
                current = city;
            }
            None => {
                warn!(
                    "no arc leaves city {:?} for an unvisited city, leaving the route open",
                    current
                );
                break;
            }
        }
    }

    route
}

#[derive(Debug, Clone)]
pub struct RoutingResult {
    /// Objective value of the solved model
    objective: f64,
    /// The walk of every vehicle, depot to depot unless it broke off
    routes: TiVec<VehicleIndex, Vec<CityIndex>>,
    /// Every arc valued above the arc threshold
    arcs: Vec<RouteArc>,
    ambiguities: Vec<Ambiguity>,
    parameters: Parameters,
}

impl RoutingResult {
    pub fn new(
        sets: &Sets,
        parameters: &Parameters,
        variables: &Variables,
        model: &Model,
        assignment: &Assignment,
    ) -> RoutingResult {
        let mut ambiguities = Vec::new();
        for var in variables.x.values() {
            if let Indicator::Ambiguous(value) = assignment.indicator(*var, EPSILON) {
                let variable = model.var(*var).name.clone();
                warn!("binary {} has ambiguous value {}", variable, value);
                ambiguities.push(Ambiguity { variable, value });
            }
        }

        let values = variables.x.convert(assignment);

        let arcs = values
            .iter()
            .filter(|(_, value)| **value > ARC_THRESHOLD)
            .map(|((from, to, vehicle), _)| RouteArc {
                from: *from,
                to: *to,
                vehicle: *vehicle,
            })
            .sorted_by_key(|arc| (arc.vehicle, arc.from, arc.to))
            .collect();

        let routes = sets
            .K
            .iter()
            .map(|k| {
                let own: BTreeMap<(CityIndex, CityIndex), f64> = values
                    .iter()
                    .filter(|((_, _, vehicle), _)| vehicle == k)
                    .map(|((i, j, _), value)| ((*i, *j), *value))
                    .collect();
                reconstruct_route(&own, sets.N.len())
            })
            .collect();

        RoutingResult {
            objective: assignment.evaluate(model.objective()),
            routes,
            arcs,
            ambiguities,
            parameters: parameters.clone(),
        }
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }

    pub fn routes(&self) -> &TiSlice<VehicleIndex, Vec<CityIndex>> {
        &self.routes
    }

    pub fn route(&self, vehicle: VehicleIndex) -> &[CityIndex] {
        &self.routes[vehicle]
    }

    /// Whether the walk of a vehicle left the depot and made it back
    pub fn is_closed(&self, vehicle: VehicleIndex) -> bool {
        let route = &self.routes[vehicle];
        route.len() > 2 && route.last() == Some(&DEPOT)
    }

    /// Travelled arcs ordered by vehicle, then by origin and destination
    pub fn arcs(&self) -> &[RouteArc] {
        &self.arcs
    }

    pub fn ambiguities(&self) -> &[Ambiguity] {
        &self.ambiguities
    }

    /// Cost of the reconstructed route of a vehicle, summed over its consecutive cities.
    /// An open route only counts the arcs that were walked.
    pub fn route_cost(&self, vehicle: VehicleIndex) -> f64 {
        self.routes[vehicle]
            .iter()
            .tuple_windows()
            .map(|(i, j)| self.parameters.cost(*i, *j))
            .sum()
    }

    /// Sum of all route costs. Equals the objective when every route is closed.
    pub fn total_cost(&self) -> f64 {
        self.routes
            .iter_enumerated()
            .map(|(k, _)| self.route_cost(k))
            .sum()
    }

    /// Plot colour of a vehicle's route
    pub fn colour(vehicle: VehicleIndex) -> &'static str {
        PALETTE[*vehicle % PALETTE.len()]
    }
}
