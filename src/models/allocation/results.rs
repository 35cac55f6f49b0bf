use std::collections::BTreeMap;

use itertools::iproduct;
use log::warn;
use serde::Serialize;

use super::model::Variables;
use super::sets_and_parameters::{CarrierIndex, FlightIndex, Parameters, ResourceIndex, Sets, ZoneIndex};
use crate::{
    models::milp::{Assignment, Indicator, Model, Var},
    problem::ReliefProblem,
    utils::{EPSILON, SHIPPED_THRESHOLD},
};

/// A flight slot of a carrier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FlightKey {
    pub carrier: CarrierIndex,
    pub flight: FlightIndex,
}

/// A binary variable whose solved value is not within tolerance of 0 or 1
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ambiguity {
    pub variable: String,
    pub value: f64,
}

/// One line of the shipment table, with carrier ids, one based flights and resource names
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentRow {
    pub carrier: u32,
    pub flight: usize,
    pub zone: Option<String>,
    pub resource: String,
    pub quantity: f64,
}

/// Classifies a solved binary, recording and logging it when it is neither 0 nor 1.
/// Ambiguous values count as active when above one half.
pub(crate) fn classify(
    model: &Model,
    assignment: &Assignment,
    var: Var,
    ambiguities: &mut Vec<Ambiguity>,
) -> bool {
    match assignment.indicator(var, EPSILON) {
        Indicator::Off => false,
        Indicator::On => true,
        Indicator::Ambiguous(value) => {
            let variable = model.var(var).name.clone();
            warn!("binary {} has ambiguous value {}", variable, value);
            ambiguities.push(Ambiguity { variable, value });
            value > 0.5
        }
    }
}

#[derive(Debug, Clone)]
pub struct AllocationResult {
    /// Objective value of the solved model
    objective: f64,
    /// Fixed cost of active carriers plus variable cost of assigned flights
    cost: f64,
    /// Units of each resource shipped on each flight, values above the shipped threshold only
    shipments: BTreeMap<FlightKey, BTreeMap<ResourceIndex, f64>>,
    /// The zone each assigned flight serves
    destinations: BTreeMap<FlightKey, ZoneIndex>,
    /// Carriers whose activation binary is set
    active: Vec<CarrierIndex>,
    ambiguities: Vec<Ambiguity>,
    carrier_ids: Vec<u32>,
    resource_names: Vec<String>,
    zone_names: Vec<String>,
}

impl AllocationResult {
    pub fn new(
        problem: &ReliefProblem,
        sets: &Sets,
        parameters: &Parameters,
        variables: &Variables,
        model: &Model,
        assignment: &Assignment,
    ) -> AllocationResult {
        let mut ambiguities = Vec::new();

        let active: Vec<CarrierIndex> = sets
            .A
            .iter()
            .copied()
            .filter(|a| classify(model, assignment, variables.u[**a], &mut ambiguities))
            .collect();

        let mut destinations = BTreeMap::new();
        for (a, v, z) in iproduct!(&sets.A, &sets.V, &sets.Z) {
            if classify(model, assignment, variables.y[**a][**v][**z], &mut ambiguities) {
                let key = FlightKey {
                    carrier: *a,
                    flight: *v,
                };
                if let Some(other) = destinations.insert(key, *z) {
                    warn!("flight {:?} assigned to both zone {:?} and {:?}", key, other, z);
                }
            }
        }

        for w in variables.w.iter().flatten().flatten().flatten() {
            classify(model, assignment, *w, &mut ambiguities);
        }

        let fixed: f64 = active.iter().map(|a| parameters.C_fixed[*a]).sum();
        let variable: f64 = destinations
            .iter()
            .map(|(key, z)| parameters.trip_cost(key.carrier, *z))
            .sum();

        let mut shipments: BTreeMap<FlightKey, BTreeMap<ResourceIndex, f64>> = sets
            .A
            .iter()
            .flat_map(|a| {
                sets.V.iter().map(move |v| FlightKey {
                    carrier: *a,
                    flight: *v,
                })
            })
            .map(|key| (key, BTreeMap::new()))
            .collect();
        for (a, r, z, v) in iproduct!(&sets.A, &sets.R, &sets.Z, &sets.V) {
            let quantity = assignment.value(variables.x[**a][**r][**z][**v]);
            if quantity > SHIPPED_THRESHOLD {
                let key = FlightKey {
                    carrier: *a,
                    flight: *v,
                };
                if let Some(per_resource) = shipments.get_mut(&key) {
                    *per_resource.entry(*r).or_insert(0.0) += quantity.round();
                }
            }
        }

        AllocationResult {
            objective: assignment.evaluate(model.objective()),
            cost: fixed + variable,
            shipments,
            destinations,
            active,
            ambiguities,
            carrier_ids: problem.carriers().iter().map(|c| c.id).collect(),
            resource_names: problem.resources().iter().map(|r| r.name.clone()).collect(),
            zone_names: problem.zones().iter().map(|z| z.name.clone()).collect(),
        }
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Realized cost of the solution, independent of the objective
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Quantities per resource on every (carrier, flight), including empty flights
    pub fn shipments(&self) -> &BTreeMap<FlightKey, BTreeMap<ResourceIndex, f64>> {
        &self.shipments
    }

    pub fn shipped(&self, key: FlightKey, resource: ResourceIndex) -> f64 {
        self.shipments
            .get(&key)
            .and_then(|s| s.get(&resource))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn destination(&self, key: FlightKey) -> Option<ZoneIndex> {
        self.destinations.get(&key).copied()
    }

    pub fn destinations(&self) -> &BTreeMap<FlightKey, ZoneIndex> {
        &self.destinations
    }

    pub fn active_carriers(&self) -> &[CarrierIndex] {
        &self.active
    }

    pub fn ambiguities(&self) -> &[Ambiguity] {
        &self.ambiguities
    }

    /// Flattened shipment table for reporting, one row per shipped (carrier, flight, resource)
    pub fn shipment_rows(&self) -> Vec<ShipmentRow> {
        self.shipments
            .iter()
            .flat_map(|(key, per_resource)| {
                per_resource.iter().map(move |(r, quantity)| ShipmentRow {
                    carrier: self.carrier_ids[*key.carrier],
                    flight: *key.flight + 1,
                    zone: self
                        .destination(*key)
                        .map(|z| self.zone_names[*z].clone()),
                    resource: self.resource_names[**r].clone(),
                    quantity: *quantity,
                })
            })
            .collect()
    }
}
